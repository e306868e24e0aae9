//! OpenAI-compatible chat completion client

use crate::advisor::LlmClient;
use crate::error::AdvisorError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for [`HttpLlmClient`]
#[derive(Debug, Clone)]
pub struct HttpLlmConfig {
    /// Base URL, `/chat/completions` is appended
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

/// [`LlmClient`] over an OpenAI-compatible HTTP API
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    config: HttpLlmConfig,
    client: Client,
}

impl HttpLlmClient {
    /// Create new client
    ///
    /// # Errors
    /// [`AdvisorError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: HttpLlmConfig) -> Result<Self, AdvisorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdvisorError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AdvisorError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AdvisorError::Timeout {
                    ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
                }
            } else {
                AdvisorError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AdvisorError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Malformed(e.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdvisorError::Malformed("no choices in response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint() {
        let client = HttpLlmClient::new(HttpLlmConfig {
            endpoint: "http://localhost:1234/v1/".into(),
            api_key: None,
            model: "local".into(),
            max_tokens: 256,
            temperature: 0.1,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.url(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn reply_without_content_is_malformed_shape() {
        let reply: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(reply.choices[0].message.content.is_none());
    }
}
