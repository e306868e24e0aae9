//! Advisory language-model layer
//!
//! Stages never talk to a model directly. They hold an [`Advisor`], a
//! strategy object chosen once at construction: either purely heuristic or
//! backed by an [`LlmClient`]. Every consultation is bounded by a timeout
//! and returns `None` when the model is absent, slow, failing or replies
//! with something unusable. Callers then take their heuristic path, which
//! always produces a result of the same shape.

use crate::error::AdvisorError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on a single consultation
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(15);

/// Chat-style completion collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete `user` under the `system` instructions
    async fn complete(&self, system: &str, user: &str) -> Result<String, AdvisorError>;
}

/// Heuristic-or-model strategy shared by all stages
#[derive(Clone)]
pub struct Advisor {
    client: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advisor")
            .field("enabled", &self.is_enabled())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Advisor {
    fn default() -> Self {
        Self::heuristic()
    }
}

impl Advisor {
    /// Advisor without a model; every consultation yields `None`
    #[inline]
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            client: None,
            timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }

    /// Advisor backed by `client`, each call bounded by `timeout`
    #[inline]
    #[must_use]
    pub fn with_client(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            timeout,
        }
    }

    /// Check whether a model is attached
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Free-text consultation
    pub async fn consult_text(&self, system: &str, user: &str) -> Option<String> {
        let client = self.client.as_ref()?;
        let ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);

        let reply = match tokio::time::timeout(self.timeout, client.complete(system, user)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), "advisor call failed, using heuristic");
                return None;
            }
            Err(_) => {
                tracing::warn!(error = %AdvisorError::Timeout { ms }, "advisor call timed out, using heuristic");
                return None;
            }
        };

        let reply = reply.trim();
        if reply.is_empty() {
            tracing::debug!("advisor returned an empty reply");
            return None;
        }
        Some(reply.to_string())
    }

    /// Structured consultation; the reply must be JSON fitting `T`
    pub async fn consult_json<T: DeserializeOwned>(&self, system: &str, user: &str) -> Option<T> {
        let raw = self.consult_text(system, user).await?;
        match serde_json::from_str(strip_code_fences(&raw)) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %AdvisorError::Malformed(err.to_string()), "advisor reply rejected, using heuristic");
                None
            }
        }
    }
}

/// Strip a surrounding markdown code fence, with or without a language tag
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
