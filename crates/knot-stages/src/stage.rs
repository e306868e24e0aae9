//! The analysis stage trait

use crate::capability::{Capability, TaskKind};
use crate::error::StageError;
use crate::outcome::StageOutcome;
use crate::payload::Payload;

/// One domain analysis capability
///
/// Implementations hold their collaborators (stores, advisor, keyword
/// extractor) from construction and never reach for shared globals.
#[async_trait::async_trait]
pub trait AnalysisStage: Send + Sync {
    /// Capability served by this stage
    fn capability(&self) -> Capability;

    /// Check whether `task` is handled
    fn supports(&self, task: TaskKind) -> bool {
        self.capability().tasks().contains(&task)
    }

    /// Run `task` over `payload`
    ///
    /// # Errors
    /// [`StageError::UnsupportedTask`] for tasks outside
    /// [`Capability::tasks`], not-found and invalid-payload errors otherwise.
    async fn execute(&self, task: TaskKind, payload: &Payload) -> Result<StageOutcome, StageError>;
}

/// Error for a task this capability does not handle
#[inline]
pub(crate) fn unsupported(capability: Capability, task: TaskKind) -> StageError {
    StageError::UnsupportedTask { capability, task }
}
