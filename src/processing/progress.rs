use std::sync::Arc;

use crate::config::ProcessingConfig;
use crate::error::{Result, DubError};
use super::RemoteOutcome;

/// Highest percentage the ticker may show before the backend confirms success
pub const PROGRESS_CEILING: u8 = 90;

/// Phase labels plus the two terminal labels. Cheap to clone, shared by every run.
#[derive(Debug, Clone)]
pub struct StatusSequence {
    phases: Arc<[String]>,
    complete: Arc<str>,
    error: Arc<str>,
}

impl StatusSequence {
    pub fn new(phases: Vec<String>, complete: impl Into<Arc<str>>, error: impl Into<Arc<str>>) -> Result<Self> {
        if phases.is_empty() {
            return Err(DubError::Config("status sequence must contain at least one label".to_string()));
        }
        Ok(Self {
            phases: phases.into(),
            complete: complete.into(),
            error: error.into(),
        })
    }

    pub fn from_config(config: &ProcessingConfig) -> Result<Self> {
        Self::new(
            config.status_messages.clone(),
            config.complete_message.as_str(),
            config.error_message.as_str(),
        )
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.phases.len() - 1
    }

    /// Label for `cursor`, clamped to the last phase
    pub fn phase(&self, cursor: usize) -> &str {
        &self.phases[cursor.min(self.last_index())]
    }

    pub fn complete_label(&self) -> &str {
        &self.complete
    }

    pub fn error_label(&self) -> &str {
        &self.error
    }

    /// Next cursor position, or `None` once the last phase is showing
    pub fn advance(&self, cursor: usize) -> Option<usize> {
        (cursor < self.last_index()).then_some(cursor + 1)
    }

    /// `round(cursor / len * 90)`, rounding halves up
    pub fn progress_for(&self, cursor: usize) -> u8 {
        let len = self.len();
        let cursor = cursor.min(self.last_index());
        let percent = (cursor * 2 * PROGRESS_CEILING as usize + len) / (2 * len);
        percent.min(PROGRESS_CEILING as usize) as u8
    }
}

/// What the processing view shows at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSnapshot {
    pub cursor: usize,
    pub status: String,
    pub progress: u8,
    pub outcome: RemoteOutcome,
}

impl ProcessingSnapshot {
    pub fn is_terminal(&self) -> bool {
        !self.outcome.is_pending()
    }
}

/// Display state as a pure function of the ticker position and the remote outcome.
/// The outcome always wins over the cursor.
pub fn reconcile(sequence: &StatusSequence, cursor: usize, outcome: &RemoteOutcome) -> ProcessingSnapshot {
    let (status, progress) = match outcome {
        RemoteOutcome::Pending => (sequence.phase(cursor).to_string(), sequence.progress_for(cursor)),
        RemoteOutcome::Succeeded(_) => (sequence.complete_label().to_string(), 100),
        RemoteOutcome::Failed(_) => (sequence.error_label().to_string(), 0),
    };

    ProcessingSnapshot {
        cursor: cursor.min(sequence.last_index()),
        status,
        progress,
        outcome: outcome.clone(),
    }
}
