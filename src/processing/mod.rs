// Processing step
//
// Turns a (file, source, target) triple into one terminal outcome:
// - Client: HTTP transport to the dubbing backend
// - Progress: phase ticker state and the pure reconciliation function
// - Orchestrator: runs ticker and remote call side by side for one run

pub mod client;
pub mod progress;
pub mod orchestrator;

use async_trait::async_trait;
use std::sync::Arc;

pub use client::*;
pub use progress::*;
pub use orchestrator::*;

use crate::config::ApiConfig;
use crate::error::Result;
use crate::session::VideoFile;

/// Everything the backend needs for one dubbing job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequest {
    pub file: VideoFile,
    pub source_language: String,
    pub target_language: String,
}

/// Authoritative result of the remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Pending,
    Succeeded(String),
    Failed(String),
}

impl RemoteOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, RemoteOutcome::Pending)
    }
}

/// Remote side of a processing run
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Submit the video and wait for the reference to the dubbed artifact
    async fn process_video(&self, request: ProcessingRequest) -> Result<String>;
}

/// Factory for creating processing API instances
pub struct ProcessingApiFactory;

impl ProcessingApiFactory {
    /// Create the default HTTP backed implementation
    pub fn create_api(config: &ApiConfig) -> Result<Arc<dyn ProcessingApi>> {
        Ok(Arc::new(BackendClient::new(config)?))
    }
}
