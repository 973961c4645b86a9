use thiserror::Error;

use crate::session::Step;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Source and target language must both be selected")]
    IncompleteSelection,

    #[error("Cannot handle '{event}' while in the {step} step")]
    InvalidTransition { step: Step, event: &'static str },

    #[error("Remote processing error: {0}")]
    Remote(String),
}

pub type Result<T> = std::result::Result<T, DubError>;
