use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::processing::BackendClient;

const FALLBACK_FILE_NAME: &str = "video.mp4";

/// Download step: shows where the dubbed video lives and what to call it
#[derive(Debug, Clone)]
pub struct DownloadView {
    video_url: String,
    file_name: String,
    restart_requested: bool,
}

impl DownloadView {
    pub fn new(video_url: impl Into<String>, original_name: &str) -> Self {
        Self {
            video_url: video_url.into(),
            file_name: suggested_file_name(original_name),
            restart_requested: false,
        }
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Fetch the artifact into `output_dir` under the suggested name
    pub async fn save_to(&self, client: &BackendClient, output_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(output_dir).await?;
        let destination = output_dir.join(&self.file_name);
        client.download(&self.video_url, &destination).await?;
        info!("Saved dubbed video to {}", destination.display());
        Ok(destination)
    }

    /// Returns true only the first time, so the restart event fires once
    pub fn request_restart(&mut self) -> bool {
        !std::mem::replace(&mut self.restart_requested, true)
    }
}

/// `translated_<original name>`, with any directory part stripped
pub fn suggested_file_name(original_name: &str) -> String {
    let base = Path::new(original_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    format!("translated_{}", base)
}
