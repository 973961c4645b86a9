use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{Result, DubError};
use super::{ProcessingApi, ProcessingRequest};

/// Body returned by `POST /process-video`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoResponse {
    pub status: String,
    #[serde(default)]
    pub video_url: String,
}

/// Body returned by `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// HTTP client for the dubbing backend
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check that the backend answers on its root route
    pub async fn health(&self) -> Result<String> {
        let url = self.endpoint("/");
        debug!("Checking backend health at {}", url);

        let response = self.client.get(&url).send().await
            .map_err(|e| DubError::Remote(format!("Backend not reachable at {}: {}", self.base_url, e)))?;

        if !response.status().is_success() {
            return Err(DubError::Remote(format!("Backend health check failed: HTTP {}", response.status())));
        }

        let body: HealthResponse = response.json().await
            .map_err(|e| DubError::Remote(format!("Unexpected health response: {}", e)))?;
        Ok(body.message)
    }

    /// Stream `url` into `destination`, returning the number of bytes written
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        info!("Downloading {} to {}", url, destination.display());

        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DubError::Remote(format!(
                "Failed to download {}: HTTP {}", url, response.status()
            )));
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"));

        let temp_path = destination.with_extension("part");
        let mut file = tokio::fs::File::create(&temp_path).await?;
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&temp_path, destination).await?;

        pb.finish_and_clear();
        Ok(written)
    }

    fn build_form(request: &ProcessingRequest) -> Result<Form> {
        let part = Part::bytes(request.file.data.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.media_type)?;

        Ok(Form::new()
            .part("file", part)
            .text("source_language", request.source_language.clone())
            .text("target_language", request.target_language.clone()))
    }
}

#[async_trait]
impl ProcessingApi for BackendClient {
    async fn process_video(&self, request: ProcessingRequest) -> Result<String> {
        let url = self.endpoint("/process-video");
        info!(
            "Submitting {} ({} bytes) to {} [{} -> {}]",
            request.file.name,
            request.file.size(),
            url,
            request.source_language,
            request.target_language
        );

        let form = Self::build_form(&request)?;
        let response = self.client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DubError::Remote(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| DubError::Remote(format!("Failed to read response body: {}", e)))?;

        parse_process_response(status, &body)
    }
}

/// Reduce a `/process-video` reply to the artifact reference or one error message
pub fn parse_process_response(status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(DubError::Remote(format!("Backend error {}: {}", status, detail)));
    }

    let parsed: ProcessVideoResponse = serde_json::from_str(body)
        .map_err(|e| DubError::Remote(format!("Failed to parse backend response: {}", e)))?;

    if parsed.status != "success" {
        return Err(DubError::Remote(format!("Backend reported status '{}'", parsed.status)));
    }
    if parsed.video_url.trim().is_empty() {
        return Err(DubError::Remote("Backend response is missing video_url".to_string()));
    }

    Ok(parsed.video_url)
}
