use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, DubError};

/// Extensions recognised as video when a file is picked from disk
const VIDEO_EXTENSIONS: [(&str, &str); 12] = [
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("webm", "video/webm"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("3gp", "video/3gpp"),
    ("ogv", "video/ogg"),
];

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Wizard phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Language,
    Processing,
    Download,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Upload => "upload",
            Step::Language => "language",
            Step::Processing => "processing",
            Step::Download => "download",
        };
        f.write_str(name)
    }
}

/// A video picked by the user. Contents are shared, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub name: String,
    pub media_type: String,
    pub data: Arc<[u8]>,
}

impl VideoFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Load a file from disk, declaring its media type from the extension
    /// unless `media_type` is given.
    pub async fn from_path<P: AsRef<Path>>(path: P, media_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DubError::FileNotFound(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DubError::Config(format!("Invalid file name: {}", path.display())))?;
        let media_type = media_type
            .map(str::to_string)
            .unwrap_or_else(|| media_type_for_path(path).to_string());
        let data = tokio::fs::read(path).await?;

        Ok(Self::new(name, media_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }
}

/// Guess a media type from the file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    extension
        .and_then(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, media_type)| *media_type)
        })
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

/// Data carried between wizard steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub step: Step,
    pub file: Option<VideoFile>,
    pub source_language: String,
    pub target_language: String,
    pub result_reference: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            step: Step::Upload,
            file: None,
            source_language: String::new(),
            target_language: String::new(),
            result_reference: None,
        }
    }
}

impl Session {
    pub fn is_empty(&self) -> bool {
        *self == Session::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_media_type_for_path() {
        assert_eq!(media_type_for_path(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(media_type_for_path(Path::new("CLIP.MKV")), "video/x-matroska");
        assert_eq!(media_type_for_path(Path::new("photo.png")), FALLBACK_MEDIA_TYPE);
        assert_eq!(media_type_for_path(Path::new("noext")), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn test_default_session_is_empty() {
        let session = Session::default();
        assert!(session.is_empty());
        assert_eq!(session.step, Step::Upload);
    }

    #[tokio::test]
    async fn test_from_path_reads_contents() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("holiday.webm");
        video.write_binary(b"\x1a\x45\xdf\xa3").unwrap();

        let file = VideoFile::from_path(video.path(), None).await.unwrap();
        assert_eq!(file.name, "holiday.webm");
        assert_eq!(file.media_type, "video/webm");
        assert_eq!(file.size(), 4);
        assert!(file.is_video());
    }

    #[tokio::test]
    async fn test_from_path_media_type_override_and_empty_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let video = temp.child("capture.bin");
        video.touch().unwrap();

        let file = VideoFile::from_path(video.path(), Some("video/mp4")).await.unwrap();
        assert_eq!(file.media_type, "video/mp4");
        assert_eq!(file.size(), 0);
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = VideoFile::from_path(temp.path().join("missing.mp4"), None).await;
        assert!(matches!(result, Err(DubError::FileNotFound(_))));
    }
}
