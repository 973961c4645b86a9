use tracing::{debug, warn};

use crate::error::{Result, DubError};
use crate::session::VideoFile;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// How the file reached the upload view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSource {
    Picker,
    Drop,
}

impl PickSource {
    fn rejection_message(self) -> &'static str {
        match self {
            PickSource::Picker => "Please select a valid video file.",
            PickSource::Drop => "Please drop a valid video file.",
        }
    }
}

/// Upload step: holds at most one candidate video until the user confirms it
#[derive(Debug, Default)]
pub struct UploadView {
    selected: Option<VideoFile>,
    dragging: bool,
}

impl UploadView {
    pub fn new() -> Self {
        Self::default()
    }

    /// File chosen through the picker
    pub fn select_file(&mut self, file: VideoFile) -> Result<()> {
        self.accept(file, PickSource::Picker)
    }

    /// File dropped onto the view
    pub fn drop_file(&mut self, file: VideoFile) -> Result<()> {
        self.dragging = false;
        self.accept(file, PickSource::Drop)
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn selected(&self) -> Option<&VideoFile> {
        self.selected.as_ref()
    }

    /// Confirm the selection. Hands the file out once; nothing is emitted
    /// without a valid selection.
    pub fn proceed(&mut self) -> Option<VideoFile> {
        self.selected.take()
    }

    fn accept(&mut self, file: VideoFile, source: PickSource) -> Result<()> {
        if file.is_video() {
            debug!("Accepted {} ({}, {})", file.name, file.media_type, format_bytes(file.size(), 2));
            self.selected = Some(file);
            Ok(())
        } else {
            warn!("Rejected {} with media type {}", file.name, file.media_type);
            self.selected = None;
            Err(DubError::InvalidVideo(source.rejection_message().to_string()))
        }
    }
}

/// Human readable size, e.g. `1.5 KB`; trailing zeros are dropped
pub fn format_bytes(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut divisor = 1u64;
    while unit < SIZE_UNITS.len() - 1 && bytes / divisor >= 1024 {
        divisor *= 1024;
        unit += 1;
    }

    let value = bytes as f64 / divisor as f64;
    let mut formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.').len();
        formatted.truncate(trimmed);
    }

    format!("{} {}", formatted, SIZE_UNITS[unit])
}
