use std::path::Path;

use crate::error::{RecapError, Result};

/// Every recap script opens with this phrase
pub const OPENING_PHRASE: &str = "ဇာတ်လမ်းစစချင်းမှာတော့...";

/// Containers the pipeline accepts
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "avi", "mkv"];

/// The fixed instruction sent with every video.
///
/// This is a content contract, not a guarantee: the service may still ignore
/// it, so callers treat the reply as best-effort text.
pub fn narration_prompt() -> String {
    format!(
        "Analyze this video and write a detailed, dramatic Burmese movie recap script. \
         Use a storytelling tone. Start with '{}'. Burmese language only. \
         Do not include headings, timecodes, or any formatting markers.",
        OPENING_PHRASE
    )
}

/// Terminal-or-pending state of remotely uploaded media
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaState {
    Pending,
    Ready(String),
    Failed(String),
}

impl MediaState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MediaState::Pending)
    }
}

/// MIME type for an allow-listed container extension
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Validate the source video before any remote call is attempted.
///
/// Returns the MIME type to submit alongside the bytes.
pub fn validate_source_video(video_path: &Path) -> Result<&'static str> {
    let extension = video_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(RecapError::UnsupportedFormat(format!(
            "{} (expected one of: {})",
            video_path.display(),
            VIDEO_EXTENSIONS.join(", ")
        )));
    }

    let metadata = std::fs::metadata(video_path).map_err(|_| {
        RecapError::Validation(format!("Source video not found: {}", video_path.display()))
    })?;

    if metadata.len() == 0 {
        return Err(RecapError::Validation(format!(
            "Source video is empty: {}",
            video_path.display()
        )));
    }

    Ok(mime_type_for(&extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_prompt_carries_content_contract() {
        let prompt = narration_prompt();
        assert!(prompt.contains(OPENING_PHRASE));
        assert!(prompt.contains("Burmese language only"));
        assert!(prompt.contains("timecodes"));
    }

    #[test]
    fn test_validate_missing_video_is_validation_error() {
        let err = validate_source_video(Path::new("/nonexistent/movie.mp4")).unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_unknown_extension() {
        let err = validate_source_video(Path::new("movie.gif")).unwrap_err();
        assert!(matches!(err, RecapError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_validate_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        std::fs::File::create(&path).unwrap();
        let err = validate_source_video(&path).unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
    }

    #[test]
    fn test_validate_accepts_nonempty_allowed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.webm");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"\x1aE\xdf\xa3").unwrap();
        assert_eq!(validate_source_video(&path).unwrap(), "video/webm");
    }

    #[test]
    fn test_media_state_terminality() {
        assert!(!MediaState::Pending.is_terminal());
        assert!(MediaState::Ready("uri".to_string()).is_terminal());
        assert!(MediaState::Failed("reason".to_string()).is_terminal());
    }
}
