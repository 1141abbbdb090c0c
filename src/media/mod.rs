// Modular media processing architecture
//
// This module provides a clean abstraction over media processing operations:
// - Processor: ffmpeg/ffprobe implementation with abstract command building
// - Commands: command builders and abstractions
// - Regions: proportional blur-region geometry and filter graphs

pub mod commands;
pub mod processor;
pub mod regions;

use async_trait::async_trait;
use std::path::Path;
use std::str::FromStr;

pub use commands::*;
pub use processor::*;
pub use regions::{blur_filter_graph, BlurRegion, PixelRect};

use crate::config::MediaConfig;
use crate::error::{RecapError, Result};

/// Stream metadata extracted from a probe
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Corner anchor for the logo overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl LogoCorner {
    /// ffmpeg overlay position expression for this corner
    pub fn overlay_expr(&self, margin: u32) -> String {
        match self {
            LogoCorner::TopLeft => format!("{m}:{m}", m = margin),
            LogoCorner::TopRight => format!("main_w-overlay_w-{m}:{m}", m = margin),
            LogoCorner::BottomLeft => format!("{m}:main_h-overlay_h-{m}", m = margin),
            LogoCorner::BottomRight => {
                format!("main_w-overlay_w-{m}:main_h-overlay_h-{m}", m = margin)
            }
        }
    }
}

impl FromStr for LogoCorner {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "top-left" => Ok(LogoCorner::TopLeft),
            "top-right" => Ok(LogoCorner::TopRight),
            "bottom-left" => Ok(LogoCorner::BottomLeft),
            "bottom-right" => Ok(LogoCorner::BottomRight),
            other => Err(RecapError::Validation(format!(
                "Unknown logo corner: {} (expected top-left, top-right, bottom-left, bottom-right)",
                other
            ))),
        }
    }
}

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Probe duration, resolution, and frame rate
    async fn probe(&self, media_path: &Path) -> Result<MediaInfo>;

    /// Blur the given regions out of every frame, writing a silent copy
    async fn blur_regions(
        &self,
        video_path: &Path,
        output_path: &Path,
        regions: &[BlurRegion],
        sigma: f64,
    ) -> Result<()>;

    /// Retime the video by `speed_factor`, attach the narration as the sole
    /// audio track, optionally composite a logo, and encode for delivery
    async fn sync_and_mux(
        &self,
        video_path: &Path,
        narration_path: &Path,
        output_path: &Path,
        speed_factor: f64,
        logo: Option<LogoOverlay>,
    ) -> Result<()>;

    /// Check if the media processor is available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (ffmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
