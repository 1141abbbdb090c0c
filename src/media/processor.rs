use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{RecapError, Result};
use super::regions::{blur_filter_graph, BlurRegion};
use super::{LogoOverlay, MediaCommandBuilder, MediaInfo, MediaProcessorTrait};

/// Concrete implementation of media processor (ffmpeg/ffprobe based)
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse an ffprobe rational frame rate such as "30000/1001"
fn parse_frame_rate(rate: &str) -> f64 {
    let mut parts = rate.splitn(2, '/');
    let num: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
    let den: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1.0);
    if den == 0.0 {
        return 0.0;
    }
    num / den
}

fn media_info_from_probe(probe: ProbeOutput) -> MediaInfo {
    let format_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let stream_duration = probe
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref())
        .filter_map(|d| d.parse::<f64>().ok())
        .fold(0.0_f64, f64::max);

    MediaInfo {
        duration: format_duration.unwrap_or(stream_duration),
        width: video.and_then(|s| s.width).unwrap_or(0),
        height: video.and_then(|s| s.height).unwrap_or(0),
        fps: video
            .and_then(|s| s.r_frame_rate.as_deref())
            .map(parse_frame_rate)
            .unwrap_or(0.0),
    }
}

#[async_trait]
impl MediaProcessorTrait for FfmpegProcessor {
    /// Probe duration, resolution, and frame rate
    async fn probe(&self, media_path: &Path) -> Result<MediaInfo> {
        debug!("Probing media file: {}", media_path.display());

        let stdout = self
            .command_builder
            .probe_media(media_path)
            .execute_capture()
            .await?;

        let probe: ProbeOutput = serde_json::from_str(&stdout)
            .map_err(|e| RecapError::Media(format!("Failed to parse probe output: {}", e)))?;

        Ok(media_info_from_probe(probe))
    }

    /// Blur the given regions out of every frame, writing a silent copy
    async fn blur_regions(
        &self,
        video_path: &Path,
        output_path: &Path,
        regions: &[BlurRegion],
        sigma: f64,
    ) -> Result<()> {
        info!(
            "Blurring {} region(s) in {} -> {}",
            regions.len(),
            video_path.display(),
            output_path.display()
        );

        let probe = self.probe(video_path).await?;
        if probe.width == 0 || probe.height == 0 {
            return Err(RecapError::Media(format!(
                "No video stream in {}",
                video_path.display()
            )));
        }

        match blur_filter_graph(regions, probe.width, probe.height, sigma) {
            Some(graph) => {
                self.command_builder
                    .blur_pass(video_path, output_path, &graph, &self.config.encode_options)
                    .execute()
                    .await?;
            }
            None => {
                // Every region clipped out of frame; pass the stream through
                info!("No effective blur region at {}x{}, copying stream", probe.width, probe.height);
                self.command_builder
                    .strip_audio_copy(video_path, output_path)
                    .execute()
                    .await?;
            }
        }

        info!("Region blur completed");
        Ok(())
    }

    /// Retime the video, attach the narration, optionally composite a logo
    async fn sync_and_mux(
        &self,
        video_path: &Path,
        narration_path: &Path,
        output_path: &Path,
        speed_factor: f64,
        logo: Option<LogoOverlay>,
    ) -> Result<()> {
        info!(
            "Muxing {} + {} at speed factor {:.3} -> {}",
            video_path.display(),
            narration_path.display(),
            speed_factor,
            output_path.display()
        );

        self.command_builder
            .sync_mux(
                video_path,
                narration_path,
                output_path,
                speed_factor,
                logo.as_ref(),
                &self.config.encode_options,
            )
            .execute()
            .await?;

        info!("Duration-sync mux completed");
        Ok(())
    }

    /// Check if the media processor is available
    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .map_err(|e| RecapError::Media(format!("Media processor not found: {}", e)))?;

        if output.status.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(RecapError::Media("Media processor version check failed".to_string()))
        }
    }

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let stdout = self.command_builder.version_check().execute_capture().await?;
        let first_line = stdout.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}
