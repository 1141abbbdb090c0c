use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{RecapError, Result};
use crate::media::{
    BlurRegion, LogoCorner, LogoOverlay, MediaProcessorFactory, MediaProcessorTrait,
};
use crate::script::{validate_source_video, ScriptProvider, ScriptProviderFactory, VIDEO_EXTENSIONS};
use crate::speech::{SpeechSynthesizer, SpeechSynthesizerFactory, VoiceProfile};
use crate::workspace::RunWorkspace;

/// Logo requested for a run
#[derive(Debug, Clone)]
pub struct LogoRequest {
    pub image_path: PathBuf,
    pub corner: LogoCorner,
}

/// Everything one pipeline run needs
#[derive(Debug, Clone)]
pub struct RecapRequest {
    pub video_path: PathBuf,
    /// User-supplied narration; when present, no remote script call is made
    pub script_text: Option<String>,
    pub voice: VoiceProfile,
    pub blur: bool,
    pub logo: Option<LogoRequest>,
    pub output_path: PathBuf,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RecapOutcome {
    pub output_path: PathBuf,
    pub script: String,
    pub video_duration: f64,
    pub narration_duration: f64,
    pub speed_factor: f64,
    pub quality_risk: bool,
}

/// Playback-rate multiplier that lands the video on the narration's duration.
///
/// Zero or unknown narration duration fails here, before any division.
pub fn compute_speed_factor(video_duration: f64, audio_duration: f64) -> Result<f64> {
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(RecapError::Validation(
            "Narration duration is zero or unavailable".to_string(),
        ));
    }
    if !video_duration.is_finite() || video_duration <= 0.0 {
        return Err(RecapError::Validation(
            "Source video duration is zero or unavailable".to_string(),
        ));
    }
    Ok(video_duration / audio_duration)
}

/// Extreme retiming degrades the result; flagged, never blocked
pub fn speed_ratio_is_quality_risk(factor: f64, min: f64, max: f64) -> bool {
    factor < min || factor > max
}

pub struct RecapPipeline {
    config: Config,
    script: Box<dyn ScriptProvider>,
    speech: Box<dyn SpeechSynthesizer>,
    media: Box<dyn MediaProcessorTrait>,
}

impl RecapPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let script = ScriptProviderFactory::create_provider(config.script.clone());
        let speech = SpeechSynthesizerFactory::create_synthesizer(config.speech.clone());
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        // Check dependencies
        media.check_availability()?;

        Ok(Self {
            config,
            script,
            speech,
            media,
        })
    }

    /// Assemble a pipeline from explicit components
    pub fn with_components(
        config: Config,
        script: Box<dyn ScriptProvider>,
        speech: Box<dyn SpeechSynthesizer>,
        media: Box<dyn MediaProcessorTrait>,
    ) -> Self {
        Self {
            config,
            script,
            speech,
            media,
        }
    }

    /// Run the full recap assembly for one video
    pub async fn run(&self, request: &RecapRequest) -> Result<RecapOutcome> {
        info!("Starting recap run for {}", request.video_path.display());

        validate_source_video(&request.video_path)?;

        let logo = match &request.logo {
            Some(req) => Some(self.resolve_logo(req)?),
            None => None,
        };

        let workspace = RunWorkspace::create()?;

        // Stage 1: script acquisition
        let script = self.resolve_script(request).await?;

        // Stage 2: narration synthesis
        let narration_path = workspace.narration_path(&self.config.speech.audio_format);
        self.synthesize_narration(&script, request.voice, &narration_path).await?;

        // Stage 3 (optional): region blur
        let mux_input = if request.blur {
            let blurred_path = workspace.blurred_video_path();
            self.blur_video(&request.video_path, &blurred_path).await?;
            blurred_path
        } else {
            request.video_path.clone()
        };

        // Stage 4: duration sync and mux
        let video_duration = self.media.probe(&mux_input).await?.duration;
        let narration_duration = self.media.probe(&narration_path).await?.duration;
        let speed_factor = compute_speed_factor(video_duration, narration_duration)?;

        let quality_risk = speed_ratio_is_quality_risk(
            speed_factor,
            self.config.media.min_speed_ratio,
            self.config.media.max_speed_ratio,
        );
        if quality_risk {
            warn!(
                "Speed factor {:.3} is outside [{}, {}]; output quality may suffer",
                speed_factor, self.config.media.min_speed_ratio, self.config.media.max_speed_ratio
            );
        }

        let staged_path = workspace.staged_output_path();
        self.media
            .sync_and_mux(&mux_input, &narration_path, &staged_path, speed_factor, logo)
            .await?;

        publish_output(&staged_path, &request.output_path).await?;

        info!(
            "Recap run {} complete: {}",
            workspace.run_id(),
            request.output_path.display()
        );

        Ok(RecapOutcome {
            output_path: request.output_path.clone(),
            script,
            video_duration,
            narration_duration,
            speed_factor,
            quality_risk,
        })
    }

    /// Process every allow-listed video in a directory
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        voice: VoiceProfile,
        blur: bool,
        output_dir: &Path,
    ) -> Result<()> {
        if !input_dir.is_dir() {
            return Err(RecapError::Config("Input path is not a directory".to_string()));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let mut video_files = Vec::new();
        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            if let Some(extension) = entry.path().extension() {
                if let Some(ext_str) = extension.to_str() {
                    if VIDEO_EXTENSIONS.contains(&ext_str.to_lowercase().as_str()) {
                        video_files.push(entry.path().to_path_buf());
                    }
                }
            }
        }

        info!("Found {} video files to process", video_files.len());

        for video_path in video_files {
            let stem = video_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "recap".to_string());

            let request = RecapRequest {
                video_path: video_path.clone(),
                script_text: None,
                voice,
                blur,
                logo: None,
                output_path: output_dir.join(format!("{}_recap.mp4", stem)),
            };

            match self.run(&request).await {
                Ok(outcome) => info!(
                    "Successfully processed: {} (speed factor {:.3})",
                    video_path.display(),
                    outcome.speed_factor
                ),
                Err(e) => warn!("Failed to process {}: {}", video_path.display(), e),
            }
        }

        Ok(())
    }

    /// Acquire a narration script without running the rest of the pipeline
    pub async fn acquire_script(&self, video_path: &Path) -> Result<String> {
        self.script.acquire(video_path).await
    }

    /// Version line of the underlying media processor
    pub async fn media_version(&self) -> Result<String> {
        self.media.get_version_info().await
    }

    /// Synthesize narration audio for the given text
    pub async fn synthesize_narration(
        &self,
        text: &str,
        voice: VoiceProfile,
        output_path: &Path,
    ) -> Result<()> {
        if text.trim().is_empty() {
            return Err(RecapError::Validation(
                "Narration text is empty, nothing to synthesize".to_string(),
            ));
        }
        self.speech.synthesize(text, voice, output_path).await
    }

    /// Blur the configured regions out of a video
    pub async fn blur_video(&self, video_path: &Path, output_path: &Path) -> Result<()> {
        let regions: Vec<BlurRegion> =
            self.config.blur.regions.iter().map(BlurRegion::from).collect();
        self.media
            .blur_regions(video_path, output_path, &regions, self.config.blur.sigma)
            .await
    }

    /// Mux a narration track onto a video with duration sync, standalone
    pub async fn mux_narration(
        &self,
        video_path: &Path,
        narration_path: &Path,
        output_path: &Path,
        logo: Option<&LogoRequest>,
    ) -> Result<RecapOutcome> {
        let logo = match logo {
            Some(req) => Some(self.resolve_logo(req)?),
            None => None,
        };

        let workspace = RunWorkspace::create()?;

        let video_duration = self.media.probe(video_path).await?.duration;
        let narration_duration = self.media.probe(narration_path).await?.duration;
        let speed_factor = compute_speed_factor(video_duration, narration_duration)?;

        let quality_risk = speed_ratio_is_quality_risk(
            speed_factor,
            self.config.media.min_speed_ratio,
            self.config.media.max_speed_ratio,
        );
        if quality_risk {
            warn!("Speed factor {:.3} flagged as a quality risk", speed_factor);
        }

        let staged_path = workspace.staged_output_path();
        self.media
            .sync_and_mux(video_path, narration_path, &staged_path, speed_factor, logo)
            .await?;

        publish_output(&staged_path, output_path).await?;

        Ok(RecapOutcome {
            output_path: output_path.to_path_buf(),
            script: String::new(),
            video_duration,
            narration_duration,
            speed_factor,
            quality_risk,
        })
    }

    async fn resolve_script(&self, request: &RecapRequest) -> Result<String> {
        match &request.script_text {
            Some(text) => {
                if text.trim().is_empty() {
                    return Err(RecapError::Validation(
                        "Provided narration script is empty".to_string(),
                    ));
                }
                info!("Using provided narration script ({} chars)", text.len());
                Ok(text.clone())
            }
            None => self.script.acquire(&request.video_path).await,
        }
    }

    fn resolve_logo(&self, request: &LogoRequest) -> Result<LogoOverlay> {
        if !request.image_path.exists() {
            return Err(RecapError::FileNotFound(request.image_path.display().to_string()));
        }
        Ok(LogoOverlay {
            image_path: request.image_path.clone(),
            corner: request.corner,
            height: self.config.media.logo_height,
            margin: self.config.media.logo_margin,
        })
    }
}

/// Move the staged file to its final destination. Falls back to copy when
/// the workspace and destination sit on different filesystems.
async fn publish_output(staged_path: &Path, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    if tokio::fs::rename(staged_path, output_path).await.is_err() {
        tokio::fs::copy(staged_path, output_path).await?;
        let _ = tokio::fs::remove_file(staged_path).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaInfo, MockMediaProcessorTrait};
    use crate::script::MockScriptProvider;
    use crate::speech::MockSpeechSynthesizer;
    use std::io::Write;

    fn pipeline_with(
        script: MockScriptProvider,
        speech: MockSpeechSynthesizer,
        media: MockMediaProcessorTrait,
    ) -> RecapPipeline {
        RecapPipeline::with_components(
            Config::default(),
            Box::new(script),
            Box::new(speech),
            Box::new(media),
        )
    }

    fn write_fake_video(dir: &Path) -> PathBuf {
        let path = dir.join("movie.mp4");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"\x00\x00\x00\x18ftypmp42").unwrap();
        path
    }

    fn probe_by_extension(path: &Path) -> MediaInfo {
        if path.extension().map(|e| e == "mp3").unwrap_or(false) {
            MediaInfo { duration: 20.0, width: 0, height: 0, fps: 0.0 }
        } else {
            MediaInfo { duration: 10.0, width: 1920, height: 1080, fps: 25.0 }
        }
    }

    #[test]
    fn test_speed_factor_matches_durations() {
        assert_eq!(compute_speed_factor(10.0, 20.0).unwrap(), 0.5);
        assert_eq!(compute_speed_factor(20.0, 10.0).unwrap(), 2.0);
    }

    #[test]
    fn test_speed_factor_rejects_zero_audio() {
        let err = compute_speed_factor(10.0, 0.0).unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
        assert!(matches!(
            compute_speed_factor(10.0, f64::NAN).unwrap_err(),
            RecapError::Validation(_)
        ));
    }

    #[test]
    fn test_speed_factor_rejects_zero_video() {
        assert!(matches!(
            compute_speed_factor(0.0, 20.0).unwrap_err(),
            RecapError::Validation(_)
        ));
    }

    #[test]
    fn test_quality_risk_classification() {
        assert!(speed_ratio_is_quality_risk(0.2, 0.25, 4.0));
        assert!(speed_ratio_is_quality_risk(4.5, 0.25, 4.0));
        assert!(!speed_ratio_is_quality_risk(0.25, 0.25, 4.0));
        assert!(!speed_ratio_is_quality_risk(4.0, 0.25, 4.0));
        assert!(!speed_ratio_is_quality_risk(1.0, 0.25, 4.0));
    }

    #[tokio::test]
    async fn test_missing_video_fails_before_any_remote_call() {
        // No expectations set: any call on these mocks panics the test
        let pipeline = pipeline_with(
            MockScriptProvider::new(),
            MockSpeechSynthesizer::new(),
            MockMediaProcessorTrait::new(),
        );

        let request = RecapRequest {
            video_path: PathBuf::from("/nonexistent/movie.mp4"),
            script_text: None,
            voice: VoiceProfile::Male,
            blur: false,
            logo: None,
            output_path: PathBuf::from("/tmp/out.mp4"),
        };

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_provided_script_never_reaches_synthesizer() {
        let dir = tempfile::tempdir().unwrap();
        let video_path = write_fake_video(dir.path());

        let pipeline = pipeline_with(
            MockScriptProvider::new(),
            MockSpeechSynthesizer::new(),
            MockMediaProcessorTrait::new(),
        );

        let request = RecapRequest {
            video_path,
            script_text: Some("   ".to_string()),
            voice: VoiceProfile::Female,
            blur: false,
            logo: None,
            output_path: dir.path().join("out.mp4"),
        };

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
    }

    #[tokio::test]
    async fn test_run_retimes_video_onto_narration() {
        let dir = tempfile::tempdir().unwrap();
        let video_path = write_fake_video(dir.path());
        let output_path = dir.path().join("recap.mp4");

        let mut script = MockScriptProvider::new();
        script
            .expect_acquire()
            .times(1)
            .returning(|_| Ok("ဇာတ်လမ်းစစချင်းမှာတော့ စတင်သည်".to_string()));

        let mut speech = MockSpeechSynthesizer::new();
        speech
            .expect_synthesize()
            .times(1)
            .returning(|_, _, path| {
                std::fs::write(path, b"mp3").unwrap();
                Ok(())
            });

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe().times(2).returning(|p| Ok(probe_by_extension(p)));
        media
            .expect_sync_and_mux()
            .times(1)
            .withf(|_, _, _, speed, logo| (*speed - 0.5).abs() < 1e-9 && logo.is_none())
            .returning(|_, _, staged, _, _| {
                std::fs::write(staged, b"muxed").unwrap();
                Ok(())
            });

        let pipeline = pipeline_with(script, speech, media);

        let request = RecapRequest {
            video_path,
            script_text: None,
            voice: VoiceProfile::Male,
            blur: false,
            logo: None,
            output_path: output_path.clone(),
        };

        let outcome = pipeline.run(&request).await.unwrap();
        assert_eq!(outcome.speed_factor, 0.5);
        assert_eq!(outcome.video_duration, 10.0);
        assert_eq!(outcome.narration_duration, 20.0);
        assert!(!outcome.quality_risk);
        assert!(output_path.exists());
    }

    #[tokio::test]
    async fn test_run_with_blur_feeds_sanitized_copy_to_mux() {
        let dir = tempfile::tempdir().unwrap();
        let video_path = write_fake_video(dir.path());
        let output_path = dir.path().join("recap.mp4");

        let mut speech = MockSpeechSynthesizer::new();
        speech.expect_synthesize().returning(|_, _, path| {
            std::fs::write(path, b"mp3").unwrap();
            Ok(())
        });

        let mut media = MockMediaProcessorTrait::new();
        media
            .expect_blur_regions()
            .times(1)
            .withf(|_, out, regions, _| {
                out.to_string_lossy().contains("blurred") && !regions.is_empty()
            })
            .returning(|_, out, _, _| {
                std::fs::write(out, b"sanitized").unwrap();
                Ok(())
            });
        media.expect_probe().times(2).returning(|p| Ok(probe_by_extension(p)));
        media
            .expect_sync_and_mux()
            .times(1)
            .withf(|video, _, _, _, _| video.to_string_lossy().contains("blurred"))
            .returning(|_, _, staged, _, _| {
                std::fs::write(staged, b"muxed").unwrap();
                Ok(())
            });

        let pipeline = pipeline_with(MockScriptProvider::new(), speech, media);

        let request = RecapRequest {
            video_path,
            script_text: Some("ဇာတ်လမ်း".to_string()),
            voice: VoiceProfile::Female,
            blur: true,
            logo: None,
            output_path,
        };

        pipeline.run(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_duration_narration_fails_validation_before_mux() {
        let dir = tempfile::tempdir().unwrap();
        let video_path = write_fake_video(dir.path());

        let mut speech = MockSpeechSynthesizer::new();
        speech.expect_synthesize().returning(|_, _, path| {
            std::fs::write(path, b"mp3").unwrap();
            Ok(())
        });

        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe().times(2).returning(|p| {
            if p.extension().map(|e| e == "mp3").unwrap_or(false) {
                Ok(MediaInfo { duration: 0.0, width: 0, height: 0, fps: 0.0 })
            } else {
                Ok(MediaInfo { duration: 10.0, width: 1920, height: 1080, fps: 25.0 })
            }
        });
        // sync_and_mux has no expectation: reaching it would panic

        let pipeline = pipeline_with(MockScriptProvider::new(), speech, media);

        let request = RecapRequest {
            video_path,
            script_text: Some("ဇာတ်လမ်း".to_string()),
            voice: VoiceProfile::Male,
            blur: false,
            logo: None,
            output_path: dir.path().join("out.mp4"),
        };

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, RecapError::Validation(_)));
        assert!(!dir.path().join("out.mp4").exists());
    }

    #[tokio::test]
    async fn test_missing_logo_image_rejected_before_work_starts() {
        let dir = tempfile::tempdir().unwrap();
        let video_path = write_fake_video(dir.path());

        let pipeline = pipeline_with(
            MockScriptProvider::new(),
            MockSpeechSynthesizer::new(),
            MockMediaProcessorTrait::new(),
        );

        let request = RecapRequest {
            video_path,
            script_text: Some("ဇာတ်လမ်း".to_string()),
            voice: VoiceProfile::Male,
            blur: false,
            logo: Some(LogoRequest {
                image_path: dir.path().join("missing-logo.png"),
                corner: LogoCorner::TopRight,
            }),
            output_path: dir.path().join("out.mp4"),
        };

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, RecapError::FileNotFound(_)));
    }
}
