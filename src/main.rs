//! Recapgen - Automated Movie Recap Narration Pipeline
//!
//! This is the main entry point for the recapgen application, which turns a
//! source video into a narrated recap using Gemini video analysis, a remote
//! speech synthesis service, and ffmpeg.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use recapgen::cli::{Args, Commands};
use recapgen::config::Config;
use recapgen::error::RecapError;
use recapgen::media::LogoCorner;
use recapgen::pipeline::{LogoRequest, RecapPipeline, RecapRequest};
use recapgen::speech::VoiceProfile;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting recapgen - Automated Movie Recap Narration Pipeline");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Resolve secrets from the environment once, up front
    config.resolve();

    // Create pipeline instance
    let pipeline = RecapPipeline::new(config.clone())?;
    if let Ok(version) = pipeline.media_version().await {
        info!("Media processor: {}", version);
    }

    // Execute command
    match args.command {
        Commands::Run {
            input,
            script,
            script_file,
            voice,
            blur,
            logo,
            logo_corner,
            output,
        } => {
            let voice: VoiceProfile = voice.parse()?;
            let script_text = resolve_script_text(script, script_file)?;
            let logo = resolve_logo_request(logo, &logo_corner)?;
            let output_path = output.unwrap_or_else(|| default_output_path(&input));

            let request = RecapRequest {
                video_path: input,
                script_text,
                voice,
                blur,
                logo,
                output_path,
            };

            let spinner = stage_spinner("Assembling recap (script, narration, mux)...");
            let outcome = pipeline.run(&request).await;
            spinner.finish_and_clear();
            let outcome = outcome?;

            println!("Recap written to {}", outcome.output_path.display());
            println!(
                "Video {:.2}s retimed onto {:.2}s narration (speed factor {:.3})",
                outcome.video_duration, outcome.narration_duration, outcome.speed_factor
            );
            if outcome.quality_risk {
                println!(
                    "Warning: speed factor {:.3} is extreme; playback may look unnatural",
                    outcome.speed_factor
                );
            }
        }
        Commands::Batch {
            input_dir,
            voice,
            blur,
            output_dir,
        } => {
            let voice: VoiceProfile = voice.parse()?;
            let output_dir = output_dir.unwrap_or_else(|| input_dir.clone());
            pipeline
                .process_directory(&input_dir, voice, blur, &output_dir)
                .await?;
        }
        Commands::Script { input, output } => {
            let spinner = stage_spinner("Analyzing video and writing the script...");
            let script = pipeline.acquire_script(&input).await;
            spinner.finish_and_clear();
            let script = script?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &script).await?;
                    println!("Script written to {}", path.display());
                }
                None => println!("{}", script),
            }
        }
        Commands::Narrate {
            text,
            text_file,
            voice,
            output,
        } => {
            let voice: VoiceProfile = voice.parse()?;
            let text = resolve_script_text(text, text_file)?.ok_or_else(|| {
                RecapError::Validation("Provide narration text via --text or --text-file".to_string())
            })?;

            let spinner = stage_spinner("Synthesizing narration...");
            let result = pipeline.synthesize_narration(&text, voice, &output).await;
            spinner.finish_and_clear();
            result?;

            println!("Narration written to {}", output.display());
        }
        Commands::Blur { input, output } => {
            info!("Blurring configured regions in: {}", input.display());
            pipeline.blur_video(&input, &output).await?;
            println!("Sanitized video written to {}", output.display());
        }
        Commands::Mux {
            video,
            narration,
            logo,
            logo_corner,
            output,
        } => {
            let logo = resolve_logo_request(logo, &logo_corner)?;
            let outcome = pipeline
                .mux_narration(&video, &narration, &output, logo.as_ref())
                .await?;

            println!("Recap written to {}", outcome.output_path.display());
            println!("Speed factor: {:.3}", outcome.speed_factor);
        }
        Commands::Voices => {
            println!("Available narrator voices:");
            for voice in VoiceProfile::all() {
                println!("  {:<8} {}", format!("{:?}", voice).to_lowercase(), voice.label());
            }
        }
    }

    info!("recapgen completed successfully");
    Ok(())
}

/// Narration text from an inline flag or a file; inline wins
fn resolve_script_text(
    text: Option<String>,
    text_file: Option<PathBuf>,
) -> Result<Option<String>> {
    if text.is_some() {
        return Ok(text);
    }
    match text_file {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|_| RecapError::FileNotFound(path.display().to_string()))?;
            Ok(Some(content))
        }
        None => Ok(None),
    }
}

fn resolve_logo_request(
    logo: Option<PathBuf>,
    corner: &str,
) -> Result<Option<LogoRequest>> {
    match logo {
        Some(image_path) => {
            let corner: LogoCorner = corner.parse()?;
            Ok(Some(LogoRequest { image_path, corner }))
        }
        None => Ok(None),
    }
}

/// Timestamped default output name next to the input
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "recap".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let name = format!("{}_recap_{}.mp4", stem, stamp);
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

fn stage_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let app_dir = std::env::current_dir()?.join(".recapgen");
    let log_dir = app_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "recapgen.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("recapgen.log").display());

    Ok(())
}
