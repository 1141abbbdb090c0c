use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::error::{Result, RecapError};
use super::LogoCorner;

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add a filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Map a stream into the output
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    /// Execute the command, discarding stdout
    pub async fn execute(&self) -> Result<()> {
        self.run().map(|_| ())
    }

    /// Execute the command and return captured stdout
    pub async fn execute_capture(&self) -> Result<String> {
        self.run()
    }

    fn run(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        let output = cmd.output()
            .map_err(|e| RecapError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecapError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Builder for the pipeline's media operations
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build a stream/format probe command (JSON output)
    pub fn probe_media<P: AsRef<Path>>(&self, media_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Media probe")
            .arg("-v").arg("error")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .output(media_path)
    }

    /// Build a region-blur pass. The graph must consume `[0:v]` and emit
    /// `[vout]`; audio is dropped here and re-attached by the mux stage.
    pub fn blur_pass<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
        filter_graph: &str,
        encode_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Region blur")
            .overwrite()
            .input(video_path)
            .filter_complex(filter_graph)
            .map("[vout]")
            .no_audio()
            .video_codec("libx264")
            .args(encode_options.iter().cloned())
            .output(output_path)
    }

    /// Build a passthrough copy with the audio stripped, used when every
    /// blur region clips out of frame.
    pub fn strip_audio_copy<P: AsRef<Path>>(
        &self,
        video_path: P,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio strip")
            .overwrite()
            .input(video_path)
            .no_audio()
            .video_codec("copy")
            .output(output_path)
    }

    /// Build the duration-sync mux: retime the video by `speed_factor` so it
    /// lands on the narration's duration, drop the original audio by mapping
    /// only the narration, and encode for delivery.
    pub fn sync_mux<P: AsRef<Path>>(
        &self,
        video_path: P,
        narration_path: P,
        output_path: P,
        speed_factor: f64,
        logo: Option<&LogoOverlay>,
        encode_options: &[String],
    ) -> MediaCommand {
        let mut graph = format!("[0:v]setpts=PTS/{:.6}[v0]", speed_factor);
        match logo {
            Some(overlay) => {
                graph.push_str(&format!(
                    ";[2:v]scale=-1:{}[logo];[v0][logo]overlay={}[vout]",
                    overlay.height,
                    overlay.corner.overlay_expr(overlay.margin)
                ));
            }
            None => {
                graph = graph.replace("[v0]", "[vout]");
            }
        }

        let mut cmd = MediaCommand::new(&self.ffmpeg_path, "Duration-sync mux")
            .overwrite()
            .input(&video_path)
            .input(&narration_path);

        if let Some(overlay) = logo {
            cmd = cmd.input(&overlay.image_path);
        }

        cmd.filter_complex(graph)
            .map("[vout]")
            .map("1:a")
            .video_codec("libx264")
            .audio_codec("aac")
            .args(encode_options.iter().cloned())
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check")
            .arg("-version")
    }
}

/// Logo compositing parameters for the mux stage
#[derive(Debug, Clone)]
pub struct LogoOverlay {
    pub image_path: std::path::PathBuf,
    pub corner: LogoCorner,
    pub height: u32,
    pub margin: u32,
}
