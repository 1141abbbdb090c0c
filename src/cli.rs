use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full recap pipeline for a single video
    Run {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Narration script text; skips the remote script stage
        #[arg(long)]
        script: Option<String>,

        /// File containing the narration script
        #[arg(long)]
        script_file: Option<PathBuf>,

        /// Narrator voice (male or female)
        #[arg(long, default_value = "male")]
        voice: String,

        /// Blur the configured regions before muxing
        #[arg(long)]
        blur: bool,

        /// Logo image to composite onto the output
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Corner for the logo (top-left, top-right, bottom-left, bottom-right)
        #[arg(long, default_value = "bottom-right")]
        logo_corner: String,

        /// Output video file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the pipeline for every video in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Narrator voice (male or female)
        #[arg(long, default_value = "male")]
        voice: String,

        /// Blur the configured regions before muxing
        #[arg(long)]
        blur: bool,

        /// Output directory for recap files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Acquire a narration script for a video without producing audio or video
    Script {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthesize narration audio from text
    Narrate {
        /// Narration text
        #[arg(long)]
        text: Option<String>,

        /// File containing the narration text
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Narrator voice (male or female)
        #[arg(long, default_value = "male")]
        voice: String,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Blur the configured regions out of a video
    Blur {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mux a narration track onto a video with duration sync
    Mux {
        /// Input video file
        #[arg(long)]
        video: PathBuf,

        /// Narration audio file
        #[arg(long)]
        narration: PathBuf,

        /// Logo image to composite onto the output
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Corner for the logo
        #[arg(long, default_value = "bottom-right")]
        logo_corner: String,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List available narrator voices
    Voices,
}
