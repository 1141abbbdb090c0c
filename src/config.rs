use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, RecapError};

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_max_attempts() -> u32 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub script: ScriptConfig,
    pub speech: SpeechConfig,
    pub media: MediaConfig,
    pub blur: BlurConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Inference service base URL
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Resolved at startup, never serialized
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Models tried in order until one produces a script
    pub models: Vec<String>,
    /// Timeout for a single inference request (seconds)
    pub request_timeout_secs: u64,
    /// Interval between media processing polls (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Maximum media processing polls before giving up
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
    /// Shared wall-clock budget for the whole model fallback chain (seconds)
    pub chain_budget_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speech synthesis service base URL
    pub endpoint: String,
    /// Timeout for one synthesis call (seconds)
    pub timeout_secs: u64,
    /// Audio container requested from the service
    pub audio_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Additional encoding options appended to the mux command
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub encode_options: Vec<String>,
    /// Logo height in pixels when a logo overlay is requested
    pub logo_height: u32,
    /// Logo margin from the anchored corner in pixels
    pub logo_margin: u32,
    /// Speed factors outside [min, max] are flagged as a quality risk
    pub min_speed_ratio: f64,
    pub max_speed_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlurConfig {
    /// Rectangles as fractions of frame width/height
    pub regions: Vec<RegionConfig>,
    /// Gaussian blur strength
    pub sigma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: ScriptConfig {
                endpoint: "https://generativelanguage.googleapis.com".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                api_key: None,
                models: vec![
                    "gemini-3-flash-preview".to_string(),
                    "gemini-3-pro-preview".to_string(),
                ],
                request_timeout_secs: 300,
                poll_interval_secs: 2,
                poll_max_attempts: 60,
                chain_budget_secs: 600,
            },
            speech: SpeechConfig {
                endpoint: "http://localhost:5050".to_string(),
                timeout_secs: 120,
                audio_format: "mp3".to_string(),
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
                encode_options: vec![
                    // Example encoding options users can customize:
                    // "-preset".to_string(), "medium".to_string(),  // Encoding speed
                    // "-crf".to_string(), "23".to_string(),         // Quality (0-51)
                ],
                logo_height: 96,
                logo_margin: 24,
                min_speed_ratio: 0.25,
                max_speed_ratio: 4.0,
            },
            blur: BlurConfig {
                // Typical burned-in logo (top right) and subtitle band (bottom)
                regions: vec![
                    RegionConfig { left: 0.78, top: 0.02, width: 0.20, height: 0.12 },
                    RegionConfig { left: 0.10, top: 0.82, width: 0.80, height: 0.14 },
                ],
                sigma: 20.0,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RecapError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| RecapError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RecapError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RecapError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Resolve secrets from the environment. Called once at startup; the
    /// inference client refuses to run if the key is still missing when used.
    pub fn resolve(&mut self) {
        if self.script.api_key.is_none() {
            self.script.api_key = std::env::var(&self.script.api_key_env).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.script.models, config.script.models);
        assert_eq!(parsed.media.ffmpeg_path, "ffmpeg");
        assert_eq!(parsed.blur.regions.len(), 2);
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.script.api_key = Some("secret".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("secret"));
    }

    #[test]
    fn test_resolve_reads_env() {
        let mut config = Config::default();
        config.script.api_key_env = "RECAPGEN_TEST_KEY".to_string();
        std::env::set_var("RECAPGEN_TEST_KEY", "from-env");
        config.resolve();
        assert_eq!(config.script.api_key.as_deref(), Some("from-env"));
        std::env::remove_var("RECAPGEN_TEST_KEY");
    }

    #[test]
    fn test_poll_defaults_apply_when_missing() {
        let toml_str = r#"
            [script]
            endpoint = "https://example.invalid"
            api_key_env = "KEY"
            models = ["m1"]
            request_timeout_secs = 60
            chain_budget_secs = 120

            [speech]
            endpoint = "http://localhost:5050"
            timeout_secs = 60
            audio_format = "mp3"

            [media]
            ffmpeg_path = "ffmpeg"
            ffprobe_path = "ffprobe"
            encode_options = []
            logo_height = 96
            logo_margin = 24
            min_speed_ratio = 0.25
            max_speed_ratio = 4.0

            [blur]
            regions = []
            sigma = 20.0
        "#;
        let parsed: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.script.poll_interval_secs, 2);
        assert_eq!(parsed.script.poll_max_attempts, 60);
    }
}
