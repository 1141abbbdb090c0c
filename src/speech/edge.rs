use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SpeechConfig;
use crate::error::{RecapError, Result};
use super::{SpeechSynthesizer, VoiceProfile};

/// Synthesizer backed by an Edge neural-voice HTTP bridge.
///
/// One request per run: narration text plus the voice id, audio bytes back.
/// No chunking, no SSML, no rate or pitch control.
pub struct EdgeSpeechSynthesizer {
    client: Client,
    config: SpeechConfig,
}

fn synthesis_request(text: &str, voice: VoiceProfile, format: &str) -> serde_json::Value {
    serde_json::json!({
        "input": text,
        "voice": voice.voice_id(),
        "response_format": format,
    })
}

impl EdgeSpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    async fn request_audio(&self, text: &str, voice: VoiceProfile) -> Result<Vec<u8>> {
        let url = format!("{}/v1/audio/speech", self.config.endpoint);
        debug!("Sending synthesis request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&synthesis_request(text, voice, &self.config.audio_format))
            .send()
            .await
            .map_err(|e| RecapError::Upstream(format!("Synthesis request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecapError::Upstream(format!(
                "Synthesis API error {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| RecapError::Upstream(format!("Failed to read audio body: {}", e)))?;

        if audio.is_empty() {
            return Err(RecapError::Upstream("Empty audio received".to_string()));
        }

        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeSpeechSynthesizer {
    async fn synthesize(
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

        info!(
            "Synthesizing {} chars with voice {} -> {}",
            text.len(),
            voice.voice_id(),
            output_path.display()
        );

        let bound = Duration::from_secs(self.config.timeout_secs);
        let audio = tokio::time::timeout(bound, self.request_audio(text, voice))
            .await
            .map_err(|_| {
                RecapError::Timeout(format!(
                    "Speech synthesis exceeded {}s bound",
                    self.config.timeout_secs
                ))
            })??;

        tokio::fs::write(output_path, &audio).await?;

        info!("Narration audio written ({} bytes)", audio.len());
        Ok(())
    }
}
