use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ScriptConfig;
use crate::error::{RecapError, Result};
use super::common::{narration_prompt, validate_source_video, MediaState};
use super::ScriptProvider;

/// Script provider backed by the Gemini File API.
///
/// Uploads the source video through the resumable handshake, polls the file
/// until it reaches a terminal state, then asks each configured model in
/// order for a narration script under one shared deadline.
pub struct GeminiScriptProvider {
    client: Client,
    config: ScriptConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileInfo,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    uri: String,
    name: String,
    state: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<ContentRequest>,
}

#[derive(Debug, Serialize)]
struct ContentRequest {
    parts: Vec<PartRequest>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PartRequest {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// Delay before poll attempt `attempt` (0-based): fixed base interval with a
/// mild additive backoff, capped at four times the base.
fn poll_delay(base_secs: u64, attempt: u32) -> Duration {
    let step = base_secs.max(1);
    Duration::from_secs((step + u64::from(attempt) / 5 * step).min(step * 4))
}

fn media_state_from(info: &FileInfo) -> MediaState {
    match info.state.as_str() {
        "ACTIVE" => MediaState::Ready(info.uri.clone()),
        "FAILED" => MediaState::Failed(format!("remote processing failed for {}", info.name)),
        _ => MediaState::Pending,
    }
}

fn extract_script(response: GeminiResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(RecapError::Upstream(format!("Inference API error: {}", error.message)));
    }

    let text = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(RecapError::Upstream("Empty script received".to_string()));
    }

    Ok(text)
}

impl GeminiScriptProvider {
    pub fn new(config: ScriptConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self { client, config }
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| {
            RecapError::Config(format!(
                "Inference API key not set (expected in ${})",
                self.config.api_key_env
            ))
        })
    }

    fn classify(&self, context: &str, e: reqwest::Error) -> RecapError {
        if e.is_timeout() {
            RecapError::Timeout(format!("{} timed out: {}", context, e))
        } else {
            RecapError::Upstream(format!("{} failed: {}", context, e))
        }
    }

    /// Two-step resumable upload: start, then upload and finalize.
    async fn upload_video(&self, video_path: &Path, mime_type: &str) -> Result<String> {
        let file_name = video_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4");

        let file_content = tokio::fs::read(video_path).await?;
        let file_size = file_content.len();

        info!("Uploading {} ({} bytes) for analysis", file_name, file_size);

        let init_url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.endpoint,
            self.api_key()?
        );

        let init_response = self
            .client
            .post(&init_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", file_size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "file": { "display_name": file_name } }))
            .send()
            .await
            .map_err(|e| self.classify("Upload start", e))?;

        if !init_response.status().is_success() {
            let status = init_response.status();
            let body = init_response.text().await.unwrap_or_default();
            return Err(RecapError::Upstream(format!(
                "Upload start rejected ({}): {}",
                status, body
            )));
        }

        let upload_url = init_response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| RecapError::Upstream("No upload URL in response".to_string()))?;

        let upload_response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("Content-Length", file_size.to_string())
            .body(file_content)
            .send()
            .await
            .map_err(|e| self.classify("Upload", e))?;

        let upload_result: UploadResponse = upload_response
            .json()
            .await
            .map_err(|e| RecapError::Upstream(format!("Failed to parse upload response: {}", e)))?;

        Ok(upload_result.file.name)
    }

    /// Poll the uploaded file on a bounded schedule until a terminal state.
    async fn wait_for_media_active(&self, file_name: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.endpoint,
            file_name,
            self.api_key()?
        );

        for attempt in 0..self.config.poll_max_attempts {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.classify("File status check", e))?;

            let info: FileInfo = response
                .json()
                .await
                .map_err(|e| RecapError::Upstream(format!("Failed to parse file status: {}", e)))?;

            match media_state_from(&info) {
                MediaState::Ready(uri) => {
                    debug!("Uploaded media active after {} poll(s)", attempt + 1);
                    return Ok(uri);
                }
                MediaState::Failed(reason) => {
                    return Err(RecapError::Upstream(reason));
                }
                MediaState::Pending => {
                    tokio::time::sleep(poll_delay(self.config.poll_interval_secs, attempt)).await;
                }
            }
        }

        Err(RecapError::Timeout(format!(
            "Media never became active after {} polls",
            self.config.poll_max_attempts
        )))
    }

    /// One narration request against a single model.
    async fn generate(&self, model: &str, file_uri: &str, mime_type: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.endpoint,
            model,
            self.api_key()?
        );

        let request = GenerateContentRequest {
            contents: vec![ContentRequest {
                parts: vec![
                    PartRequest::FileData {
                        file_data: FileData {
                            mime_type: mime_type.to_string(),
                            file_uri: file_uri.to_string(),
                        },
                    },
                    PartRequest::Text {
                        text: narration_prompt(),
                    },
                ],
            }],
        };

        debug!("Requesting narration script from {}", model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify("Inference request", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecapError::Upstream(format!(
                "Inference API error {}: {}",
                status, body
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RecapError::Upstream(format!("Failed to parse inference response: {}", e)))?;

        extract_script(gemini_response)
    }
}

#[async_trait]
impl ScriptProvider for GeminiScriptProvider {
    async fn acquire(&self, video_path: &Path) -> Result<String> {
        let mime_type = validate_source_video(video_path)?;

        let file_name = self.upload_video(video_path, mime_type).await?;
        let file_uri = self.wait_for_media_active(&file_name).await?;

        // Ordered model chain under one shared wall-clock budget
        let deadline = Instant::now() + Duration::from_secs(self.config.chain_budget_secs);
        let mut last_error = RecapError::Config("No inference models configured".to_string());

        for model in &self.config.models {
            if Instant::now() >= deadline {
                return Err(RecapError::Timeout(format!(
                    "Model chain budget of {}s exhausted before trying {}",
                    self.config.chain_budget_secs, model
                )));
            }

            match self.generate(model, &file_uri, mime_type).await {
                Ok(script) => {
                    info!("Narration script produced by {} ({} chars)", model, script.len());
                    return Ok(script);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_delay_backs_off_and_caps() {
        assert_eq!(poll_delay(2, 0), Duration::from_secs(2));
        assert_eq!(poll_delay(2, 4), Duration::from_secs(2));
        assert_eq!(poll_delay(2, 5), Duration::from_secs(4));
        assert_eq!(poll_delay(2, 10), Duration::from_secs(6));
        assert_eq!(poll_delay(2, 50), Duration::from_secs(8));
    }

    #[test]
    fn test_media_state_mapping() {
        let info = FileInfo {
            uri: "files/abc".to_string(),
            name: "files/abc".to_string(),
            state: "ACTIVE".to_string(),
        };
        assert_eq!(media_state_from(&info), MediaState::Ready("files/abc".to_string()));

        let info = FileInfo { state: "PROCESSING".to_string(), ..info };
        assert_eq!(media_state_from(&info), MediaState::Pending);

        let info = FileInfo { state: "FAILED".to_string(), ..info };
        assert!(matches!(media_state_from(&info), MediaState::Failed(_)));
    }

    #[test]
    fn test_extract_script_joins_candidate_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "ဇာတ်လမ်း"}, {"text": "စတင်သည်"}]}}
            ]
        }"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(extract_script(response).unwrap(), "ဇာတ်လမ်းစတင်သည်");
    }

    #[test]
    fn test_extract_script_surfaces_api_error() {
        let json = r#"{"error": {"message": "quota exceeded"}}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        let err = extract_script(response).unwrap_err();
        assert!(matches!(err, RecapError::Upstream(ref m) if m.contains("quota exceeded")));
    }

    #[test]
    fn test_extract_script_rejects_empty_reply() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(extract_script(response).unwrap_err(), RecapError::Upstream(_)));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateContentRequest {
            contents: vec![ContentRequest {
                parts: vec![
                    PartRequest::FileData {
                        file_data: FileData {
                            mime_type: "video/mp4".to_string(),
                            file_uri: "files/abc".to_string(),
                        },
                    },
                    PartRequest::Text { text: "prompt".to_string() },
                ],
            }],
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["fileData"]["fileUri"], "files/abc");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "prompt");
    }
}
