use crate::config::AppConfig;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("AI API key not configured. Set GEMINI_API_KEY or add apikey to config.properties")]
    MissingApiKey,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("AI request timed out after {0} seconds")]
    Timeout(u64),

    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("AI API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No response from AI service")]
    EmptyResponse,
}

/// One file plus the prompt to ask about it.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub path: PathBuf,
    pub prompt: String,
}

/// Turns a stored file into answer text.
#[async_trait]
pub trait AnswerRequester: Send + Sync {
    async fn ask(&self, request: &AnswerRequest) -> Result<String, AnswerError>;
}

/// MIME type sent with the inline file data.
///
/// Content sniffing wins; the extension decides otherwise, defaulting to PNG
/// since screenshots are the common case.
pub fn detect_mime_type(bytes: &[u8], path: &Path) -> String {
    if let Some(kind) = infer::get(bytes) {
        let sniffed = kind.mime_type();
        if sniffed.starts_with("image/") || sniffed == mime::APPLICATION_PDF.essence_str() {
            return sniffed.to_string();
        }
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG.to_string(),
        "pdf" => mime::APPLICATION_PDF.to_string(),
        _ => mime::IMAGE_PNG.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Gemini `generateContent` client sending the file inline as base64.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>, AnswerError> {
        tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AnswerError::FileNotFound(path.display().to_string())
            } else {
                AnswerError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })
    }
}

#[async_trait]
impl AnswerRequester for GeminiClient {
    async fn ask(&self, request: &AnswerRequest) -> Result<String, AnswerError> {
        let api_key = self.api_key.as_deref().ok_or(AnswerError::MissingApiKey)?;

        let bytes = Self::read_file(&request.path).await?;
        let mime_type = detect_mime_type(&bytes, &request.path);
        info!(
            "🤖 Asking {} about {} ({}, {} bytes)",
            self.model,
            request.path.display(),
            mime_type,
            bytes.len()
        );

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: &request.prompt,
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnswerError::Timeout(self.timeout_secs)
                } else {
                    AnswerError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("AI API returned {}: {}", status, body);
            return Err(AnswerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = extract_text(&parsed).ok_or(AnswerError::EmptyResponse)?;
        info!("💬 Received {} characters from {}", text.len(), self.model);
        Ok(text)
    }
}
