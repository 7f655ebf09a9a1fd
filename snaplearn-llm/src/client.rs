use std::fmt;

use anyhow::{Context as _, bail};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snaplearn_utils::env::env_non_empty;
use snaplearn_utils::formatting::excerpt;
use tracing::{debug, warn};

use crate::vision::{RawResponse, RequestPart, VisionModel, VisionRequest};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
/// Checked in order; the last spelling matches older `.env` files.
const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "GOOGLE_API_KEY", "GEMINI_aPI_KEY"];

/// Connection settings for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GeminiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(env_non_empty)
    }

    /// Build the config from any key lookup returning trimmed, non-empty values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_key = API_KEY_VARS
            .into_iter()
            .find_map(|key| lookup(key))
            .context("GEMINI_API_KEY (or GOOGLE_API_KEY) is not set")?;

        Ok(Self {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_base: lookup("GEMINI_API_BASE")
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_owned(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct GeminiService {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        let model = self.config.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_owned()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }
}

#[async_trait]
impl VisionModel for GeminiService {
    async fn generate(&self, request: &VisionRequest) -> anyhow::Result<RawResponse> {
        let body = GenerateContentRequest::from_request(request);
        debug!(model = %self.config.model, parts = request.parts().len(), "sending generateContent request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to reach Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, excerpt(&detail, 300));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .context("failed to decode Gemini response")?;

        Ok(payload.into_raw_response())
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a VisionRequest) -> Self {
        let parts = request
            .parts()
            .iter()
            .map(|part| match part {
                RequestPart::Text(text) => WirePart::Text { text },
                RequestPart::Image(image) => WirePart::InlineData {
                    inline_data: InlineData {
                        mime_type: &image.mime_type,
                        data: BASE64.encode(&image.bytes),
                    },
                },
            })
            .collect();

        Self {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Value>,
}

impl GenerateContentResponse {
    fn into_raw_response(self) -> RawResponse {
        let segments = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        if segments.is_empty() {
            warn!(prompt_feedback = ?self.prompt_feedback, "Gemini reply had no content parts");
        }

        RawResponse::new(segments)
    }
}
