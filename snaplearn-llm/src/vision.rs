use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::extraction::quote_literal;
use crate::intake::ImagePayload;

/// One element of a multimodal request, in the order the model receives it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPart {
    Text(String),
    Image(ImagePayload),
}

/// A single multimodal request: instruction, image, then the user's text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisionRequest {
    parts: Vec<RequestPart>,
}

impl VisionRequest {
    /// Compose the request the model expects.
    ///
    /// The first part is treated as the system-level instruction. A blank user
    /// text is left out because the service rejects empty text parts.
    pub fn compose(instruction: &str, image: ImagePayload, user_text: &str) -> Self {
        let mut parts = Vec::with_capacity(3);
        parts.push(RequestPart::Text(instruction.to_owned()));
        parts.push(RequestPart::Image(image));
        if !user_text.trim().is_empty() {
            parts.push(RequestPart::Text(user_text.to_owned()));
        }

        Self { parts }
    }

    pub fn parts(&self) -> &[RequestPart] {
        &self.parts
    }
}

/// Content segments of the model's reply, as returned by the service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResponse {
    segments: Vec<Value>,
}

impl RawResponse {
    pub fn new(segments: Vec<Value>) -> Self {
        Self { segments }
    }

    /// A reply with a single text segment.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![serde_json::json!({ "text": text.into() })])
    }

    pub fn segments(&self) -> &[Value] {
        &self.segments
    }

    /// The first segment rendered as text.
    ///
    /// Text segments render as `text: "<escaped text>"`; anything else renders
    /// as its JSON form.
    pub fn first_segment_text(&self) -> Option<String> {
        self.segments.first().map(render_segment)
    }
}

fn render_segment(segment: &Value) -> String {
    match segment.get("text").and_then(Value::as_str) {
        Some(text) => format!("text: {}", quote_literal(text)),
        None => segment.to_string(),
    }
}

/// A remote multimodal model. One call per turn, no retries.
#[async_trait]
pub trait VisionModel: Send + Sync + fmt::Debug {
    async fn generate(&self, request: &VisionRequest) -> anyhow::Result<RawResponse>;
}
