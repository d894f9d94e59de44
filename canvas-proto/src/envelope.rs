//! The JSON document mirrored in `ImageResponse::response_json`.

use serde::{Deserialize, Serialize};

use crate::ImageResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Error,
}

serde_plain::derive_display_from_serialize!(GenerationStatus);
serde_plain::derive_fromstr_from_deserialize!(GenerationStatus);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: GenerationStatus,
    pub status_code: u16,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub image_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(prompt: impl Into<String>, image_base64: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Success,
            status_code: 200,
            prompt: prompt.into(),
            image_base64: image_base64.into(),
            error: None,
        }
    }

    /// Failures never carry image data.
    pub fn failure(prompt: impl Into<String>, status_code: u16, error: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Error,
            status_code,
            prompt: prompt.into(),
            image_base64: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success && self.status_code == 200
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl ImageResponse {
    /// Builds the typed fields and `response_json` from the same envelope.
    pub fn from_envelope(envelope: &ResponseEnvelope) -> serde_json::Result<Self> {
        Ok(Self {
            prompt: envelope.prompt.clone(),
            image_base64: envelope.image_base64.clone(),
            status: envelope.status.to_string(),
            status_code: i32::from(envelope.status_code),
            response_json: envelope.to_json()?,
        })
    }

    pub fn envelope(&self) -> serde_json::Result<ResponseEnvelope> {
        ResponseEnvelope::from_json(&self.response_json)
    }
}
