use std::sync::Arc;

use axum::{extract::State, Json};
use canvas_proto::{apply_style, compose_prompt, ArtStyle, ImageRequest, ResponseEnvelope};
use serde::{Deserialize, Serialize};

use crate::{AppState, GatewayError, ImageBackend};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_style() -> String {
    ArtStyle::default().to_string()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Calls the service and flattens every outcome into an envelope.
pub async fn request_image<B: ImageBackend>(
    backend: &B,
    params: GenerateRequest,
) -> ResponseEnvelope {
    let styled = apply_style(&params.text, &params.style);
    let fallback_prompt = compose_prompt(&styled, &params.context);
    let request = ImageRequest {
        text: styled,
        context: params.context,
        negative_prompt: params.negative_prompt,
    };

    match backend.generate_image(request).await {
        Ok(response) => response.envelope().unwrap_or_else(|e| {
            tracing::error!("malformed response_json from service: {e}");
            ResponseEnvelope::failure(fallback_prompt, 500, format!("malformed response: {e}"))
        }),
        Err(status) => {
            tracing::error!(
                code = ?status.code(),
                "image service call failed: {}",
                status.message()
            );
            let message = if status.message().is_empty() {
                status.code().to_string()
            } else {
                status.message().to_string()
            };
            ResponseEnvelope::failure(fallback_prompt, 500, message)
        }
    }
}

pub async fn generate<B: ImageBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<ResponseEnvelope>, GatewayError> {
    tracing::info!("Generate request: {:?}", payload);
    let envelope = request_image(&state.backend, payload).await;
    if envelope.is_success() {
        Ok(Json(envelope))
    } else {
        Err(GatewayError::Generation(envelope))
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
