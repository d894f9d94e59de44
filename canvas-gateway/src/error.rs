use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use canvas_proto::ResponseEnvelope;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("generation failed with status {}", .0.status_code)]
    Generation(ResponseEnvelope),
    #[error("invalid upstream endpoint: {0}")]
    InvalidEndpoint(#[from] tonic::transport::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Generation(envelope) => {
                let status = StatusCode::from_u16(envelope.status_code)
                    .ok()
                    .filter(|status| status.is_client_error() || status.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(json!({ "detail": envelope }))).into_response()
            }
            GatewayError::InvalidEndpoint(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}
