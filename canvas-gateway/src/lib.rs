pub mod api;
mod backend;
pub mod config;
mod error;
pub mod ui;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

pub use api::{request_image, GenerateRequest};
pub use backend::{GrpcBackend, ImageBackend};
pub use config::Args;
pub use error::GatewayError;

pub struct AppState<B> {
    pub backend: B,
}

pub fn create_router<B: ImageBackend>(backend: B) -> Router {
    let state = Arc::new(AppState { backend });
    Router::new()
        .route("/", get(ui::index).post(ui::submit::<B>))
        .route("/generate", post(api::generate::<B>))
        .route("/health", get(api::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
