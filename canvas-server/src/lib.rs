pub mod config;
mod error;
mod pool;
mod service;

pub use config::Args;
pub use error::ServiceError;
pub use pool::WorkerPool;
pub use service::{GenerationSettings, TextToImage};

use tracing_subscriber::EnvFilter;

/// Model calls allowed in flight unless configured otherwise.
pub const DEFAULT_WORKERS: usize = 4;

/// Logs to stderr at `info`, or whatever `RUST_LOG` asks for.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
