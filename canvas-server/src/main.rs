use anyhow::Result;
use canvas_core::load_model;
use canvas_proto::TextToImageServiceServer;
use canvas_server::{init_tracing, Args, TextToImage, WorkerPool};
use clap::Parser;
use hf_hub::api::tokio::ApiBuilder;
use tonic::transport::Server;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let addr = args.bind_address()?;

    let mut api = ApiBuilder::new();
    if let Some(cache) = &args.hf_cache {
        api = api.with_cache_dir(cache.clone());
    }

    // --- Load the model once at startup ---
    let pipeline = load_model(&args.model, api.build()?, args.device, args.load_options()).await?;

    let service = TextToImage::new(pipeline, WorkerPool::new(args.workers), args.settings());

    tracing::info!(%addr, workers = args.workers, "gRPC server running");
    Server::builder()
        .add_service(TextToImageServiceServer::new(service))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    Ok(())
}
