use anyhow::Result;
use canvas_gateway::{create_router, init_tracing, Args, GrpcBackend};
use clap::Parser;
use tokio::net::TcpListener;

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

    let backend = GrpcBackend::connect_lazy(&args.upstream)?;
    let app = create_router(backend);

    let listener = TcpListener::bind(args.bind_address()).await?;
    tracing::info!(
        "Started gateway on {} (upstream {})",
        listener.local_addr()?,
        args.upstream
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
