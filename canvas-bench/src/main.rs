use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use base64::{prelude::BASE64_STANDARD, Engine};
use canvas_proto::{image_client, GenerationStatus, ImageRequest, TextToImageServiceClient};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tonic::transport::{Channel, Endpoint};
use tracing_subscriber::EnvFilter;

mod report;

use report::LatencyReport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Concurrent load client for the canvas gRPC service")]
struct Args {
    /// URL of the gRPC text-to-image service
    #[arg(long, env = "CANVAS_ENDPOINT", default_value = "http://localhost:50051")]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fire concurrent requests and save every returned image
    Client {
        #[arg(long, default_value_t = 3)]
        requests: usize,
        /// Directory for `output_{i}.png`
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Fire concurrent requests and record each latency
    Perf {
        #[arg(long, default_value_t = 10)]
        requests: usize,
        /// CSV file for `request,seconds` rows
        #[arg(long, default_value = "performance.csv")]
        report: PathBuf,
    },
}

fn request(index: usize) -> ImageRequest {
    ImageRequest {
        text: format!("a cat in forest {index}"),
        context: "sunset".to_string(),
        negative_prompt: String::new(),
    }
}

/// Sends one request and saves the image. Any failure counts as `error`.
async fn generate_one(
    mut client: TextToImageServiceClient<Channel>,
    index: usize,
    out_dir: &Path,
) -> GenerationStatus {
    let result: Result<GenerationStatus> = async {
        let response = client.generate_image(request(index)).await?.into_inner();
        let envelope = response.envelope()?;
        println!(
            "Request {index} Status: {} (Code: {})",
            envelope.status, envelope.status_code
        );
        if envelope.is_success() {
            let path = out_dir.join(format!("output_{index}.png"));
            let png = BASE64_STANDARD.decode(&envelope.image_base64)?;
            tokio::fs::write(&path, png)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Request {index} Image saved as {}", path.display());
        } else {
            println!(
                "Request {index} Error: {}",
                envelope.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(envelope.status)
    }
    .await;

    result.unwrap_or_else(|e| {
        println!("Request {index} failed: {e:#}");
        GenerationStatus::Error
    })
}

async fn run_client(channel: Channel, requests: usize, out_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let client = image_client(channel);
    let statuses = join_all((0..requests).map(|i| generate_one(client.clone(), i, out_dir))).await;
    let succeeded = statuses
        .iter()
        .filter(|status| **status == GenerationStatus::Success)
        .count();
    println!("{succeeded}/{requests} requests succeeded");
    Ok(())
}

async fn measure(mut client: TextToImageServiceClient<Channel>, index: usize) -> (usize, Duration) {
    let start = Instant::now();
    if let Err(e) = client.generate_image(request(index)).await {
        tracing::warn!("request {index} failed: {}", e.message());
    }
    (index, start.elapsed())
}

async fn run_perf(channel: Channel, requests: usize, path: &Path) -> Result<()> {
    let client = image_client(channel);
    let samples = join_all((0..requests).map(|i| measure(client.clone(), i))).await;

    let mut report = LatencyReport::default();
    for (index, latency) in samples {
        report.record(index, latency);
    }
    tokio::fs::write(path, report.to_csv())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    if let Some(summary) = report.summary() {
        println!(
            "{} requests: min {:.2}s, mean {:.2}s, max {:.2}s",
            report.len(),
            summary.min.as_secs_f64(),
            summary.mean.as_secs_f64(),
            summary.max.as_secs_f64()
        );
    }
    println!("Performance test completed. Check '{}' for results.", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let channel = Endpoint::from_shared(args.endpoint.clone())?
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", args.endpoint))?;

    let start = Instant::now();
    match args.command {
        Command::Client { requests, out_dir } => run_client(channel, requests, &out_dir).await?,
        Command::Perf { requests, report } => run_perf(channel, requests, &report).await?,
    }
    println!("Total time: {:.2} seconds", start.elapsed().as_secs_f64());
    Ok(())
}
