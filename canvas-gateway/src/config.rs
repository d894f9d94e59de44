use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "HTTP and form front end for the canvas gRPC service")]
pub struct Args {
    /// Host address to bind the server to
    #[arg(long, env = "CANVAS_GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the server to
    #[arg(long, env = "CANVAS_GATEWAY_PORT", default_value_t = 7860)]
    pub port: u16,

    /// URL of the gRPC text-to-image service
    #[arg(long, env = "CANVAS_UPSTREAM", default_value = "http://localhost:50051")]
    pub upstream: String,
}

impl Args {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
