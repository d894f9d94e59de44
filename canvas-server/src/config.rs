use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use anyhow::{Context, Result};
use canvas_core::{DeviceMap, LoadOptions, DEFAULT_GUIDANCE, DEFAULT_STEPS, MAX_PROMPT_TOKENS};
use canvas_proto::DEFAULT_RPC_PORT;
use clap::Parser;

use crate::{GenerationSettings, DEFAULT_WORKERS};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Canvas text-to-image gRPC server")]
pub struct Args {
    /// Address to bind the gRPC server to
    #[arg(long, env = "CANVAS_HOST", default_value = "::")]
    pub host: String,

    /// Port to bind the gRPC server to
    #[arg(long, env = "CANVAS_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub port: u16,

    /// Hub repository of the diffusion model
    #[arg(
        long,
        env = "CANVAS_MODEL",
        default_value = "stable-diffusion-v1-5/stable-diffusion-v1-5"
    )]
    pub model: String,

    /// Hub repository holding the CLIP `tokenizer.json`
    #[arg(long, env = "CANVAS_TOKENIZER", default_value = "openai/clip-vit-large-patch14")]
    pub tokenizer: String,

    /// `cpu` or the ordinal of the accelerator to use
    #[arg(long, env = "CANVAS_DEVICE", default_value = "0")]
    pub device: DeviceMap,

    /// Model calls allowed in flight at once
    #[arg(long, env = "CANVAS_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Denoising steps per image
    #[arg(long, env = "CANVAS_STEPS", default_value_t = DEFAULT_STEPS)]
    pub steps: usize,

    /// Classifier-free guidance scale
    #[arg(long, env = "CANVAS_GUIDANCE", default_value_t = DEFAULT_GUIDANCE)]
    pub guidance: f64,

    /// Image width, defaults to the model's native size
    #[arg(long, env = "CANVAS_WIDTH")]
    pub width: Option<usize>,

    /// Image height, defaults to the model's native size
    #[arg(long, env = "CANVAS_HEIGHT")]
    pub height: Option<usize>,

    /// Token window prompts are truncated to
    #[arg(long, env = "CANVAS_MAX_TOKENS", default_value_t = MAX_PROMPT_TOKENS)]
    pub max_tokens: usize,

    /// Load half precision weights
    #[arg(long, env = "CANVAS_F16")]
    pub f16: bool,

    /// Use flash attention in the UNet (needs the `flash-attn` feature)
    #[arg(long, env = "CANVAS_FLASH_ATTN")]
    pub flash_attn: bool,

    /// Split attention into slices of this size to save memory
    #[arg(long, env = "CANVAS_SLICED_ATTENTION_SIZE")]
    pub sliced_attention_size: Option<usize>,

    /// Directory for downloaded hub files
    #[arg(long, env = "CANVAS_HF_CACHE")]
    pub hf_cache: Option<PathBuf>,
}

impl Args {
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("invalid host address `{}`", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            tokenizer_repo: self.tokenizer.clone(),
            use_f16: self.f16,
            use_flash_attn: self.flash_attn,
            sliced_attention_size: self.sliced_attention_size,
            width: self.width,
            height: self.height,
        }
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            steps: self.steps,
            guidance: self.guidance,
            max_tokens: self.max_tokens,
        }
    }
}
