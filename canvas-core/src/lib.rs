#[cfg(feature = "accelerate")]
extern crate accelerate_src;
#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

pub mod device_map;
pub mod loader;
mod loader_factory;
pub mod truncation;
mod util;

mod stable_diffusion;

pub use device_map::*;
use image::DynamicImage;
pub use loader::*;
pub use loader_factory::*;
use serde::{Deserialize, Serialize};
pub use stable_diffusion::{StableDiffusionLoader, StableDiffusionModel};
pub use truncation::{
    truncate_prompt, PromptTokenizer, Truncation, TruncationKind, MAX_PROMPT_TOKENS,
};
pub use util::{image_to_base64_png, image_to_png_bytes};
pub(crate) use util::*;

/// Inference steps used when a request does not ask for a specific count.
pub const DEFAULT_STEPS: usize = 15;
/// Classifier-free guidance scale used when a request does not set one.
pub const DEFAULT_GUIDANCE: f64 = 7.5;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, PartialOrd, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub steps: Option<usize>,
    pub guidance: Option<f64>,
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// An empty negative prompt is treated as no negative prompt at all.
    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        let negative_prompt = negative_prompt.into();
        self.negative_prompt = (!negative_prompt.is_empty()).then_some(negative_prompt);
        self
    }
}

/// A loaded text-to-image model. `run` blocks for the whole denoising loop.
pub trait ImagePipeline: Send + Sync {
    fn run(&self, request: GenerationRequest) -> anyhow::Result<DynamicImage>;

    /// Tokenizer of the model's text encoder, used to fit prompts to its window.
    fn prompt_tokenizer(&self) -> &dyn PromptTokenizer;
}

impl<P: ImagePipeline + ?Sized> ImagePipeline for std::sync::Arc<P> {
    fn run(&self, request: GenerationRequest) -> anyhow::Result<DynamicImage> {
        (**self).run(request)
    }

    fn prompt_tokenizer(&self) -> &dyn PromptTokenizer {
        (**self).prompt_tokenizer()
    }
}
