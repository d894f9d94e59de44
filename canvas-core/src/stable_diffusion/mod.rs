use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::Module;
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use hf_hub::api::tokio::{Api, ApiRepo};
use image::DynamicImage;
use tokenizers::Tokenizer;

use crate::{
    select_best_device, tensor_to_image, DeviceMap, GenerationRequest, ImagePipeline,
    LoadOptions, Loader, ModelVariant, PromptTokenizer, StableDiffusionVersion, DEFAULT_GUIDANCE,
    DEFAULT_STEPS,
};

/// Latent scaling factor shared by the 1.5 and 2.1 autoencoders.
const VAE_SCALE: f64 = 0.18215;
const LATENT_CHANNELS: usize = 4;

impl StableDiffusionVersion {
    /// Errors when a side is not a positive multiple of 8.
    fn config(
        &self,
        sliced_attention_size: Option<usize>,
        height: usize,
        width: usize,
    ) -> Result<StableDiffusionConfig> {
        if width == 0 || height == 0 || width % 8 != 0 || height % 8 != 0 {
            anyhow::bail!("image size must be a positive multiple of 8, got {width}x{height}");
        }
        let (height, width) = (Some(height), Some(width));
        Ok(match self {
            Self::V1_5 => StableDiffusionConfig::v1_5(sliced_attention_size, height, width),
            Self::V2_1 => StableDiffusionConfig::v2_1(sliced_attention_size, height, width),
        })
    }
}

/// The CPU backend has no seedable rng, so seeds only apply on accelerators.
fn apply_seed(device: &Device, seed: Option<u64>) -> Result<()> {
    match seed {
        Some(seed) if device.is_cpu() => {
            tracing::warn!(seed, "the CPU backend cannot be seeded, ignoring seed");
            Ok(())
        }
        Some(seed) => Ok(device.set_seed(seed)?),
        None => Ok(()),
    }
}

pub struct StableDiffusionModel {
    device: Device,
    dtype: DType,
    version: StableDiffusionVersion,
    sliced_attention_size: Option<usize>,
    width: usize,
    height: usize,
    max_position_embeddings: usize,
    pad_id: u32,
    tokenizer: Tokenizer,
    clip_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl StableDiffusionModel {
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn embed(&self, text: &str) -> Result<Tensor> {
        let mut tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        // prompts are truncated upstream; clamp anyway so the encoder never overflows
        tokens.truncate(self.max_position_embeddings);
        tokens.resize(self.max_position_embeddings, self.pad_id);
        let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        Ok(self.clip_model.forward(&tokens)?)
    }
}

impl ImagePipeline for StableDiffusionModel {
    fn run(&self, request: GenerationRequest) -> Result<DynamicImage> {
        let width = request.width.unwrap_or(self.width);
        let height = request.height.unwrap_or(self.height);
        let steps = request.steps.unwrap_or(DEFAULT_STEPS);
        let guidance = request.guidance.unwrap_or(DEFAULT_GUIDANCE);
        let sd_config = self
            .version
            .config(self.sliced_attention_size, height, width)?;
        apply_seed(&self.device, request.seed)?;
        let mut scheduler = sd_config.build_scheduler(steps)?;

        // --- Text embeddings, unconditional first for classifier-free guidance ---
        let text_embeddings = self.embed(&request.prompt)?;
        let uncond_embeddings = self.embed(request.negative_prompt.as_deref().unwrap_or(""))?;
        let text_embeddings =
            Tensor::cat(&[uncond_embeddings, text_embeddings], 0)?.to_dtype(self.dtype)?;

        // --- Initial latents ---
        let latents = Tensor::randn(
            0f32,
            1f32,
            (1, LATENT_CHANNELS, height / 8, width / 8),
            &self.device,
        )?;
        let mut latents = (latents * scheduler.init_noise_sigma())?.to_dtype(self.dtype)?;

        // --- Denoising loop ---
        let timesteps = scheduler.timesteps().to_vec();
        for (index, &timestep) in timesteps.iter().enumerate() {
            let latent_model_input = Tensor::cat(&[&latents, &latents], 0)?;
            let latent_model_input = scheduler.scale_model_input(latent_model_input, timestep)?;
            let noise_pred =
                self.unet
                    .forward(&latent_model_input, timestep as f64, &text_embeddings)?;
            let noise_pred = noise_pred.chunk(2, 0)?;
            let (noise_pred_uncond, noise_pred_text) = (&noise_pred[0], &noise_pred[1]);
            let noise_pred =
                (noise_pred_uncond + ((noise_pred_text - noise_pred_uncond)? * guidance)?)?;
            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            tracing::debug!(step = index + 1, total = timesteps.len(), "denoising");
        }

        // --- Decode and postprocess ---
        let images = self.vae.decode(&(&latents / VAE_SCALE)?)?;
        let images = ((images / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let images = (images.clamp(0f32, 1.)? * 255.)?.to_dtype(DType::U8)?;
        tracing::info!(steps, width, height, "decoded image");

        tensor_to_image(&images.i(0)?)
    }

    fn prompt_tokenizer(&self) -> &dyn PromptTokenizer {
        &self.tokenizer
    }
}

pub struct StableDiffusionLoader;

struct WeightFiles {
    clip: &'static str,
    unet: &'static str,
    vae: &'static str,
}

impl WeightFiles {
    fn new(use_f16: bool) -> Self {
        if use_f16 {
            Self {
                clip: "text_encoder/model.fp16.safetensors",
                unet: "unet/diffusion_pytorch_model.fp16.safetensors",
                vae: "vae/diffusion_pytorch_model.fp16.safetensors",
            }
        } else {
            Self {
                clip: "text_encoder/model.safetensors",
                unet: "unet/diffusion_pytorch_model.safetensors",
                vae: "vae/diffusion_pytorch_model.safetensors",
            }
        }
    }
}

async fn fetch(repo: &ApiRepo, file: &str) -> Result<std::path::PathBuf> {
    repo.get(file)
        .await
        .with_context(|| format!("failed to get {file}"))
}

impl Loader for StableDiffusionLoader {
    type Model = StableDiffusionModel;

    async fn load(
        variant: ModelVariant,
        api: Api,
        device_map: DeviceMap,
        options: LoadOptions,
    ) -> Result<Self::Model> {
        let ModelVariant::StableDiffusion { version, repo } = variant;

        let width = options.width.unwrap_or(version.default_size());
        let height = options.height.unwrap_or(version.default_size());
        let sd_config = version
            .config(options.sliced_attention_size, height, width)
            .context("invalid default image size")?;

        // Configure device.
        let device = select_best_device(device_map).context("failed to set up device")?;
        let dtype = if options.use_f16 { DType::F16 } else { DType::F32 };

        // --- Load Tokenizer ---
        let tokenizer_file = fetch(
            &api.repo(hf_hub::Repo::model(options.tokenizer_repo.clone())),
            "tokenizer.json",
        )
        .await?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(anyhow::Error::msg)
            .context("failed to load CLIP tokenizer")?;
        let pad_token = sd_config.clip.pad_with.as_deref().unwrap_or("<|endoftext|>");
        let pad_id = tokenizer
            .token_to_id(pad_token)
            .with_context(|| format!("tokenizer has no `{pad_token}` token"))?;

        // --- Load weights ---
        let model_repo = api.repo(hf_hub::Repo::model(repo.clone()));
        let files = WeightFiles::new(options.use_f16);
        let clip_weights = fetch(&model_repo, files.clip).await?;
        let unet_weights = fetch(&model_repo, files.unet).await?;
        let vae_weights = fetch(&model_repo, files.vae).await?;

        let clip_model =
            stable_diffusion::build_clip_transformer(&sd_config.clip, clip_weights, &device, dtype)
                .context("failed to load CLIP text encoder")?;
        let unet = sd_config
            .build_unet(
                unet_weights,
                &device,
                LATENT_CHANNELS,
                options.use_flash_attn,
                dtype,
            )
            .context("failed to load UNet")?;
        let vae = sd_config
            .build_vae(vae_weights, &device, dtype)
            .context("failed to load autoencoder")?;

        tracing::info!(model = %repo, device = ?device, ?dtype, "Model loaded");

        Ok(StableDiffusionModel {
            device,
            dtype,
            version,
            sliced_attention_size: options.sliced_attention_size,
            width,
            height,
            max_position_embeddings: sd_config.clip.max_position_embeddings,
            pad_id,
            tokenizer,
            clip_model,
            unet,
            vae,
        })
    }
}
