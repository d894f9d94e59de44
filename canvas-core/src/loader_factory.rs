use anyhow::{anyhow, Result};
use hf_hub::api::tokio::Api;

use crate::{DeviceMap, ImagePipeline, Loader, StableDiffusionLoader};
use std::sync::Arc;

/// Stable Diffusion releases the loader knows how to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableDiffusionVersion {
    V1_5,
    V2_1,
}

impl StableDiffusionVersion {
    /// Native resolution of the release, used when no size is requested.
    pub fn default_size(&self) -> usize {
        match self {
            Self::V1_5 => 512,
            Self::V2_1 => 768,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelVariant {
    StableDiffusion {
        version: StableDiffusionVersion,
        repo: String,
    },
}

impl ModelVariant {
    /// Detect model variant from a hub repository name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase();

        let is_stable_diffusion = name_upper.contains("STABLE-DIFFUSION")
            || name_upper.contains("STABLE_DIFFUSION")
            || name_upper.contains("/SD");
        // SDXL needs a second text encoder
        if !is_stable_diffusion || name_upper.contains("XL") {
            return None;
        }

        let version = if name_upper.contains("2-1") || name_upper.contains("2.1") {
            StableDiffusionVersion::V2_1
        } else {
            // 1.5 is the fallback for bare "stable-diffusion" names
            StableDiffusionVersion::V1_5
        };
        Some(ModelVariant::StableDiffusion {
            version,
            repo: model_name.to_string(),
        })
    }
}

/// Knobs that shape how the weights are loaded and the default image size.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Hub repository holding `tokenizer.json` for the CLIP text encoder.
    pub tokenizer_repo: String,
    pub use_f16: bool,
    pub use_flash_attn: bool,
    pub sliced_attention_size: Option<usize>,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            tokenizer_repo: "openai/clip-vit-large-patch14".to_string(),
            use_f16: false,
            use_flash_attn: false,
            sliced_attention_size: None,
            width: None,
            height: None,
        }
    }
}

/// Load a model based on its name, automatically detecting the appropriate loader
pub async fn load_model(
    model_name: &str,
    api: Api,
    device_map: DeviceMap,
    options: LoadOptions,
) -> Result<Arc<dyn ImagePipeline>> {
    let model_variant = ModelVariant::from_name(model_name)
        .ok_or_else(|| anyhow!("Unsupported model: {}", model_name))?;

    tracing::info!(model = model_name, variant = ?model_variant, "loading model");

    match model_variant {
        ModelVariant::StableDiffusion { .. } => {
            let model = StableDiffusionLoader::load(model_variant, api, device_map, options).await?;
            Ok(Arc::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stable-diffusion-v1-5/stable-diffusion-v1-5", StableDiffusionVersion::V1_5)]
    #[case("runwayml/stable-diffusion-v1-5", StableDiffusionVersion::V1_5)]
    #[case("stabilityai/stable-diffusion-2-1", StableDiffusionVersion::V2_1)]
    #[case("someone/sd-2.1-finetune", StableDiffusionVersion::V2_1)]
    fn detects_version(#[case] name: &str, #[case] expected: StableDiffusionVersion) {
        let Some(ModelVariant::StableDiffusion { version, repo }) = ModelVariant::from_name(name)
        else {
            panic!("{name} was not detected");
        };
        assert_eq!(version, expected);
        assert_eq!(repo, name);
    }

    #[test]
    fn unknown_models_are_rejected() {
        assert_eq!(ModelVariant::from_name("black-forest-labs/FLUX.1-schnell"), None);
        assert_eq!(ModelVariant::from_name("openai/clip-vit-large-patch14"), None);
        assert_eq!(
            ModelVariant::from_name("stabilityai/stable-diffusion-xl-base-1.0"),
            None
        );
        assert_eq!(ModelVariant::from_name("stabilityai/sdxl-turbo"), None);
    }

    #[test]
    fn native_sizes() {
        assert_eq!(StableDiffusionVersion::V1_5.default_size(), 512);
        assert_eq!(StableDiffusionVersion::V2_1.default_size(), 768);
    }
}
