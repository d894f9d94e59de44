use std::future::Future;

use anyhow::Result;
use hf_hub::api::tokio::Api;

use crate::{DeviceMap, ImagePipeline, LoadOptions, ModelVariant};

pub trait Loader {
    type Model: ImagePipeline;

    fn load(
        variant: ModelVariant,
        api: Api,
        device_map: DeviceMap,
        options: LoadOptions,
    ) -> impl Future<Output = Result<Self::Model>>
    where
        Self: Sized;
}
