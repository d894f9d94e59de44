use std::sync::Arc;

use canvas_core::{
    image_to_base64_png, truncate_prompt, GenerationRequest, ImagePipeline, DEFAULT_GUIDANCE,
    DEFAULT_STEPS, MAX_PROMPT_TOKENS,
};
use canvas_proto::{
    compose_prompt, ImageRequest, ImageResponse, ResponseEnvelope, TextToImageService,
};
use tonic::{Request, Response, Status};

use crate::{ServiceError, WorkerPool};

/// Per-request defaults applied by the service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub steps: usize,
    pub guidance: f64,
    pub max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            guidance: DEFAULT_GUIDANCE,
            max_tokens: MAX_PROMPT_TOKENS,
        }
    }
}

#[derive(Clone)]
pub struct TextToImage {
    pipeline: Arc<dyn ImagePipeline>,
    pool: WorkerPool,
    settings: GenerationSettings,
}

impl TextToImage {
    pub fn new(
        pipeline: Arc<dyn ImagePipeline>,
        pool: WorkerPool,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            pipeline,
            pool,
            settings,
        }
    }

    /// Runs one request end to end. Failures are reported inside the envelope.
    pub async fn generate(&self, request: ImageRequest) -> ResponseEnvelope {
        let raw_prompt = compose_prompt(&request.text, &request.context);
        let truncation = truncate_prompt(
            self.pipeline.prompt_tokenizer(),
            &raw_prompt,
            self.settings.max_tokens,
        );
        let prompt = truncation.prompt;

        match self.render(&prompt, request.negative_prompt).await {
            Ok(image_base64) => {
                tracing::info!(prompt = %prompt, bytes = image_base64.len(), "image generated");
                ResponseEnvelope::success(prompt, image_base64)
            }
            Err(e) => {
                tracing::error!(prompt = %prompt, code = e.status_code(), "{e}");
                ResponseEnvelope::failure(prompt, e.status_code(), e.to_string())
            }
        }
    }

    async fn render(&self, prompt: &str, negative_prompt: String) -> Result<String, ServiceError> {
        if prompt.is_empty() {
            return Err(ServiceError::EmptyPrompt);
        }
        tracing::info!("Generating image for prompt: {prompt}");

        let request = GenerationRequest {
            steps: Some(self.settings.steps),
            guidance: Some(self.settings.guidance),
            ..GenerationRequest::new(prompt)
        }
        .with_negative_prompt(negative_prompt);
        let pipeline = Arc::clone(&self.pipeline);

        self.pool
            .run(move || {
                let image = pipeline.run(request).map_err(ServiceError::Generation)?;
                image_to_base64_png(&image).map_err(ServiceError::Encoding)
            })
            .await
    }
}

#[tonic::async_trait]
impl TextToImageService for TextToImage {
    async fn generate_image(
        &self,
        request: Request<ImageRequest>,
    ) -> Result<Response<ImageResponse>, Status> {
        let envelope = self.generate(request.into_inner()).await;
        let response = ImageResponse::from_envelope(&envelope)
            .map_err(|e| Status::internal(format!("failed to encode response: {e}")))?;
        Ok(Response::new(response))
    }
}
