use std::future::Future;

use canvas_proto::{image_client, ImageRequest, ImageResponse, TextToImageServiceClient};
use tonic::{
    transport::{Channel, Endpoint},
    Status,
};

use crate::GatewayError;

/// Where the gateway sends generation requests.
pub trait ImageBackend: Send + Sync + 'static {
    fn generate_image(
        &self,
        request: ImageRequest,
    ) -> impl Future<Output = Result<ImageResponse, Status>> + Send;
}

/// The gRPC text-to-image service.
#[derive(Clone, Debug)]
pub struct GrpcBackend {
    client: TextToImageServiceClient<Channel>,
}

impl GrpcBackend {
    /// Connects on first use, so the gateway can start before the server.
    pub fn connect_lazy(endpoint: &str) -> Result<Self, GatewayError> {
        let channel = Endpoint::from_shared(endpoint.to_string())?.connect_lazy();
        Ok(Self {
            client: image_client(channel),
        })
    }
}

impl ImageBackend for GrpcBackend {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, Status> {
        let mut client = self.client.clone();
        Ok(client.generate_image(request).await?.into_inner())
    }
}
