//! Wire types shared by the gRPC server, the HTTP gateway and the bench client.

pub mod envelope;
pub mod prompt;

use tonic::transport::Channel;

pub mod text2image {
    tonic::include_proto!("text2image");
}

pub use envelope::{GenerationStatus, ResponseEnvelope};
pub use prompt::{apply_style, compose_prompt, ArtStyle};
pub use text2image::{
    text_to_image_service_client::TextToImageServiceClient,
    text_to_image_service_server::{TextToImageService, TextToImageServiceServer},
    ImageRequest, ImageResponse,
};

/// Port the gRPC service listens on unless told otherwise.
pub const DEFAULT_RPC_PORT: u16 = 50051;

/// Message cap for image traffic. A response carries its PNG twice, once in
/// `image_base64` and once inside `response_json`, which outgrows tonic's 4 MiB
/// default at 1024x1024.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Client for the text-to-image service with room for full-resolution images.
pub fn image_client(channel: Channel) -> TextToImageServiceClient<Channel> {
    TextToImageServiceClient::new(channel)
        .max_decoding_message_size(MAX_MESSAGE_BYTES)
        .max_encoding_message_size(MAX_MESSAGE_BYTES)
}
