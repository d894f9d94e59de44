use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use canvas_gateway::{create_router, GrpcBackend, ImageBackend};
use canvas_proto::{
    compose_prompt, ImageRequest, ImageResponse, ResponseEnvelope, TextToImageService,
    TextToImageServiceServer,
};
use serde_json::{json, Value};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{transport::Server, Response, Status};
use tower::ServiceExt;

const IMAGE_BYTES: usize = 6 * 1024 * 1024;

/// Answers every request with an image payload larger than tonic's default cap.
struct LargeImages;

#[tonic::async_trait]
impl TextToImageService for LargeImages {
    async fn generate_image(
        &self,
        request: tonic::Request<ImageRequest>,
    ) -> Result<Response<ImageResponse>, Status> {
        let request = request.into_inner();
        let prompt = compose_prompt(&request.text, &request.context);
        let envelope = ResponseEnvelope::success(prompt, "A".repeat(IMAGE_BYTES));
        ImageResponse::from_envelope(&envelope)
            .map(Response::new)
            .map_err(|e| Status::internal(e.to_string()))
    }
}

async fn spawn_service() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        Server::builder()
            .add_service(TextToImageServiceServer::new(LargeImages))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    format!("http://{addr}")
}

#[tokio::test]
async fn large_responses_reach_the_gateway() {
    let backend = GrpcBackend::connect_lazy(&spawn_service().await).unwrap();

    let response = backend
        .generate_image(ImageRequest {
            text: "a cat in forest".to_string(),
            context: "sunset".to_string(),
            negative_prompt: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.image_base64.len(), IMAGE_BYTES);
    assert_eq!(response.envelope().unwrap().image_base64.len(), IMAGE_BYTES);
}

#[tokio::test]
async fn large_responses_are_served_over_http() {
    let backend = GrpcBackend::connect_lazy(&spawn_service().await).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"text": "a cat in forest"}).to_string()))
        .unwrap();

    let response = create_router(backend).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["image_base64"].as_str().unwrap().len(), IMAGE_BYTES);
}
