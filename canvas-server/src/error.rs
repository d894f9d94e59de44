use thiserror::Error;

/// Why a generation request did not produce an image.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Empty prompt provided")]
    EmptyPrompt,
    #[error("Image generation failed: {0:#}")]
    Generation(anyhow::Error),
    #[error("Failed to encode image: {0:#}")]
    Encoding(anyhow::Error),
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl ServiceError {
    /// Code reported in the response envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::EmptyPrompt => 400,
            ServiceError::Generation(_) | ServiceError::Encoding(_) | ServiceError::Worker(_) => {
                500
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_400() {
        assert_eq!(ServiceError::EmptyPrompt.status_code(), 400);
        assert_eq!(ServiceError::EmptyPrompt.to_string(), "Empty prompt provided");
    }

    #[test]
    fn everything_else_is_500() {
        let err = ServiceError::Generation(anyhow::anyhow!("CUDA out of memory"));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "Image generation failed: CUDA out of memory");
        assert_eq!(ServiceError::Worker("panicked".into()).status_code(), 500);
    }
}
