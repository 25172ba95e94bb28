use crate::prompt::{LocalPrompt, RemoteInstruction};
use ai::{
    llm::gemini::{Gemini, GeminiError},
    ImageCaptionInput, ImageCaptionModel, ImageDecodeError,
};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend is not configured")]
    Unavailable,
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("backend timed out")]
    Timeout,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// In-process vision-language model producing a bounded-length caption.
#[async_trait]
pub trait LocalCaptioner: Send + Sync {
    async fn caption(&self, image: Arc<[u8]>, prompt: &LocalPrompt) -> BackendResult<String>;
}

/// Remote generative vision API. An empty string is a valid answer.
#[async_trait]
pub trait RemoteCaptioner: Send + Sync {
    async fn caption(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &RemoteInstruction,
    ) -> BackendResult<String>;
}

#[async_trait]
impl LocalCaptioner for ImageCaptionModel {
    async fn caption(&self, image: Arc<[u8]>, prompt: &LocalPrompt) -> BackendResult<String> {
        let input = ImageCaptionInput {
            image,
            prompt: Some(prompt.text.to_string()),
            min_length: prompt.min_tokens,
            max_length: prompt.max_tokens,
        };

        self.process_single(input).await.map_err(|e| {
            if e.chain().any(|v| v.is::<ImageDecodeError>()) {
                BackendError::InvalidImage(e.to_string())
            } else {
                BackendError::Other(e)
            }
        })
    }
}

#[async_trait]
impl RemoteCaptioner for Gemini {
    async fn caption(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &RemoteInstruction,
    ) -> BackendResult<String> {
        self.get_completion_with_image(instruction.as_str(), image, mime_type)
            .await
            .map_err(|e| match e {
                GeminiError::Timeout => BackendError::Timeout,
                e => BackendError::Other(e.into()),
            })
    }
}
