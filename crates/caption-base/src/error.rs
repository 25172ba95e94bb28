use crate::policy::{Backend, ModelUsed};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("{0}")]
    Validation(String),

    #[error("BLIP model can only be used for 'General' captions, not for '{platform}'. Please select Gemini for social media platforms.")]
    IncompatibleBackend { platform: String },

    #[error("{}", generation_failure_message(.backend, .fallback_backend, .reason))]
    GenerationFailure {
        backend: Backend,
        fallback_backend: Option<Backend>,
        reason: String,
    },

    #[error("{model_used} backend returned an empty caption")]
    EmptyResult { model_used: ModelUsed },
}

fn generation_failure_message(
    backend: &Backend,
    fallback_backend: &Option<Backend>,
    reason: &str,
) -> String {
    match fallback_backend {
        Some(fallback) => format!(
            "caption generation failed with {} and the {} fallback: {}",
            backend, fallback, reason
        ),
        None => format!("caption generation failed with {}: {}", backend, reason),
    }
}

impl CaptionError {
    /// Client side mistakes, as opposed to backend failures.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::IncompatibleBackend { .. })
    }

    /// The backend involved in the failure. An incompatible request names the
    /// local model it asked for, plain validation errors name none.
    pub fn model(&self) -> Option<String> {
        match self {
            Self::Validation(_) => None,
            Self::IncompatibleBackend { .. } => Some(Backend::Local.to_string()),
            Self::GenerationFailure {
                backend: Backend::Remote,
                fallback_backend: Some(_),
                ..
            } => Some(ModelUsed::RemoteThenLocalFallback.to_string()),
            Self::GenerationFailure { backend, .. } => Some(backend.to_string()),
            Self::EmptyResult { model_used } => Some(model_used.to_string()),
        }
    }
}
