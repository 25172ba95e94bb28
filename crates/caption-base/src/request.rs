use crate::policy::{Backend, Length, ModelUsed, Platform, Tone};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Clone)]
pub struct CaptionRequest {
    pub image: Arc<[u8]>,
    pub tone: Tone,
    pub length: Length,
    pub platform: Platform,
    pub backend_choice: Option<Backend>,
    pub include_hashtags: bool,
    pub user_id: Option<String>,
}

impl std::fmt::Debug for CaptionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionRequest")
            .field("image", &format_args!("<{} bytes>", self.image.len()))
            .field("tone", &self.tone)
            .field("length", &self.length)
            .field("platform", &self.platform)
            .field("backend_choice", &self.backend_choice)
            .field("include_hashtags", &self.include_hashtags)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl CaptionRequest {
    pub fn new(image: impl Into<Arc<[u8]>>) -> Self {
        Self {
            image: image.into(),
            tone: Tone::default(),
            length: Length::default(),
            platform: Platform::default(),
            backend_choice: None,
            include_hashtags: false,
            user_id: None,
        }
    }

    /// Sniffed mime type of the image, `image/jpeg` when unknown.
    pub fn mime_type(&self) -> &'static str {
        infer::get(&self.image)
            .filter(|v| v.matcher_type() == infer::MatcherType::Image)
            .map(|v| v.mime_type())
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// The image as a `data:` URL, echoed back to the client and kept in history.
    pub fn image_reference(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.image))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionResult {
    pub text: String,
    pub model_used: ModelUsed,
    pub platform: String,
    pub image_reference: String,
}
