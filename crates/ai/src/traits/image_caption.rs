use super::AIModel;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct ImageCaptionInput {
    pub image: Arc<[u8]>,
    /// text the caption is conditioned on, e.g. "a photo of"
    pub prompt: Option<String>,
    /// bounds on the whole token sequence, prompt included
    pub min_length: usize,
    pub max_length: usize,
}

impl fmt::Debug for ImageCaptionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCaptionInput")
            .field("image_bytes", &self.image.len())
            .field("prompt", &self.prompt)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .finish()
    }
}

pub type ImageCaptionOutput = String;
pub type ImageCaptionModel = AIModel<ImageCaptionInput, ImageCaptionOutput>;
