mod loader;
mod traits;

pub mod blip;
pub mod llm;
pub mod utils;

pub use traits::*;

use tokio::sync::oneshot;

pub type HandlerPayload<TItem, TOutput> = (
    Vec<TItem>,
    oneshot::Sender<anyhow::Result<Vec<anyhow::Result<TOutput>>>>,
);

/// Raised when the uploaded bytes cannot be decoded as a raster image.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode image: {0}")]
pub struct ImageDecodeError(#[from] pub image::ImageError);
