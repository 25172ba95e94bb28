use crate::{ai::init_ai_handlers, config::Config};
use caption_base::CaptionGenerator;
use caption_history::{CaptionStore, JsonFileStore};
use std::sync::Arc;

/// Shared by every request, cloning only copies handles.
#[derive(Clone)]
pub struct Ctx {
    pub generator: CaptionGenerator,
    pub store: Arc<dyn CaptionStore>,
}

impl Ctx {
    pub fn new(generator: CaptionGenerator, store: Arc<dyn CaptionStore>) -> Self {
        Self { generator, store }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        let store: Arc<dyn CaptionStore> = Arc::new(JsonFileStore::open(config.captions_path()).await?);

        let ai_handler = init_ai_handlers(config)?;
        let mut generator = CaptionGenerator::new(Arc::new(ai_handler.blip)).with_store(store.clone());
        if let Some(gemini) = ai_handler.gemini {
            generator = generator.with_remote(gemini);
        }

        Ok(Self::new(generator, store))
    }
}
