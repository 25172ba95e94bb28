use crate::config::Config;
use ai::{blip::BLIP, llm::gemini::Gemini, ImageCaptionModel};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AIHandler {
    pub blip: ImageCaptionModel,
    /// `None` when no api key is configured
    pub gemini: Option<Arc<Gemini>>,
}

pub fn init_ai_handlers(config: &Config) -> anyhow::Result<AIHandler> {
    let device = ai::utils::select_device();
    tracing::info!("using {} device for local models", ai::utils::device_name(&device));

    let model_path = config.blip_model_path();
    let tokenizer_path = config.blip_tokenizer_path();
    let model_type = config.blip_model;
    let blip = ImageCaptionModel::new(
        format!("blip-{}", model_type.as_ref()),
        move || {
            let model_path = model_path.clone();
            let tokenizer_path = tokenizer_path.clone();
            let device = device.clone();
            async move { BLIP::new(model_path, tokenizer_path, model_type, device).await }
        },
        config.blip_offload,
    )?;

    let gemini = match &config.gemini {
        Some(gemini) => {
            let client = Gemini::new(
                &gemini.api_base,
                &gemini.api_key,
                &gemini.model,
                gemini.timeout,
            )?
            .with_params(gemini.params.clone());
            tracing::info!("remote captioning enabled with {}", client.model());
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY is not set, social captions may fall back to the local model");
            None
        }
    };

    Ok(AIHandler { blip, gemini })
}
