mod beam;

pub use beam::{beam_search, BeamSearchParams};

use crate::traits::{ImageCaptionInput, ImageCaptionOutput};
use crate::{ImageDecodeError, Model};
use anyhow::{anyhow, bail};
use candle_core::{DType, Device, Tensor, D};
use candle_transformers::models::blip::VisionConfig;
use candle_transformers::models::quantized_blip;
use candle_transformers::models::{blip, blip_text};
use std::path::Path;
use strum_macros::{AsRefStr, EnumString};
use tokenizers::Tokenizer;
use tracing::debug;

pub struct BLIP {
    tokenizer: Tokenizer,
    model: quantized_blip::BlipForConditionalGeneration,
    device: Device,
}

const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;
const IMAGE_SIZE: u32 = 384;
const NUM_BEAMS: usize = 6;
const NO_REPEAT_NGRAM_SIZE: usize = 2;

fn blip_base_config() -> blip::Config {
    let text_config = blip_text::Config {
        vocab_size: 30524,
        hidden_size: 768,
        encoder_hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 768,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        max_position_embeddings: 512,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-12,
        is_decoder: true,
    };
    let vision_config = VisionConfig {
        hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 512,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        image_size: IMAGE_SIZE as usize,
        patch_size: 16,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-5,
    };

    blip::Config {
        text_config,
        vision_config,
        projection_dim: 512,
        image_text_hidden_size: 256,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BLIPModel {
    Base,
    Large,
}

impl Model for BLIP {
    type Item = ImageCaptionInput;
    type Output = ImageCaptionOutput;

    fn batch_size_limit(&self) -> usize {
        1
    }

    async fn process(
        &mut self,
        items: Vec<Self::Item>,
    ) -> anyhow::Result<Vec<anyhow::Result<Self::Output>>> {
        if items.len() > self.batch_size_limit() {
            bail!("too many items");
        }

        let mut results = vec![];

        for item in items {
            let res = self.get_caption(item);
            results.push(res);
        }

        Ok(results)
    }
}

impl BLIP {
    pub async fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        model_type: BLIPModel,
        device: Device,
    ) -> anyhow::Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|_| anyhow!("failed to initialize tokenizer"))?;

        let config = match model_type {
            BLIPModel::Base => blip_base_config(),
            BLIPModel::Large => blip::Config::image_captioning_large(),
        };

        let vb = quantized_blip::VarBuilder::from_gguf(model_path, &device)?;
        let model = quantized_blip::BlipForConditionalGeneration::new(&config, vb)?;

        Ok(Self {
            tokenizer,
            model,
            device,
        })
    }

    fn get_caption(&mut self, input: ImageCaptionInput) -> anyhow::Result<String> {
        debug!("generating caption for {:?}", input);

        let image = load_image(&input.image)?.to_device(&self.device)?;
        let image_embeds = image.unsqueeze(0)?.apply(self.model.vision_model())?;

        let mut prompt_ids = vec![BOS_TOKEN_ID];
        if let Some(prompt) = input.prompt.as_deref() {
            let encoding = self
                .tokenizer
                .encode(prompt, false)
                .map_err(|e| anyhow!("failed to tokenize prompt: {}", e))?;
            prompt_ids.extend_from_slice(encoding.get_ids());
        }

        let params = BeamSearchParams {
            num_beams: NUM_BEAMS,
            min_length: input.min_length,
            max_length: input.max_length.max(prompt_ids.len() + 1),
            no_repeat_ngram_size: NO_REPEAT_NGRAM_SIZE,
            eos_token_id: SEP_TOKEN_ID,
            early_stopping: true,
            length_penalty: 1.0,
        };

        let device = self.device.clone();
        let decoder = self.model.text_decoder();
        let token_ids = beam_search(&prompt_ids, &params, |tokens| {
            // every hypothesis is scored from scratch, the cache only holds one sequence
            decoder.reset_kv_cache();
            let input_ids = Tensor::new(tokens, &device)?.unsqueeze(0)?;
            let logits = decoder.forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
            Ok(log_probs.to_dtype(DType::F32)?.to_vec1::<f32>()?)
        })?;

        let caption = self
            .tokenizer
            .decode(&token_ids, true)
            .map_err(|_| anyhow!("failed to decode caption"))?;

        Ok(caption.trim().to_string())
    }
}

/// Decode, resize and normalize an image into a (3, 384, 384) tensor on cpu.
pub fn load_image(data: &[u8]) -> anyhow::Result<Tensor> {
    let img = image::load_from_memory(data)
        .map_err(ImageDecodeError::from)?
        .resize_to_fill(
            IMAGE_SIZE,
            IMAGE_SIZE,
            image::imageops::FilterType::Triangle,
        );
    let img = img.to_rgb8();
    let data = img.into_raw();
    let size = IMAGE_SIZE as usize;
    let data = Tensor::from_vec(data, (size, size, 3), &Device::Cpu)?.permute((2, 0, 1))?;
    let mean =
        Tensor::new(&[0.48145466f32, 0.4578275, 0.40821073], &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&[0.26862954f32, 0.261_302_6, 0.275_777_1], &Device::Cpu)?
        .reshape((3, 1, 1))?;
    let tensor = (data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;
    Ok(tensor)
}
