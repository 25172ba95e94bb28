use ai::{
    blip::BLIPModel,
    llm::{gemini::DEFAULT_API_BASE, LLMInferenceParams},
};
use anyhow::Context;
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_SERVER_ADDR: &str = "[::]:5123"; // listens on IPv6 and IPv4
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    pub params: LLMInferenceParams,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub resources_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub server_addr: SocketAddr,
    pub blip_model: BLIPModel,
    /// `None` keeps the model loaded for the whole process lifetime
    pub blip_offload: Option<Duration>,
    /// `None` when no api key is set
    pub gemini: Option<GeminiConfig>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source, empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).with_context(|| format!("'${}' is not set", key));

        let server_addr = get("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());
        let server_addr = server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid SERVER_ADDR: {}", server_addr))?;

        let blip_model = match get("BLIP_MODEL") {
            Some(v) => BLIPModel::from_str(&v).with_context(|| format!("invalid BLIP_MODEL: {}", v))?,
            None => BLIPModel::Base,
        };

        let blip_offload = get("BLIP_OFFLOAD_SECS")
            .map(|v| parse_number::<u64>("BLIP_OFFLOAD_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);

        let gemini = match get("GEMINI_API_KEY").map(|v| strip_quotes(&v).to_string()) {
            Some(api_key) if !api_key.is_empty() => {
                let timeout = get("GEMINI_TIMEOUT_SECS")
                    .map(|v| parse_number::<u64>("GEMINI_TIMEOUT_SECS", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_GEMINI_TIMEOUT_SECS);
                Some(GeminiConfig {
                    api_key,
                    model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                    api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                    timeout: Duration::from_secs(timeout),
                    params: LLMInferenceParams {
                        temperature: get("GEMINI_TEMPERATURE")
                            .map(|v| parse_number::<f64>("GEMINI_TEMPERATURE", &v))
                            .transpose()?,
                        top_p: get("GEMINI_TOP_P")
                            .map(|v| parse_number::<f64>("GEMINI_TOP_P", &v))
                            .transpose()?,
                        max_tokens: get("GEMINI_MAX_TOKENS")
                            .map(|v| parse_number::<usize>("GEMINI_MAX_TOKENS", &v))
                            .transpose()?,
                    },
                })
            }
            _ => None,
        };

        let max_upload_bytes = get("MAX_UPLOAD_BYTES")
            .map(|v| parse_number::<usize>("MAX_UPLOAD_BYTES", &v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            resources_dir: required("LOCAL_RESOURCES_DIR")?.into(),
            data_dir: required("LOCAL_DATA_DIR")?.into(),
            log_dir: get("LOCAL_LOG_DIR").map(PathBuf::from),
            server_addr,
            blip_model,
            blip_offload,
            gemini,
            max_upload_bytes,
        })
    }

    pub fn blip_model_path(&self) -> PathBuf {
        self.resources_dir.join("blip").join("model.gguf")
    }

    pub fn blip_tokenizer_path(&self) -> PathBuf {
        self.resources_dir.join("blip").join("tokenizer.json")
    }

    pub fn captions_path(&self) -> PathBuf {
        self.data_dir.join("captions.json")
    }
}

fn strip_quotes(v: &str) -> &str {
    v.trim_matches(|c| c == '"' || c == '\'').trim()
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("invalid {}: {}", key, value))
}
