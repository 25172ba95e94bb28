use super::LLMInferenceParams;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini request timed out")]
    Timeout,
    #[error("gemini request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("gemini returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to parse gemini response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeminiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(e)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` endpoint.
///
/// One call is one HTTP round trip, there is no retry here. The request
/// timeout configured at construction bounds every call.
#[derive(Debug)]
pub struct Gemini {
    base_url: String,
    model: String,
    api_key: SecretString,
    client: reqwest::Client,
    params: LLMInferenceParams,
}

impl Gemini {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let model = model.trim().trim_start_matches("models/").to_string();
        anyhow::ensure!(!model.is_empty(), "gemini model name is empty");

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            model,
            api_key: SecretString::from(api_key.to_string()),
            client,
            params: LLMInferenceParams::default(),
        })
    }

    pub fn with_params(mut self, params: LLMInferenceParams) -> Self {
        self.params = params;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send `prompt` with one inline image and return the text of the first
    /// candidate. A successful response without any text yields an empty string.
    #[tracing::instrument(name = "Gemini::get_completion_with_image", skip_all, fields(model = %self.model))]
    pub async fn get_completion_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, GeminiError> {
        let generation_config = match &self.params {
            LLMInferenceParams {
                temperature: None,
                top_p: None,
                max_tokens: None,
            } => None,
            params => Some(GenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                max_output_tokens: params.max_tokens,
            }),
        };

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type,
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
            generation_config,
        };

        tracing::debug!("sending request to gemini: {}", self.endpoint());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|v| v.error.message)
                .unwrap_or(text);
            return Err(GeminiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let response: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| GeminiError::Parse(e.to_string()))?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            tracing::warn!("gemini returned no candidates");
            return Ok(String::new());
        };

        if let Some(reason) = &candidate.finish_reason {
            tracing::debug!("gemini finish reason: {}", reason);
        }

        let caption = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(caption.trim().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::{Gemini, GeminiError};
    use crate::llm::LLMInferenceParams;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-test:generateContent";

    fn client(server: &MockServer, timeout: Duration) -> Gemini {
        Gemini::new(&server.uri(), "test-key", "models/gemini-test", timeout).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_caption_text_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "  Sunset "}, {"text": "vibes 🌅\n"}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_secs(5));
        let caption = gemini
            .get_completion_with_image("describe", &[1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(caption, "Sunset vibes 🌅");
    }

    #[test_log::test(tokio::test)]
    async fn test_generation_config_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(body_partial_json(json!({
                "generationConfig": {"temperature": 0.4, "maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_secs(5)).with_params(LLMInferenceParams {
            temperature: Some(0.4),
            top_p: None,
            max_tokens: Some(256),
        });
        let caption = gemini
            .get_completion_with_image("describe", &[1], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(caption, "ok");
    }

    #[test_log::test(tokio::test)]
    async fn test_no_candidates_is_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_secs(5));
        let caption = gemini
            .get_completion_with_image("describe", &[1], "image/jpeg")
            .await
            .unwrap();
        assert!(caption.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
            })))
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_secs(5));
        let err = gemini
            .get_completion_with_image("describe", &[1], "image/jpeg")
            .await
            .unwrap_err();
        match err {
            GeminiError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_secs(5));
        let err = gemini
            .get_completion_with_image("describe", &[1], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::Parse(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(800))
                    .set_body_json(json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let gemini = client(&server, Duration::from_millis(100));
        let err = gemini
            .get_completion_with_image("describe", &[1], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, GeminiError::Timeout));
    }
}
