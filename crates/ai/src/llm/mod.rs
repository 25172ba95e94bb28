pub mod gemini;

/// Sampling knobs forwarded to remote models. `None` leaves the provider default.
#[derive(Debug, Clone, Default)]
pub struct LLMInferenceParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<usize>,
}
