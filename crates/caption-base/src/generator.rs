use crate::{
    backend::{BackendError, LocalCaptioner, RemoteCaptioner},
    error::CaptionError,
    policy::{Backend, ModelUsed, Platform},
    prompt::{LocalPrompt, RemoteInstruction},
    request::{CaptionRequest, CaptionResult},
};
use caption_history::{CaptionStore, NewCaptionRecord};
use std::sync::Arc;

/// Pick the backend for a request, or refuse the combination.
///
/// Social platforms go to the remote model unless a backend is requested.
/// The local model only writes plain captions, so an explicit local request
/// for anything but `general` is rejected before any backend runs.
pub fn decide_backend(
    backend_choice: Option<Backend>,
    platform: &Platform,
) -> Result<Backend, CaptionError> {
    match backend_choice {
        None if platform.is_social() => Ok(Backend::Remote),
        None => Ok(Backend::Local),
        Some(Backend::Local) if *platform != Platform::General => {
            Err(CaptionError::IncompatibleBackend {
                platform: platform.to_string(),
            })
        }
        Some(backend) => Ok(backend),
    }
}

/// Turns caption requests into captions.
///
/// Backends and the history store are created once at startup and shared by
/// every request. A remote failure, or an empty remote answer, falls back to
/// the local model exactly once.
#[derive(Clone)]
pub struct CaptionGenerator {
    local: Arc<dyn LocalCaptioner>,
    remote: Option<Arc<dyn RemoteCaptioner>>,
    store: Option<Arc<dyn CaptionStore>>,
}

impl std::fmt::Debug for CaptionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionGenerator")
            .field("remote", &self.remote.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl CaptionGenerator {
    pub fn new(local: Arc<dyn LocalCaptioner>) -> Self {
        Self {
            local,
            remote: None,
            store: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteCaptioner>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CaptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[tracing::instrument(
        name = "CaptionGenerator::generate",
        skip_all,
        fields(platform = %request.platform, length = %request.length, backend_choice = ?request.backend_choice)
    )]
    pub async fn generate(&self, request: CaptionRequest) -> Result<CaptionResult, CaptionError> {
        if request.image.is_empty() {
            return Err(CaptionError::Validation("No image file provided".into()));
        }

        let backend = decide_backend(request.backend_choice, &request.platform)?;
        tracing::debug!("selected {} backend", backend);

        let (text, model_used) = match backend {
            Backend::Local => (self.run_local(&request).await?, ModelUsed::Local),
            Backend::Remote => self.run_remote(&request).await?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(CaptionError::EmptyResult { model_used });
        }

        let result = CaptionResult {
            text: text.to_string(),
            model_used,
            platform: request.platform.to_string(),
            image_reference: request.image_reference(),
        };
        tracing::info!(model_used = %model_used, "caption generated");

        self.persist(&request, &result);

        Ok(result)
    }

    async fn run_local(&self, request: &CaptionRequest) -> Result<String, CaptionError> {
        let prompt = LocalPrompt::for_length(&request.length);
        self.local
            .caption(request.image.clone(), &prompt)
            .await
            .map_err(|e| {
                tracing::error!("local backend failed: {}", e);
                CaptionError::GenerationFailure {
                    backend: Backend::Local,
                    fallback_backend: None,
                    reason: e.to_string(),
                }
            })
    }

    async fn run_remote(&self, request: &CaptionRequest) -> Result<(String, ModelUsed), CaptionError> {
        let remote_result = match &self.remote {
            Some(remote) => {
                let instruction = RemoteInstruction::build(
                    &request.platform,
                    &request.tone,
                    &request.length,
                    request.include_hashtags,
                );
                remote
                    .caption(&request.image, request.mime_type(), &instruction)
                    .await
            }
            None => Err(BackendError::Unavailable),
        };

        let remote_reason = match remote_result {
            Ok(text) if !text.trim().is_empty() => return Ok((text, ModelUsed::Remote)),
            Ok(_) => "remote backend returned an empty caption".to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!("falling back to local backend: {}", remote_reason);

        // the fallback only keeps the requested length
        let prompt = LocalPrompt::for_length(&request.length);
        let fallback_failure = |reason: String| CaptionError::GenerationFailure {
            backend: Backend::Remote,
            fallback_backend: Some(Backend::Local),
            reason: format!("{}; {}", remote_reason, reason),
        };

        match self.local.caption(request.image.clone(), &prompt).await {
            Ok(text) if !text.trim().is_empty() => Ok((text, ModelUsed::RemoteThenLocalFallback)),
            Ok(_) => Err(fallback_failure(
                "local fallback returned an empty caption".into(),
            )),
            Err(e) => {
                tracing::error!("local fallback failed: {}", e);
                Err(fallback_failure(format!("local fallback failed: {}", e)))
            }
        }
    }

    /// Hand the caption to the history store without waiting for it.
    fn persist(&self, request: &CaptionRequest, result: &CaptionResult) {
        let (Some(store), Some(user_id)) = (&self.store, &request.user_id) else {
            return;
        };

        let record = NewCaptionRecord {
            user_id: user_id.clone(),
            caption: result.text.clone(),
            platform: result.platform.clone(),
            tone: request.tone.to_string(),
            length: request.length.to_string(),
            image_url: result.image_reference.clone(),
            model_used: result.model_used.to_string(),
        };

        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert(record.into()).await {
                tracing::error!("failed to save caption history: {}", e);
            }
        });
    }
}
