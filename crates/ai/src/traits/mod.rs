mod image_caption;

use crate::{loader, HandlerPayload};
use futures::Future;
pub use image_caption::*;
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub trait Model {
    type Item;
    type Output;

    fn process(
        &mut self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<anyhow::Result<Self::Output>>>> + Send;

    fn batch_size_limit(&self) -> usize;
}

pub type BatchHandlerTx<Item, Output> = mpsc::Sender<HandlerPayload<Item, Output>>;

/// Handle to a model running on its own thread.
///
/// Items are sent through a channel and processed one batch at a time, so a
/// long inference never blocks the caller's runtime. Cloning the handle is
/// cheap and every clone talks to the same model instance.
#[derive(Debug)]
pub struct AIModel<TItem, TOutput> {
    model_id: String, // for better logging
    tx: BatchHandlerTx<TItem, TOutput>,
}

impl<TItem, TOutput> Clone for AIModel<TItem, TOutput> {
    fn clone(&self) -> Self {
        Self {
            model_id: self.model_id.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<TItem, TOutput> AIModel<TItem, TOutput>
where
    TItem: Send + Sync + Clone + Debug + 'static,
    TOutput: Send + Sync + Debug + 'static,
{
    /// Spawn the model thread.
    ///
    /// With `offload_duration` set the model is loaded on first use and dropped
    /// after being idle for that long. Without it the model is loaded right away
    /// and stays resident for the lifetime of the handle.
    pub fn new<T, TFut, TFn>(
        model_id: String, // for better logging
        create_model: TFn,
        offload_duration: Option<Duration>,
    ) -> anyhow::Result<Self>
    where
        T: Model<Item = TItem, Output = TOutput> + Send + 'static,
        TFut: Future<Output = anyhow::Result<T>> + Send + 'static,
        TFn: Fn() -> TFut + Send + 'static,
    {
        let loader = loader::ModelLoader::new(create_model);
        let (tx, mut rx) = mpsc::channel::<HandlerPayload<TItem, TOutput>>(512);

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let thread_model_id = model_id.clone();
        std::thread::Builder::new()
            .name(format!("ai-model-{}", model_id))
            .spawn(move || {
                let local = tokio::task::LocalSet::new();

                local.spawn_local(async move {
                    if offload_duration.is_none() {
                        if let Err(e) = loader.load().await {
                            tracing::error!(model_id = %thread_model_id, "failed to preload model: {}", e);
                        } else {
                            tracing::info!(model_id = %thread_model_id, "model loaded");
                        }
                    }

                    loop {
                        let idle = async {
                            match offload_duration {
                                Some(duration) => tokio::time::sleep(duration).await,
                                None => std::future::pending::<()>().await,
                            }
                        };

                        tokio::select! {
                            _ = idle => {
                                if loader.is_loaded().await {
                                    tracing::debug!("No message received for {:?}, offload model", offload_duration);
                                    if let Err(e) = loader.offload().await {
                                        tracing::error!("failed to offload model: {}", e);
                                    }
                                }
                            }
                            payload = rx.recv() => {
                                match payload {
                                    Some((items, result_tx)) => {
                                        // If channel closed,
                                        // we have no way to response, just ignore task.
                                        if result_tx.is_closed() {
                                            continue;
                                        }

                                        if let Err(e) = loader.load().await {
                                            tracing::error!("failed to load model: {}", e);
                                            if result_tx.send(Err(e.context("failed to load model"))).is_err() {
                                                tracing::error!("failed to send results");
                                            }
                                            continue;
                                        }

                                        let mut model = loader.model.lock().await;
                                        let results = match model.as_mut() {
                                            Some(model) => model.process(items).await,
                                            None => Err(anyhow::anyhow!("no valid model")),
                                        };

                                        if result_tx.send(results).is_err() {
                                            tracing::error!("failed to send results");
                                        }
                                    }
                                    _ => {
                                        // this means all tx has been dropped
                                        if loader.is_loaded().await {
                                            tracing::warn!("all tx dropped, offload model and end loop");
                                            if let Err(e) = loader.offload().await {
                                                tracing::error!("failed to offload model: {}", e);
                                            }
                                        }
                                        break;
                                    }
                                }
                            }
                        }
                    }
                });

                rt.block_on(local);
            })?;

        Ok(Self { model_id, tx })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[tracing::instrument(name = "AIModel::process", err(Debug), skip_all, fields(model_id=%self.model_id))]
    pub async fn process(&self, items: Vec<TItem>) -> anyhow::Result<Vec<anyhow::Result<TOutput>>> {
        let (result_tx, rx) = oneshot::channel();
        match self.tx.send((items, result_tx)).await {
            Ok(_) => {
                tracing::debug!("items sent to model");
            }
            Err(e) => {
                anyhow::bail!("failed to send items: {:?}", e);
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(e) => {
                anyhow::bail!("failed to receive results: {:?}", e);
            }
        }
    }

    #[tracing::instrument(name = "AIModel::process_single", err(Debug), skip_all, fields(model_id=%self.model_id))]
    pub async fn process_single(&self, item: TItem) -> anyhow::Result<TOutput> {
        let results = self.process(vec![item]).await?;
        let result = results
            .into_iter()
            .next()
            .ok_or(anyhow::anyhow!("no result"))??;
        Ok(result)
    }
}
