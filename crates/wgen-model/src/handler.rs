//! Model handler: lazy loading, serialized generation, explicit unload.
//!
//! The handler is the one owner of the loaded model. It is shared by `Arc`
//! across requests.
//!
//! Concurrency policy:
//! - Loading is single-flight. The load runs on a blocking task that owns the
//!   slot lock until it publishes, so concurrent callers wait and then see the
//!   loaded model (or retry after a failure) instead of loading twice. A
//!   caller that goes away mid-load does not cancel it.
//! - Generation is bounded by a semaphore sized by
//!   `ModelConfig::max_concurrent_generations` (default 1). The permit travels
//!   with the blocking inference, not with the caller's future.
//! - Unload drops the handler's reference. A generation already in flight
//!   keeps its own reference and finishes; memory is freed when it does.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, error, info};
use wgen_core::RawCompletion;

use crate::backend::{BackendInfo, LoadedModel, ModelBackend, SamplingParams};
use crate::config::ModelConfig;
use crate::error::ModelError;

/// Observable lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unloaded = 0,
    Loading = 1,
    Loaded = 2,
}

impl From<u8> for ModelState {
    fn from(value: u8) -> Self {
        match value {
            1 => ModelState::Loading,
            2 => ModelState::Loaded,
            _ => ModelState::Unloaded,
        }
    }
}

type Slot = Option<Arc<dyn LoadedModel>>;

/// Owner of the model resource.
pub struct ModelHandler {
    backend: Arc<dyn ModelBackend>,
    info: BackendInfo,
    slot: Arc<Mutex<Slot>>,
    state: Arc<AtomicU8>,
    generation_permits: Arc<Semaphore>,
    seed: Option<u64>,
}

impl ModelHandler {
    /// Create an unloaded handler. Nothing is downloaded or allocated yet.
    pub fn new(backend: Arc<dyn ModelBackend>, config: &ModelConfig) -> Self {
        debug_assert!(
            config.max_concurrent_generations > 0,
            "Must allow at least one generation"
        );

        let info = backend.info();
        info!(
            model = %info.model_id,
            device = %info.device,
            precision = %info.precision,
            max_concurrent = config.max_concurrent_generations,
            "model handler configured"
        );

        Self {
            backend,
            info,
            slot: Arc::new(Mutex::new(None)),
            state: Arc::new(AtomicU8::new(ModelState::Unloaded as u8)),
            generation_permits: Arc::new(Semaphore::new(config.max_concurrent_generations.max(1))),
            seed: config.seed,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        ModelState::from(self.state.load(Ordering::Acquire))
    }

    /// Whether the model is loaded. Does not wait on an in-progress load.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state() == ModelState::Loaded
    }

    /// What this handler loads.
    #[must_use]
    pub fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn set_state(&self, state: ModelState) {
        store_state(&self.state, state);
    }

    /// Load the model if it is not loaded. Returns whether it is loaded now.
    pub async fn ensure_loaded(&self) -> bool {
        self.acquire_model().await.is_ok()
    }

    async fn acquire_model(&self) -> Result<Arc<dyn LoadedModel>, ModelError> {
        let slot = Arc::clone(&self.slot).lock_owned().await;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        self.set_state(ModelState::Loading);
        info!(model = %self.info.model_id, "loading model");

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let model_id = self.info.model_id.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            load_into(slot, backend.as_ref(), &state, &model_id)
        })
        .await
        .map_err(|e| {
            self.set_state(ModelState::Unloaded);
            error!(model = %self.info.model_id, error = %e, "model load task failed");
            ModelError::Unavailable("model load task failed".to_string())
        })?;

        loaded.map_err(|e| ModelError::Unavailable(e.to_string()))
    }

    /// Generate a completion for `prompt`, loading the model first if needed.
    ///
    /// Fails with [`ModelError::Unavailable`] when loading fails. Per-call
    /// caches are released whether generation succeeds or not.
    pub async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<RawCompletion, ModelError> {
        debug_assert!(max_tokens > 0, "Must allow at least one new token");

        let permit = Arc::clone(&self.generation_permits)
            .acquire_owned()
            .await
            .map_err(|_| ModelError::Inference("generation semaphore closed".to_string()))?;

        let model = self.acquire_model().await?;
        let seed = self.seed.unwrap_or_else(rand::random::<u64>);
        let params = SamplingParams::for_components(max_tokens, seed);
        let prompt = prompt.to_string();
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _release = ReleaseOnDrop(model.as_ref());
            model.generate(&prompt, &params)
        })
        .await
        .map_err(generation_join_error)
        .and_then(|result| result);

        match result {
            Ok(text) => {
                debug!(
                    chars = text.chars().count(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "generation finished"
                );
                Ok(RawCompletion::new(text))
            }
            Err(e) => {
                error!(error = %e, "generation failed");
                Err(e)
            }
        }
    }

    /// Drop the model and tokenizer. Safe to call when already unloaded.
    pub async fn unload(&self) {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            self.set_state(ModelState::Unloaded);
            info!(model = %self.info.model_id, "model unloaded");
        }
    }
}

fn store_state(state: &AtomicU8, value: ModelState) {
    state.store(value as u8, Ordering::Release);
}

/// Runs on the blocking pool holding the slot lock, and publishes the result
/// before releasing it.
fn load_into(
    mut slot: OwnedMutexGuard<Slot>,
    backend: &dyn ModelBackend,
    state: &AtomicU8,
    model_id: &str,
) -> Result<Arc<dyn LoadedModel>, ModelError> {
    let start = Instant::now();
    match backend.load() {
        Ok(model) => {
            let model: Arc<dyn LoadedModel> = Arc::from(model);
            *slot = Some(Arc::clone(&model));
            store_state(state, ModelState::Loaded);
            info!(
                model = %model_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "model loaded"
            );
            Ok(model)
        }
        Err(e) => {
            store_state(state, ModelState::Unloaded);
            error!(model = %model_id, error = %e, "model load failed");
            Err(e)
        }
    }
}

/// A panicked inference is an internal fault; its message stays in the log.
fn generation_join_error(e: JoinError) -> ModelError {
    if e.is_panic() {
        error!(error = %e, "generation task panicked");
        ModelError::Internal("generation task panicked".to_string())
    } else {
        ModelError::Inference(format!("generation task failed: {}", e))
    }
}

/// Calls `release_transient` on the way out of a generation call, panics included.
struct ReleaseOnDrop<'a>(&'a dyn LoadedModel);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release_transient();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fake::FakeBackend;

    fn handler_for(backend: &Arc<FakeBackend>) -> ModelHandler {
        ModelHandler::new(backend.clone(), &ModelConfig::default())
    }

    #[tokio::test]
    async fn test_starts_unloaded() {
        let backend = Arc::new(FakeBackend::with_response("hello"));
        let handler = handler_for(&backend);
        assert_eq!(handler.state(), ModelState::Unloaded);
        assert!(!handler.is_loaded());
        assert_eq!(backend.load_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_loads_lazily_once() {
        let backend = Arc::new(FakeBackend::with_response("hello"));
        let handler = handler_for(&backend);

        let first = handler.generate("prompt", 16).await.unwrap();
        let second = handler.generate("prompt", 16).await.unwrap();

        assert_eq!(first.text, "hello");
        assert_eq!(second.text, "hello");
        assert_eq!(backend.load_count(), 1);
        assert_eq!(backend.generate_count(), 2);
        assert!(handler.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let backend = Arc::new(FakeBackend::with_response("ok").fail_first_loads(1));
        let handler = handler_for(&backend);

        assert!(!handler.ensure_loaded().await);
        assert_eq!(handler.state(), ModelState::Unloaded);

        assert!(handler.ensure_loaded().await);
        assert_eq!(handler.state(), ModelState::Loaded);
        assert_eq!(backend.load_count(), 2);
    }

    #[tokio::test]
    async fn test_generate_reports_unavailable_model() {
        let backend = Arc::new(FakeBackend::with_response("ok").fail_first_loads(1));
        let handler = handler_for(&backend);

        let err = handler.generate("prompt", 16).await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable(_)));
        assert_eq!(backend.generate_count(), 0);
    }

    #[tokio::test]
    async fn test_release_runs_on_failure() {
        let backend = Arc::new(FakeBackend::with_response("ok").fail_generation("out of memory"));
        let handler = handler_for(&backend);

        let err = handler.generate("prompt", 16).await.unwrap_err();
        assert!(matches!(err, ModelError::Inference(ref m) if m.contains("out of memory")));
        assert_eq!(backend.release_count(), 1);
        assert!(handler.is_loaded(), "generation failure must not unload the model");
    }

    #[tokio::test]
    async fn test_release_runs_on_success() {
        let backend = Arc::new(FakeBackend::with_response("ok"));
        let handler = handler_for(&backend);
        handler.generate("prompt", 16).await.unwrap();
        assert_eq!(backend.release_count(), 1);
    }

    #[tokio::test]
    async fn test_unload_is_idempotent() {
        let backend = Arc::new(FakeBackend::with_response("ok"));
        let handler = handler_for(&backend);

        handler.unload().await;
        assert!(handler.ensure_loaded().await);
        handler.unload().await;
        handler.unload().await;
        assert_eq!(handler.state(), ModelState::Unloaded);

        handler.generate("prompt", 16).await.unwrap();
        assert_eq!(backend.load_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_are_single_flight() {
        let backend = Arc::new(
            FakeBackend::with_response("ok").with_load_delay(Duration::from_millis(50)),
        );
        let handler = Arc::new(handler_for(&backend));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { handler.ensure_loaded().await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(backend.load_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_generations_are_serialized_by_default() {
        let backend = Arc::new(
            FakeBackend::with_response("ok").with_generate_delay(Duration::from_millis(20)),
        );
        let handler = Arc::new(handler_for(&backend));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { handler.generate("prompt", 16).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(backend.generate_count(), 4);
        assert_eq!(backend.max_concurrent_generations(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_abandoned_generation_keeps_its_permit() {
        let backend = Arc::new(
            FakeBackend::with_response("ok").with_generate_delay(Duration::from_millis(300)),
        );
        let handler = Arc::new(handler_for(&backend));
        assert!(handler.ensure_loaded().await);

        let first = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.generate("a", 16).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        handler.generate("b", 16).await.unwrap();

        assert_eq!(backend.generate_count(), 2);
        assert_eq!(backend.max_concurrent_generations(), 1);
        assert_eq!(backend.release_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_abandoned_load_still_completes_once() {
        let backend = Arc::new(
            FakeBackend::with_response("ok").with_load_delay(Duration::from_millis(300)),
        );
        let handler = Arc::new(handler_for(&backend));

        let first = {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { handler.ensure_loaded().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(handler.state(), ModelState::Loading);

        assert!(handler.ensure_loaded().await);
        assert_eq!(backend.load_count(), 1);
        assert_eq!(handler.state(), ModelState::Loaded);
    }

    #[tokio::test]
    async fn test_generation_panic_is_internal_fault() {
        let backend = Arc::new(FakeBackend::with_response("ok").panic_on_generate());
        let handler = handler_for(&backend);

        let err = handler.generate("prompt", 16).await.unwrap_err();
        assert!(matches!(err, ModelError::Internal(ref m) if !m.contains("out of bounds")));
        assert_eq!(backend.release_count(), 1);
        assert!(handler.is_loaded());

        let err: wgen_core::PipelineError = err.into();
        assert_eq!(err.client_message(), "internal server error");
    }

    #[tokio::test]
    async fn test_fixed_seed_is_passed_through() {
        let backend = Arc::new(FakeBackend::with_response("ok"));
        let config = ModelConfig { seed: Some(42), ..Default::default() };
        let handler = ModelHandler::new(backend.clone(), &config);

        handler.generate("describe", 8).await.unwrap();
        let params = backend.last_params().unwrap();
        assert_eq!(params.seed, 42);
        assert_eq!(params.max_new_tokens, 8);
        assert_eq!(backend.last_prompt().as_deref(), Some("describe"));
    }
}
