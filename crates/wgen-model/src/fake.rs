//! In-process fake backend for tests.
//!
//! Returns a canned completion and records how it was driven: loads,
//! generations, releases, the last prompt and the peak number of concurrent
//! generations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::backend::{BackendInfo, LoadedModel, ModelBackend, SamplingParams};
use crate::error::ModelError;

#[derive(Default)]
struct Counters {
    loads: AtomicUsize,
    generates: AtomicUsize,
    releases: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
    last_params: Mutex<Option<SamplingParams>>,
}

/// Fake model backend.
pub struct FakeBackend {
    response: String,
    generation_error: Option<String>,
    panic_on_generate: bool,
    failing_loads: AtomicUsize,
    load_delay: Duration,
    generate_delay: Duration,
    counters: Arc<Counters>,
}

impl FakeBackend {
    /// Backend whose model always answers `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            generation_error: None,
            panic_on_generate: false,
            failing_loads: AtomicUsize::new(0),
            load_delay: Duration::ZERO,
            generate_delay: Duration::ZERO,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Fail the first `count` load attempts.
    pub fn fail_first_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every generation with `message`.
    pub fn fail_generation(mut self, message: impl Into<String>) -> Self {
        self.generation_error = Some(message.into());
        self
    }

    /// Panic inside every generation.
    pub fn panic_on_generate(mut self) -> Self {
        self.panic_on_generate = true;
        self
    }

    /// Sleep this long inside each load.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Sleep this long inside each generation.
    pub fn with_generate_delay(mut self, delay: Duration) -> Self {
        self.generate_delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.counters.generates.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    /// Highest number of generations observed running at once.
    pub fn max_concurrent_generations(&self) -> usize {
        self.counters.max_active.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.counters.last_prompt.lock().ok().and_then(|p| p.clone())
    }

    pub fn last_params(&self) -> Option<SamplingParams> {
        self.counters.last_params.lock().ok().and_then(|p| p.clone())
    }
}

impl ModelBackend for FakeBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            model_id: "fake/echo".to_string(),
            device: "cpu".to_string(),
            precision: "f32".to_string(),
        }
    }

    fn load(&self) -> Result<Box<dyn LoadedModel>, ModelError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }

        let fail = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(ModelError::Load("simulated load failure".to_string()));
        }

        Ok(Box::new(FakeModel {
            response: self.response.clone(),
            generation_error: self.generation_error.clone(),
            panic_on_generate: self.panic_on_generate,
            generate_delay: self.generate_delay,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeModel {
    response: String,
    generation_error: Option<String>,
    panic_on_generate: bool,
    generate_delay: Duration,
    counters: Arc<Counters>,
}

impl LoadedModel for FakeModel {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError> {
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);
        self.counters.generates.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.counters.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if let Ok(mut last) = self.counters.last_params.lock() {
            *last = Some(params.clone());
        }

        if !self.generate_delay.is_zero() {
            std::thread::sleep(self.generate_delay);
        }
        self.counters.active.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on_generate {
            panic!("decoder index out of bounds");
        }

        match self.generation_error {
            Some(ref message) => Err(ModelError::Inference(message.clone())),
            None => Ok(self.response.clone()),
        }
    }

    fn release_transient(&self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}
