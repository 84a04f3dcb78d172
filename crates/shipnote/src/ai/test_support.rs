//! Scriptable capability used by the unit tests in this module tree.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::capability::{CapabilityFuture, SessionConfig, SummarizerCapability, SummarizerSession};

#[derive(Default)]
struct Shared {
    probe_calls: AtomicUsize,
    sessions_created: AtomicUsize,
    sessions_destroyed: AtomicUsize,
    fail_summarize: AtomicBool,
    fail_create: AtomicBool,
    /// Every `(text, context)` passed to `summarize`, in call order.
    calls: Mutex<Vec<(String, Option<String>)>>,
    /// When set, each `summarize` waits for one notification before replying.
    gate: Mutex<Option<Arc<Notify>>>,
}

pub(crate) struct FakeCapability {
    availability: Result<String, String>,
    shared: Arc<Shared>,
}

impl FakeCapability {
    pub fn new(availability: &str) -> Arc<Self> {
        Arc::new(Self {
            availability: Ok(availability.to_string()),
            shared: Arc::default(),
        })
    }

    pub fn failing_probe(error: &str) -> Arc<Self> {
        Arc::new(Self {
            availability: Err(error.to_string()),
            shared: Arc::default(),
        })
    }

    pub fn set_fail_summarize(&self, fail: bool) {
        self.shared.fail_summarize.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.shared.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make every later `summarize` block until the returned gate is notified.
    pub fn hold_summaries(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.shared.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn probe_calls(&self) -> usize {
        self.shared.probe_calls.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.shared.sessions_created.load(Ordering::SeqCst)
    }

    pub fn sessions_destroyed(&self) -> usize {
        self.shared.sessions_destroyed.load(Ordering::SeqCst)
    }

    pub fn summarize_calls(&self) -> Vec<(String, Option<String>)> {
        self.shared.calls.lock().unwrap().clone()
    }
}

impl SummarizerCapability for FakeCapability {
    fn availability(&self) -> CapabilityFuture<'_, String> {
        self.shared.probe_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.availability.clone();
        Box::pin(async move { result })
    }

    fn create_session<'a>(
        &'a self,
        _config: &'a SessionConfig,
    ) -> CapabilityFuture<'a, Box<dyn SummarizerSession>> {
        Box::pin(async move {
            if self.shared.fail_create.load(Ordering::SeqCst) {
                return Err("model download failed".to_string());
            }
            let id = self.shared.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Box::new(FakeSession {
                id,
                shared: self.shared.clone(),
            }) as Box<dyn SummarizerSession>)
        })
    }
}

struct FakeSession {
    id: usize,
    shared: Arc<Shared>,
}

impl SummarizerSession for FakeSession {
    fn summarize<'a>(
        &'a self,
        text: &'a str,
        context: Option<&'a str>,
    ) -> CapabilityFuture<'a, String> {
        Box::pin(async move {
            let n = {
                let mut calls = self.shared.calls.lock().unwrap();
                calls.push((text.to_string(), context.map(str::to_string)));
                calls.len()
            };
            let gate = self.shared.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.shared.fail_summarize.load(Ordering::SeqCst) {
                return Err("model crashed".to_string());
            }
            Ok(format!("summary {n} from session {}", self.id))
        })
    }

    fn destroy(&self) -> CapabilityFuture<'_, ()> {
        self.shared.sessions_destroyed.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err("destroy is flaky".to_string()) })
    }
}
