//! Deterministic generator for tests.

use std::{
    collections::VecDeque,
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use super::generator::{GenerationError, GenerationRequest, TextGenerator};

type Respond = dyn Fn(&GenerationRequest) -> Result<String, String> + Send + Sync;

/// Replies from a script or a routing closure, and remembers every request.
pub struct ScriptedGenerator {
    respond: Box<Respond>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Reply with each scripted result in turn; fail once the script runs out.
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<S, S>>,
        S: Into<String>,
    {
        let queue: VecDeque<Result<String, String>> = script
            .into_iter()
            .map(|r| r.map(Into::into).map_err(Into::into))
            .collect();
        let queue = Mutex::new(queue);
        Self::routed(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        })
    }

    /// Fail every call with `message`.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::routed(move |_| Err(message.clone()))
    }

    /// Reply by inspecting each request.
    pub fn routed(
        respond: impl Fn(&GenerationRequest) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request).map_err(|message| GenerationError::Io(io::Error::other(message)))
    }
}
