// src/upstream/mock.rs
//! Deterministic backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::{GenerateRequest, GenerateResponse, GenerativeBackend};
use crate::error::UplinkError;

type Responder =
    dyn Fn(&GenerateRequest, usize) -> Result<GenerateResponse, UplinkError> + Send + Sync;

/// A request as the mock saw it, stamped with the (possibly paused) tokio clock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub request: GenerateRequest,
}

pub struct MockBackend {
    responder: Box<Responder>,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    /// `respond(request, call_index)` decides every answer.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&GenerateRequest, usize) -> Result<GenerateResponse, UplinkError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(respond),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Same text for every call.
    pub fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(GenerateResponse::text(text.clone())))
    }

    /// Answers in order; once the script runs dry every call fails.
    pub fn scripted(script: Vec<Result<GenerateResponse, UplinkError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(script));
        Self::new(move |_, i| {
            queue
                .lock()
                .expect("mock script poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(UplinkError::Payload(format!("mock script exhausted at call {i}"))))
        })
    }

    /// Simulated round-trip time applied before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls poisoned").len()
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for MockBackend {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, UplinkError> {
        let index = {
            let mut calls = self.calls.lock().expect("mock calls poisoned");
            calls.push(RecordedCall {
                at: Instant::now(),
                request: req.clone(),
            });
            calls.len() - 1
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(req, index)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_answers_run_in_order_then_fail() {
        let mock = MockBackend::scripted(vec![
            Err(UplinkError::RateLimited("429".into())),
            Ok(GenerateResponse::text("ok")),
        ]);
        let req = GenerateRequest::grounded("m", "p", "s");
        assert!(mock.generate(&req).await.unwrap_err().is_rate_limited());
        assert_eq!(mock.generate(&req).await.unwrap().text, "ok");
        assert!(mock.generate(&req).await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[0].request.prompt(), "p");
    }
}
