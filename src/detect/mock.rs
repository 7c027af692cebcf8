//! Scripted label transport for tests and offline development.

use super::transport::{LabelResponse, LabelTransport};
use crate::error::DetectorError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

/// One scripted outcome for a transport call.
pub enum MockOutcome {
    Labels(LabelResponse),
    Fail(DetectorError),
}

/// Label transport that replays a queue of scripted outcomes and counts
/// calls, mirroring the mock style used for capture devices.
#[derive(Default)]
pub struct MockLabelTransport {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    connect_failures: Mutex<VecDeque<DetectorError>>,
    pub connect_calls: AtomicU32,
    pub identity_calls: AtomicU32,
    pub detect_calls: AtomicU32,
}

impl MockLabelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful detection response.
    pub fn push_labels(&self, response: LabelResponse) {
        self.outcomes
            .lock()
            .push_back(MockOutcome::Labels(response));
    }

    /// Queue a detection failure.
    pub fn push_failure(&self, error: DetectorError) {
        self.outcomes.lock().push_back(MockOutcome::Fail(error));
    }

    /// Queue a connect failure; connects succeed once the queue drains.
    pub fn push_connect_failure(&self, error: DetectorError) {
        self.connect_failures.lock().push_back(error);
    }
}

#[async_trait]
impl LabelTransport for MockLabelTransport {
    async fn connect(&self) -> Result<(), DetectorError> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);
        match self.connect_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn caller_identity(&self) -> Result<String, DetectorError> {
        self.identity_calls.fetch_add(1, Ordering::Relaxed);
        Ok("arn:mock:caller/visionlingo-tests".to_string())
    }

    async fn detect_labels(
        &self,
        _jpeg: &[u8],
        _min_confidence_pct: f32,
        _max_labels: u32,
    ) -> Result<LabelResponse, DetectorError> {
        self.detect_calls.fetch_add(1, Ordering::Relaxed);
        match self.outcomes.lock().pop_front() {
            Some(MockOutcome::Labels(response)) => Ok(response),
            Some(MockOutcome::Fail(err)) => Err(err),
            None => Ok(LabelResponse::default()),
        }
    }
}
