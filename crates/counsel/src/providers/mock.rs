//! A scripted transport for exercising the throttled client without a
//! live service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::Instant;

use crate::errors::TransportError;
use crate::providers::base::{EventStream, ResponseRequest, ResponseTransport, StreamEvent};

/// What the next `open` call should do.
#[derive(Debug)]
pub enum MockOutcome {
    Events(Vec<StreamEvent>),
    Fail(TransportError),
}

impl MockOutcome {
    /// A successful stream made of text delta events.
    pub fn deltas(fragments: &[&str]) -> Self {
        MockOutcome::Events(
            fragments
                .iter()
                .map(|f| StreamEvent::OutputTextDelta {
                    delta: f.to_string(),
                })
                .chain(std::iter::once(StreamEvent::Completed))
                .collect(),
        )
    }

    pub fn rate_limited() -> Self {
        MockOutcome::failure(429, "Too Many Requests")
    }

    pub fn failure(status: u16, message: &str) -> Self {
        MockOutcome::Fail(TransportError::Status {
            status,
            message: message.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<MockOutcome>>>,
    attempts: Arc<AtomicUsize>,
    issued: Arc<Mutex<Vec<Instant>>>,
}

impl MockTransport {
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            attempts: Arc::new(AtomicUsize::new(0)),
            issued: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// How many times `open` was called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// When each `open` call was issued.
    pub fn issue_times(&self) -> Vec<Instant> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseTransport for MockTransport {
    async fn open(&self, _request: &ResponseRequest) -> Result<EventStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.issued.lock().unwrap().push(Instant::now());

        match self.script.lock().unwrap().pop_front() {
            Some(MockOutcome::Events(events)) => {
                Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
            }
            Some(MockOutcome::Fail(e)) => Err(e),
            // Script exhausted: an empty, immediately complete stream
            None => {
                let empty: Vec<Result<StreamEvent, TransportError>> = Vec::new();
                Ok(futures::stream::iter(empty).boxed())
            }
        }
    }
}
