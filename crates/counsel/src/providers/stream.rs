//! Throttled, retrying access to the streaming responses endpoint.
//!
//! One client serializes all of its streaming calls: a second call made
//! while a stream is alive fails fast with [`StreamError::Busy`] instead of
//! queuing. Requests are paced a minimum interval apart, and rate-limit
//! rejections are retried with jittered exponential backoff before any
//! fragment has been yielded.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::errors::StreamError;
use crate::providers::base::{ResponseRequest, ResponseTransport, StreamEvent};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(2500);
pub const DEFAULT_MAX_RETRIES: u32 = 6;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

/// Pacing and retry limits. Supplied by the caller, not owned here.
#[derive(Debug, Clone, Copy)]
pub struct StreamClientConfig {
    /// Minimum spacing between issued requests, measured start to start.
    pub min_interval: Duration,
    /// Retries allowed after a rate-limited first attempt.
    pub max_retries: u32,
    pub max_output_tokens: u32,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Timestamp of the most recently issued request. The mutex around it
/// doubles as the in-flight guard: holding the lock is being in flight.
#[derive(Debug, Default)]
struct Pacing {
    last_request: Option<Instant>,
}

pub type FragmentStream = BoxStream<'static, Result<String, StreamError>>;

pub struct ThrottledStreamClient<T> {
    transport: Arc<T>,
    config: StreamClientConfig,
    pacing: Arc<Mutex<Pacing>>,
}

impl<T: ResponseTransport> ThrottledStreamClient<T> {
    pub fn new(transport: T, config: StreamClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            pacing: Arc::new(Mutex::new(Pacing::default())),
        }
    }

    /// Open a streaming response for `agent` on `conversation`, yielding
    /// text fragments in arrival order.
    ///
    /// The in-flight guard is taken here, before anything touches the
    /// network, and travels inside the returned stream; dropping the stream
    /// early releases it along with the underlying connection. `input` is
    /// expected to be non-empty; enforcing that is the caller's job.
    pub fn stream(
        &self,
        agent: &str,
        conversation: &str,
        input: &str,
    ) -> Result<FragmentStream, StreamError> {
        let guard = self
            .pacing
            .clone()
            .try_lock_owned()
            .map_err(|_| StreamError::Busy)?;

        let request = ResponseRequest {
            agent: agent.to_string(),
            conversation: conversation.to_string(),
            input: input.to_string(),
            max_output_tokens: self.config.max_output_tokens,
            stream: true,
        };

        Ok(Box::pin(run(
            self.transport.clone(),
            self.config,
            guard,
            request,
        )))
    }
}

fn run<T: ResponseTransport>(
    transport: Arc<T>,
    config: StreamClientConfig,
    mut guard: OwnedMutexGuard<Pacing>,
    request: ResponseRequest,
) -> impl Stream<Item = Result<String, StreamError>> {
    async_stream::stream! {
        // Wait out whatever is left of the minimum interval.
        if let Some(last) = guard.last_request {
            let elapsed = last.elapsed();
            if elapsed < config.min_interval {
                sleep(config.min_interval - elapsed).await;
            }
        }

        let mut attempt: u32 = 0;
        loop {
            // Recorded at the moment the request is issued, retries included.
            guard.last_request = Some(Instant::now());

            match transport.open(&request).await {
                Ok(mut events) => {
                    debug!(agent = %request.agent, attempt, "response stream open");
                    while let Some(event) = events.next().await {
                        match event {
                            Ok(StreamEvent::OutputTextDelta { delta }) => yield Ok(delta),
                            Ok(_) => {}
                            Err(e) => {
                                // A broken stream is not restartable.
                                yield Err(StreamError::Upstream(e));
                                return;
                            }
                        }
                    }
                    return;
                }
                Err(e) if e.is_rate_limit() && attempt < config.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_rate_limit() => {
                    yield Err(StreamError::RateLimited {
                        attempts: attempt as usize + 1,
                        source: e,
                    });
                    return;
                }
                Err(e) => {
                    yield Err(StreamError::Upstream(e));
                    return;
                }
            }
        }
    }
}

/// Exponential backoff capped at 20 s, jittered into [0.75, 1.25) of the
/// base so concurrent callers do not retry in lockstep.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let base = (0.8 * 2f64.powi(attempt as i32)).min(20.0);
    let jitter = rand::thread_rng().gen_range(0.75..1.25);
    Duration::from_secs_f64(base * jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockOutcome, MockTransport};

    fn fast_config() -> StreamClientConfig {
        StreamClientConfig {
            min_interval: Duration::from_millis(2500),
            max_retries: 6,
            max_output_tokens: 1000,
        }
    }

    async fn collect(mut stream: FragmentStream) -> (String, Option<StreamError>) {
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => text.push_str(&fragment),
                Err(e) => return (text, Some(e)),
            }
        }
        (text, None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_stream_yields_fragments_in_order() {
        let transport = MockTransport::new(vec![MockOutcome::deltas(&["Arti", "cle ", "12"])]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let stream = client.stream("EnglishLegalAgent", "conv-1", "terms?").unwrap();
        let (text, error) = collect(stream).await;

        assert!(error.is_none());
        assert_eq!(text, "Article 12");
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_paced_a_minimum_interval_apart() {
        let transport = MockTransport::new(vec![
            MockOutcome::deltas(&["one"]),
            MockOutcome::deltas(&["two"]),
        ]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let first = client.stream("a", "c", "q1").unwrap();
        collect(first).await;
        let second = client.stream("a", "c", "q2").unwrap();
        collect(second).await;

        let issued = transport.issue_times();
        assert_eq!(issued.len(), 2);
        assert!(issued[1] - issued[0] >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_call_is_busy_with_no_network_calls() {
        let transport = MockTransport::new(vec![MockOutcome::deltas(&["hi"])]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        // Take the guard but do not consume the stream yet.
        let held = client.stream("a", "c", "q1").unwrap();

        match client.stream("a", "c", "q2") {
            Err(StreamError::Busy) => {}
            other => panic!("expected Busy, got {:?}", other.map(|_| "stream")),
        }
        assert_eq!(transport.attempts(), 0);

        drop(held);
        assert!(client.stream("a", "c", "q3").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limits_are_retried_until_success() {
        let transport = MockTransport::new(vec![
            MockOutcome::rate_limited(),
            MockOutcome::rate_limited(),
            MockOutcome::rate_limited(),
            MockOutcome::deltas(&["ok"]),
        ]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let stream = client.stream("a", "c", "q").unwrap();
        let (text, error) = collect(stream).await;

        assert!(error.is_none());
        assert_eq!(text, "ok");
        assert_eq!(transport.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_exhausts_the_budget() {
        let outcomes = (0..10).map(|_| MockOutcome::rate_limited()).collect();
        let transport = MockTransport::new(outcomes);
        let config = StreamClientConfig {
            max_retries: 2,
            ..fast_config()
        };
        let client = ThrottledStreamClient::new(transport.clone(), config);

        let stream = client.stream("a", "c", "q").unwrap();
        let (text, error) = collect(stream).await;

        assert_eq!(text, "");
        assert_eq!(transport.attempts(), 3);
        match error {
            Some(StreamError::RateLimited { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_surface_immediately() {
        let transport = MockTransport::new(vec![
            MockOutcome::failure(500, "internal error"),
            MockOutcome::deltas(&["never reached"]),
        ]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let stream = client.stream("a", "c", "q").unwrap();
        let (text, error) = collect(stream).await;

        assert_eq!(text, "");
        assert_eq!(transport.attempts(), 1);
        assert!(matches!(error, Some(StreamError::Upstream(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_is_released_after_failure() {
        let transport = MockTransport::new(vec![
            MockOutcome::failure(401, "bad key"),
            MockOutcome::deltas(&["fine now"]),
        ]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let stream = client.stream("a", "c", "q").unwrap();
        let (_, error) = collect(stream).await;
        assert!(error.is_some());

        // The failed call must not leak the in-flight guard.
        let stream = client.stream("a", "c", "q").unwrap();
        let (text, error) = collect(stream).await;
        assert!(error.is_none());
        assert_eq!(text, "fine now");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_a_stream_mid_flight_releases_the_guard() {
        let transport = MockTransport::new(vec![
            MockOutcome::deltas(&["partial", " answer"]),
            MockOutcome::deltas(&["second"]),
        ]);
        let client = ThrottledStreamClient::new(transport.clone(), fast_config());

        let mut stream = client.stream("a", "c", "q").unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, "partial");
        drop(stream);

        let stream = client.stream("a", "c", "q2").unwrap();
        let (text, error) = collect(stream).await;
        assert!(error.is_none());
        assert_eq!(text, "second");
    }

    #[test]
    fn test_backoff_delay_stays_within_jitter_bounds() {
        for attempt in 0..10 {
            let base = (0.8 * 2f64.powi(attempt as i32)).min(20.0);
            for _ in 0..50 {
                let delay = backoff_delay(attempt).as_secs_f64();
                assert!(delay >= base * 0.75, "attempt {}: {} too short", attempt, delay);
                assert!(delay <= base * 1.25, "attempt {}: {} too long", attempt, delay);
            }
        }
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        // Past the cap every attempt draws from the same 20s base.
        let delay = backoff_delay(12).as_secs_f64();
        assert!(delay <= 25.0);
        assert!(delay >= 15.0);
    }
}
