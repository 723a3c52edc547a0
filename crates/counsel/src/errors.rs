use thiserror::Error;

/// Failures raised by the transport layer when talking to the remote
/// responses endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("malformed stream payload: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether this error is the remote side telling us to slow down.
    ///
    /// When a status code is available it is authoritative. The substring
    /// fallback only applies to errors with no status attached (connection
    /// resets, proxy bodies) since those shapes are not specified anywhere.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status == 429,
            TransportError::Network(e) => match e.status() {
                Some(status) => status == reqwest::StatusCode::TOO_MANY_REQUESTS,
                None => {
                    let text = e.to_string().to_lowercase();
                    text.contains("429") || text.contains("rate")
                }
            },
            TransportError::Malformed(_) => false,
        }
    }
}

/// Failures surfaced by the throttled streaming client.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Another stream from the same client is still alive. No network call
    /// was made; the caller should not retry immediately.
    #[error("a streaming request is already in flight")]
    Busy,

    /// The remote side kept rejecting with rate-limit errors until the
    /// retry budget ran out.
    #[error("still rate limited after {attempts} attempts")]
    RateLimited {
        attempts: usize,
        #[source]
        source: TransportError,
    },

    /// Any other remote failure, passed through verbatim and never retried.
    #[error(transparent)]
    Upstream(#[from] TransportError),
}
