use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::TransportError;

/// A streaming response request, immutable once issued.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    /// Name of the agent registered with the remote project.
    pub agent: String,
    /// Opaque identifier of the server-side conversation to append to.
    pub conversation: String,
    pub input: String,
    pub max_output_tokens: u32,
    pub stream: bool,
}

/// Events carried by the response stream. Only the text delta carries
/// payload this client consumes; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { delta: String },

    #[serde(rename = "response.completed")]
    Completed,

    #[serde(other)]
    Other,
}

/// An agent registered with the remote project.
#[derive(Debug, Clone, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
}

pub type EventStream = BoxStream<'static, Result<StreamEvent, TransportError>>;

/// Seam between the throttled client and the wire. The HTTP implementation
/// lives in [`super::foundry`]; tests script [`super::mock`] instead.
#[async_trait]
pub trait ResponseTransport: Send + Sync + 'static {
    /// Open the event stream for one response request.
    async fn open(&self, request: &ResponseRequest) -> Result<EventStream, TransportError>;
}
