//! HTTP client for the AI project service that hosts the legal agents.
//!
//! Covers agent lookup, conversation creation, one-shot responses (used to
//! store reference documents) and the streaming transport consumed by the
//! throttled client.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::base::{Agent, EventStream, ResponseRequest, ResponseTransport};
use super::configs::FoundryConfig;
use super::sse::SseParser;
use crate::errors::TransportError;

const AGENTS_PATH: &str = "/agents";
const CONVERSATIONS_PATH: &str = "/openai/v1/conversations";
const RESPONSES_PATH: &str = "/openai/v1/responses";

#[derive(Clone)]
pub struct FoundryClient {
    client: Client,
    config: FoundryConfig,
}

impl FoundryClient {
    pub fn new(config: FoundryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn response_payload(agent: &str, conversation: &str, input: &str, max_output_tokens: u32, stream: bool) -> Value {
        json!({
            "conversation": conversation,
            "input": input,
            "max_output_tokens": max_output_tokens,
            "stream": stream,
            "agent": {
                "type": "agent_reference",
                "name": agent,
            },
        })
    }

    /// Look up a named agent registered with the project.
    pub async fn find_agent(&self, name: &str) -> Result<Agent> {
        let response = self
            .client
            .get(self.url(AGENTS_PATH))
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let body: Value = match response.status() {
            StatusCode::OK => response.json().await?,
            status => return Err(anyhow!("agent listing failed: {}", status)),
        };

        let agents: Vec<Agent> =
            serde_json::from_value(body.get("data").cloned().unwrap_or(Value::Array(vec![])))?;
        agents
            .into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| anyhow!("agent '{}' not found", name))
    }

    /// Create a fresh server-side conversation and return its identifier.
    pub async fn create_conversation(&self) -> Result<String> {
        let response = self
            .client
            .post(self.url(CONVERSATIONS_PATH))
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "items": [] }))
            .send()
            .await?;

        let body: Value = match response.status() {
            StatusCode::OK | StatusCode::CREATED => response.json().await?,
            status => return Err(anyhow!("conversation creation failed: {}", status)),
        };

        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("conversation response carried no id"))?;
        debug!(conversation = id, "created conversation");
        Ok(id.to_string())
    }

    /// Append one non-streaming response to a conversation. Used to store a
    /// reference document once; the generated text itself is incidental.
    pub async fn send(
        &self,
        agent: &str,
        conversation: &str,
        input: &str,
        max_output_tokens: u32,
    ) -> Result<String> {
        let payload = Self::response_payload(agent, conversation, input, max_output_tokens, false);
        let response = self
            .client
            .post(self.url(RESPONSES_PATH))
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let body: Value = match response.status() {
            StatusCode::OK => response.json().await?,
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                return Err(anyhow!("Server error: {}", status))
            }
            status => return Err(anyhow!("Request failed: {}", status)),
        };

        Ok(body
            .get("output_text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl ResponseTransport for FoundryClient {
    async fn open(&self, request: &ResponseRequest) -> Result<EventStream, TransportError> {
        let payload = Self::response_payload(
            &request.agent,
            &request.conversation,
            &request.input,
            request.max_output_tokens,
            true,
        );

        let response = self
            .client
            .post(self.url(RESPONSES_PATH))
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let mut body = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut parser = SseParser::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                for event in parser.push(&chunk)? {
                    yield event;
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
