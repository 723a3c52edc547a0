//! Client for the managed machine-translation service.

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::configs::{TranslatorConfig, TRANSLATOR_API_VERSION};

#[derive(Clone)]
pub struct Translator {
    client: Client,
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    /// Translate `text` between two-letter language codes, preserving the
    /// service's deployment-pinned model.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let body = json!([{
            "Text": text,
            "language": from,
            "targets": [{
                "language": to,
                "deploymentName": self.config.deployment,
            }],
        }]);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("api-version", TRANSLATOR_API_VERSION)])
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header("Ocp-Apim-Subscription-Region", &self.config.region)
            .json(&body)
            .send()
            .await?;

        let data: Value = match response.status() {
            StatusCode::OK => response.json().await?,
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                return Err(anyhow!("Server error: {}", status))
            }
            status => return Err(anyhow!("Translation request failed: {}", status)),
        };

        let translated = data
            .get(0)
            .and_then(|item| item.get("translations"))
            .and_then(|t| t.get(0))
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("translation response carried no text"))?;

        debug!(from, to, chars = text.len(), "translated");
        Ok(translated.to_string())
    }
}
