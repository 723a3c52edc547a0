use std::env;

use anyhow::{anyhow, Result};

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
pub const TRANSLATOR_API_VERSION: &str = "2025-05-01-preview";

/// Helper to read environment variables with an optional default.
fn get_env(key: &str, default: Option<&str>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => default.map(str::to_string).ok_or_else(|| {
            anyhow!("Environment variable '{}' is required but not set.", key)
        }),
        Err(e) => Err(e.into()),
    }
}

/// Connection settings for the AI project service hosting the agents.
#[derive(Debug, Clone)]
pub struct FoundryConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl FoundryConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: get_env("FOUNDRY_ENDPOINT", None)?,
            api_key: get_env("FOUNDRY_API_KEY", None)?,
            api_version: get_env("FOUNDRY_API_VERSION", Some(DEFAULT_API_VERSION))?,
        })
    }
}

/// Connection settings for the machine-translation service.
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub endpoint: String,
    pub subscription_key: String,
    pub region: String,
    pub deployment: String,
}

impl TranslatorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: get_env("TRANS_ENDPOINT", None)?,
            subscription_key: get_env("TRANS_SUB_KEY", None)?,
            region: get_env("TRANS_REGION", None)?,
            deployment: get_env("TRANS_MODEL_DEPLOYMENT", None)?,
        })
    }

    /// Translation is optional; absence of `TRANS_ENDPOINT` means the
    /// assistant runs without cross-language support.
    pub fn from_env_opt() -> Result<Option<Self>> {
        match env::var("TRANS_ENDPOINT") {
            Ok(_) => Self::from_env().map(Some),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_default_applies_when_missing() {
        let value = get_env("COUNSEL_TEST_UNSET_VARIABLE", Some("fallback")).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_get_env_missing_required_is_an_error() {
        assert!(get_env("COUNSEL_TEST_UNSET_VARIABLE", None).is_err());
    }
}
