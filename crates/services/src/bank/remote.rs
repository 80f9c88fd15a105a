use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::{QuestionBank, QuestionSource};
use crate::error::BankError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteBankConfig {
    pub url: String,
    pub timeout: Duration,
}

impl RemoteBankConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `EXAM_BANK_URL` and `EXAM_BANK_TIMEOUT_SECS`.
    ///
    /// Returns `None` when no URL is set, which leaves the remote source
    /// disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("EXAM_BANK_URL")?;
        if url.trim().is_empty() {
            return None;
        }
        let timeout_secs = lookup("EXAM_BANK_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self {
            url: url.trim().to_owned(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Question bank fetched as a JSON array over HTTP.
#[derive(Clone)]
pub struct RemoteSource {
    client: Client,
    config: Option<RemoteBankConfig>,
}

impl RemoteSource {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RemoteBankConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<RemoteBankConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl QuestionSource for RemoteSource {
    async fn load(&self) -> Result<QuestionBank, BankError> {
        let config = self.config.as_ref().ok_or(BankError::Disabled)?;
        debug!(url = %config.url, "fetching question bank");

        let response = self
            .client
            .get(&config.url)
            .timeout(config.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BankError::HttpStatus(response.status()));
        }

        let values: Vec<serde_json::Value> = response.json().await?;
        let bank = QuestionBank::from_values(values)?;
        info!(url = %config.url, total = bank.len(), "remote question bank fetched");
        Ok(bank)
    }
}
