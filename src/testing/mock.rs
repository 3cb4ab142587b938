//! Mock provider for exercising the flow without a network

use std::time::Duration;

use async_trait::async_trait;

use crate::models::Identity;
use crate::providers::{Provider, ProviderError};

/// A provider whose exchange result is fixed at construction time
pub struct StaticProvider {
    path: String,
    result: Result<Identity, String>,
    delay: Option<Duration>,
}

impl StaticProvider {
    /// A provider whose exchange always yields the given identity
    #[must_use]
    pub fn succeeding(path: &str, provider: &str, subject: &str) -> Self {
        Self {
            path: path.to_string(),
            result: Ok(Identity {
                provider: provider.to_string(),
                subject: subject.to_string(),
            }),
            delay: None,
        }
    }

    /// A provider whose exchange always fails with the given message
    #[must_use]
    pub fn failing(path: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            result: Err(message.to_string()),
            delay: None,
        }
    }

    /// Delay every exchange, for timeout tests
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn path(&self) -> &str {
        &self.path
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        Ok(format!(
            "https://idp.example.com/authorize?response_type=code&state={state}"
        ))
    }

    async fn exchange_code(&self, _code: &str) -> Result<Identity, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
            .clone()
            .map_err(ProviderError::Denied)
    }
}
