//! Identity provider abstraction
//!
//! A [`Provider`] turns an anti-forgery state token into an authorization URL
//! and an authorization code into a verified [`Identity`]. Concrete adapters
//! are constructed from settings and looked up by routing path segment
//! through the [`ProviderRegistry`].

pub mod oidc;
pub use oidc::OidcProvider;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use thiserror::Error;

use crate::models::Identity;
use crate::settings::VestibuleSettings;

/// Errors raised by provider adapters
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure talking to the token endpoint
    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider explicitly refused the exchange
    #[error("provider denied the exchange: {0}")]
    Denied(String),
    /// The token endpoint answered with something we could not interpret
    #[error("malformed token response: {0}")]
    MalformedResponse(String),
    /// The exchange did not complete within the configured bound
    #[error("code exchange timed out after {0} seconds")]
    Timeout(u64),
    /// The provider is not usable as configured
    #[error("provider configuration error: {0}")]
    Configuration(String),
}

/// One identity provider's view of the authorization-code flow
#[async_trait]
pub trait Provider: Send + Sync {
    /// Routing path segment identifying this provider
    fn path(&self) -> &str;

    /// Build the authorization URL the browser is redirected to, carrying
    /// `state` as an opaque request parameter
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint cannot be turned into a
    /// valid URL.
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Exchange the authorization code for a verified identity
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a provider-reported denial, or
    /// a malformed token response.
    async fn exchange_code(&self, code: &str) -> Result<Identity, ProviderError>;
}

/// Providers keyed by routing path segment
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every enabled provider in the settings.
    ///
    /// Misconfigured providers fail fast here rather than at request time.
    ///
    /// # Errors
    ///
    /// Returns an error if any enabled provider is missing required
    /// configuration.
    pub fn from_settings(settings: &VestibuleSettings) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for provider_settings in &settings.providers {
            if !provider_settings.enabled {
                warn!("provider {} is disabled, skipping", provider_settings.name);
                continue;
            }
            let provider = OidcProvider::from_settings(provider_settings, settings)?;
            info!("registered provider {} at path {}", provider_settings.name, provider.path());
            registry.register(Arc::new(provider));
        }
        Ok(registry)
    }

    /// Register a provider under its own path segment, replacing any
    /// previous provider at that path
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.path().to_string(), provider);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(path).cloned()
    }

    /// Registered path segments, for route listings
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
