//! Test support utilities
//!
//! Compiled for unit tests and, with the `testing` feature, for integration
//! tests. Nothing here belongs in a production build.

pub mod mock;

pub use mock::StaticProvider;

use std::sync::Arc;
use std::time::Duration;

use crate::flow::LoginFlow;
use crate::providers::{Provider, ProviderRegistry};
use crate::settings::{ProviderSettings, VestibuleSettings};

/// Settings suitable for tests: insecure cookies, short TTLs, and a `google`
/// provider with a placeholder client id.
#[must_use]
pub fn test_settings() -> VestibuleSettings {
    let mut settings = VestibuleSettings::default();
    settings.application.redirect_base_url = "http://localhost:8080".to_string();
    settings.cookies.secure = false;
    settings.session.login_ttl_seconds = 60;
    settings.session.exchange_timeout_seconds = 5;
    settings.session.state_secret = "test_state_secret_for_settings_32".to_string();
    settings.providers = vec![ProviderSettings {
        name: "google".to_string(),
        client_id: Some("test-google-client-id".to_string()),
        client_secret: Some("test-google-client-secret".to_string()),
        ..ProviderSettings::default()
    }];
    settings
}

/// A flow over the given providers with test-friendly bounds
#[must_use]
pub fn test_flow(providers: Vec<Arc<dyn Provider>>) -> LoginFlow {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }
    LoginFlow::new(
        registry,
        Duration::from_secs(60),
        b"test_state_secret",
        Duration::from_secs(5),
    )
}

/// Pull the `state` query parameter out of an authorization URL.
///
/// # Panics
///
/// Panics if the URL does not parse or carries no `state` parameter; tests
/// want that loud.
#[must_use]
pub fn state_from_location(location: &str) -> String {
    let url = url::Url::parse(location).expect("authorization URL should parse");
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("authorization URL should carry a state parameter")
}
