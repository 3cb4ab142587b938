//! Login flow controller
//!
//! Sequences the two HTTP-facing steps of the OIDC authorization-code flow:
//! issuing the provider redirect and validating the provider's callback.
//! Each callback resolves to exactly one [`FlowOutcome`]; the controller
//! itself never renders a user-facing response.

pub mod outcome;
pub use outcome::FlowOutcome;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::models::{CallbackContext, CallbackParams};
use crate::providers::{Provider, ProviderError, ProviderRegistry};
use crate::settings::VestibuleSettings;
use crate::store::ExpiringStore;
use crate::utils::crypto::{generate_token, StateBinder};

/// Errors that keep a flow operation from running at all.
///
/// These are routing or configuration shaped, not part of the outcome set:
/// a callback for an unregistered provider path is the HTTP layer's 404.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("no provider registered for path {0:?}")]
    UnknownProvider(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A freshly issued login attempt: where to send the browser, and the token
/// the browser must hold on to (typically in a cookie) until the callback.
#[derive(Debug, Clone)]
pub struct IssuedLogin {
    pub client_token: String,
    pub location: String,
}

/// Orchestrates redirect issuance and callback validation for a set of
/// configured providers sharing one token store.
pub struct LoginFlow {
    providers: ProviderRegistry,
    store: ExpiringStore<Vec<u8>>,
    binder: StateBinder,
    exchange_timeout: Duration,
}

impl LoginFlow {
    #[must_use]
    pub fn new(
        providers: ProviderRegistry,
        login_ttl: Duration,
        state_secret: &[u8],
        exchange_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            store: ExpiringStore::new(login_ttl),
            binder: StateBinder::new(state_secret),
            exchange_timeout,
        }
    }

    /// Build the controller and its provider registry from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any enabled provider is misconfigured.
    pub fn from_settings(settings: &VestibuleSettings) -> Result<Self, FlowError> {
        let providers = ProviderRegistry::from_settings(settings)?;
        Ok(Self::new(
            providers,
            Duration::from_secs(settings.session.login_ttl_seconds),
            settings.session.state_secret.as_bytes(),
            Duration::from_secs(settings.session.exchange_timeout_seconds),
        ))
    }

    /// Registered provider path segments
    pub fn provider_paths(&self) -> impl Iterator<Item = &str> {
        self.providers.paths()
    }

    fn provider(&self, path: &str) -> Result<Arc<dyn Provider>, FlowError> {
        self.providers
            .get(path)
            .ok_or_else(|| FlowError::UnknownProvider(path.to_string()))
    }

    /// Issue a login redirect for the provider at `provider_path`.
    ///
    /// Generates an independent client token and state token, stores the
    /// keyed digest binding them under the client token, and returns the
    /// provider's authorization URL. Issuing again for the same browser
    /// supersedes the earlier record.
    ///
    /// # Errors
    ///
    /// Returns an error for an unregistered provider path or when the
    /// provider cannot build its authorization URL.
    pub async fn issue(&self, provider_path: &str) -> Result<IssuedLogin, FlowError> {
        let provider = self.provider(provider_path)?;

        let client_token = generate_token();
        let state_token = generate_token();
        let location = provider.authorization_url(&state_token)?;

        let digest = self.binder.seal(&client_token, &state_token);
        self.store.add(client_token.clone(), digest).await;

        info!("issued login redirect for provider {provider_path}");
        Ok(IssuedLogin {
            client_token,
            location,
        })
    }

    /// Validate a provider callback and resolve it to exactly one outcome.
    ///
    /// The stored digest is redeemed destructively before any comparison, so
    /// a replayed callback lands in `UnknownToken` no matter what else it
    /// carries.
    ///
    /// # Errors
    ///
    /// Returns an error only for an unregistered provider path; every
    /// validation or exchange failure is an outcome variant, never an error.
    pub async fn respond(
        &self,
        provider_path: &str,
        client_token: Option<&str>,
        params: CallbackParams,
    ) -> Result<FlowOutcome, FlowError> {
        let provider = self.provider(provider_path)?;
        let context = CallbackContext {
            provider: provider_path.to_string(),
            params,
        };

        let Some(client_token) = client_token else {
            warn!("callback for {provider_path} arrived without a client token");
            return Ok(FlowOutcome::MissingToken { context });
        };

        let Some(expected) = self.store.get(client_token).await else {
            warn!("callback for {provider_path} carried an unknown or expired client token");
            return Ok(FlowOutcome::UnknownToken { context });
        };

        // An absent echoed state verifies against the empty string, which
        // cannot match a 192-bit random state token.
        let echoed_state = context.params.state.as_deref().unwrap_or("");
        if !self.binder.matches(client_token, echoed_state, &expected) {
            warn!("state verification failed for provider {provider_path}");
            return Ok(FlowOutcome::StateMismatch { context });
        }

        let Some(code) = context.params.code.clone() else {
            debug!("callback for {provider_path} verified but carried no code");
            return Ok(FlowOutcome::MissingCode { context });
        };

        match tokio::time::timeout(self.exchange_timeout, provider.exchange_code(&code)).await {
            Ok(Ok(identity)) => {
                info!(
                    "code exchange succeeded for provider {provider_path}, subject {}",
                    identity.subject
                );
                Ok(FlowOutcome::Success { context, identity })
            }
            Ok(Err(source)) => {
                warn!("code exchange failed for provider {provider_path}: {source}");
                Ok(FlowOutcome::ExchangeFailed { context, source })
            }
            Err(_) => {
                let source = ProviderError::Timeout(self.exchange_timeout.as_secs());
                warn!("code exchange timed out for provider {provider_path}");
                Ok(FlowOutcome::ExchangeFailed { context, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{state_from_location, test_flow, StaticProvider};

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: None,
        }
    }

    #[tokio::test]
    async fn full_round_trip_succeeds() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let state = state_from_location(&issued.location);
        let outcome = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();

        match outcome {
            FlowOutcome::Success { identity, .. } => {
                assert_eq!(identity.provider, "provider");
                assert_eq!(identity.subject, "user-pid");
            }
            other => panic!("expected Success, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn missing_client_token() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let outcome = flow
            .respond("mock", None, params(Some("valid"), Some("whatever")))
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::MissingToken { .. }));
    }

    #[tokio::test]
    async fn unissued_client_token() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let outcome = flow
            .respond("mock", Some("never-issued"), params(Some("valid"), None))
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::UnknownToken { .. }));
    }

    #[tokio::test]
    async fn redeemed_token_cannot_be_replayed() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let state = state_from_location(&issued.location);
        let first = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();
        assert!(matches!(first, FlowOutcome::Success { .. }));

        let replay = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();
        assert!(matches!(replay, FlowOutcome::UnknownToken { .. }));
    }

    #[tokio::test]
    async fn mutated_state_is_rejected() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let mut state = state_from_location(&issued.location).into_bytes();
        state[0] = if state[0] == b'A' { b'B' } else { b'A' };
        let state = String::from_utf8(state).unwrap();

        let outcome = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::StateMismatch { .. }));
    }

    #[tokio::test]
    async fn absent_state_is_a_mismatch() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let outcome = flow
            .respond("mock", Some(&issued.client_token), params(Some("valid"), None))
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::StateMismatch { .. }));
    }

    #[tokio::test]
    async fn missing_code_after_state_verifies() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let state = state_from_location(&issued.location);
        let outcome = flow
            .respond("mock", Some(&issued.client_token), params(None, Some(&state)))
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::MissingCode { .. }));
    }

    #[tokio::test]
    async fn exchange_failure_is_captured() {
        let flow = test_flow(vec![Arc::new(StaticProvider::failing(
            "mock",
            "upstream said no",
        ))]);

        let issued = flow.issue("mock").await.unwrap();
        let state = state_from_location(&issued.location);
        let outcome = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();

        match outcome {
            FlowOutcome::ExchangeFailed { source, .. } => {
                assert!(source.to_string().contains("upstream said no"));
            }
            other => panic!("expected ExchangeFailed, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn slow_exchange_times_out() {
        let provider = StaticProvider::succeeding("mock", "provider", "user-pid")
            .with_delay(Duration::from_millis(200));
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        let flow = LoginFlow::new(
            registry,
            Duration::from_secs(60),
            b"test_state_secret",
            Duration::from_millis(50),
        );

        let issued = flow.issue("mock").await.unwrap();
        let state = state_from_location(&issued.location);
        let outcome = flow
            .respond(
                "mock",
                Some(&issued.client_token),
                params(Some("valid"), Some(&state)),
            )
            .await
            .unwrap();

        match outcome {
            FlowOutcome::ExchangeFailed { source, .. } => {
                assert!(matches!(source, ProviderError::Timeout(_)));
            }
            other => panic!("expected ExchangeFailed, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn concurrent_issues_do_not_interfere() {
        let flow = test_flow(vec![Arc::new(StaticProvider::succeeding(
            "mock", "provider", "user-pid",
        ))]);

        let first = flow.issue("mock").await.unwrap();
        let second = flow.issue("mock").await.unwrap();
        assert_ne!(first.client_token, second.client_token);

        // Redeeming in either order works independently.
        let second_state = state_from_location(&second.location);
        let outcome = flow
            .respond(
                "mock",
                Some(&second.client_token),
                params(Some("valid"), Some(&second_state)),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Success { .. }));

        let first_state = state_from_location(&first.location);
        let outcome = flow
            .respond(
                "mock",
                Some(&first.client_token),
                params(Some("valid"), Some(&first_state)),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, FlowOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn unknown_provider_path_is_an_error() {
        let flow = test_flow(vec![]);
        assert!(matches!(
            flow.issue("nowhere").await,
            Err(FlowError::UnknownProvider(_))
        ));
        assert!(matches!(
            flow.respond("nowhere", None, CallbackParams::default()).await,
            Err(FlowError::UnknownProvider(_))
        ));
    }
}
