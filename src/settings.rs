//! Configuration surface
//!
//! Settings load with the following priority (highest to lowest):
//! environment variables, `Settings.toml` in `VESTIBULE_SECRETS_DIR`,
//! `Settings.toml` in the current directory, built-in defaults.

use std::fs;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::utils::crypto::generate_nonce;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VestibuleSettings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub cookies: CookieSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub routes: RouteSettings,
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public base URL callbacks are addressed to, without a trailing slash
    pub redirect_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long an issued login token may wait for its callback
    pub login_ttl_seconds: u64,
    /// Server-side key for the state digest; generated at startup when empty
    pub state_secret: String,
    /// Upper bound on one code exchange round-trip
    pub exchange_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

/// Cosmetic path shaping for the issue and callback routes.
///
/// Purely presentational; no behavior hangs off these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    pub login_prefix: String,
    pub login_suffix: String,
    pub callback_prefix: String,
    pub callback_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub name: String,
    /// Routing path segment; defaults to the provider name
    pub path: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub scopes: Vec<String>,

    // Direct values (can be overridden by environment variables)
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // Environment variable names for overrides
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,

    pub enabled: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redirect_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            login_ttl_seconds: 600, // a login attempt has ten minutes
            state_secret: String::new(),
            exchange_timeout_seconds: 30,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            login_prefix: "/login".to_string(),
            login_suffix: String::new(),
            callback_prefix: "/callback".to_string(),
            callback_suffix: String::new(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: None,
            authorization_endpoint: None,
            token_endpoint: None,
            scopes: vec!["openid".to_string(), "email".to_string()],
            client_id: None,
            client_secret: None,
            client_id_env: None,
            client_secret_env: None,
            enabled: true,
        }
    }
}

impl RouteSettings {
    /// Concrete path for one provider's issue route
    #[must_use]
    pub fn login_path(&self, provider: &str) -> String {
        format!("{}/{provider}{}", self.login_prefix, self.login_suffix)
    }

    /// Concrete path for one provider's callback route
    #[must_use]
    pub fn callback_path(&self, provider: &str) -> String {
        format!("{}/{provider}{}", self.callback_prefix, self.callback_suffix)
    }

    /// actix route pattern for the issue routes
    #[must_use]
    pub fn login_route(&self) -> String {
        format!("{}/{{provider}}{}", self.login_prefix, self.login_suffix)
    }

    /// actix route pattern for the callback routes
    #[must_use]
    pub fn callback_route(&self) -> String {
        format!("{}/{{provider}}{}", self.callback_prefix, self.callback_suffix)
    }
}

impl ProviderSettings {
    /// Client id from the direct value or the named environment variable
    #[must_use]
    pub fn get_client_id(&self) -> Option<String> {
        if let Some(env_name) = &self.client_id_env {
            if let Ok(value) = std::env::var(env_name) {
                return Some(value);
            }
        }
        self.client_id.clone()
    }

    /// Client secret from the direct value or the named environment variable
    #[must_use]
    pub fn get_client_secret(&self) -> Option<String> {
        if let Some(env_name) = &self.client_secret_env {
            if let Ok(value) = std::env::var(env_name) {
                return Some(value);
            }
        }
        self.client_secret.clone()
    }

    /// Routing path segment this provider is mounted at
    #[must_use]
    pub fn route_path(&self) -> String {
        self.path.clone().unwrap_or_else(|| self.name.clone())
    }
}

impl VestibuleSettings {
    /// Load settings from configuration files and environment variables,
    /// initializing the logger along the way.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or
    /// parsed. Malformed configuration fails here, at startup, rather than
    /// at request time.
    pub fn load() -> anyhow::Result<Self> {
        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.initialize_logging();
        settings.ensure_state_secret();
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            let toml_content = fs::read_to_string(&default_config_path)
                .with_context(|| format!("failed to read {}", default_config_path.display()))?;
            settings = basic_toml::from_str(&toml_content)
                .with_context(|| format!("failed to parse {}", default_config_path.display()))?;
        }

        if let Ok(secrets_dir) = std::env::var("VESTIBULE_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                let toml_content = fs::read_to_string(&secrets_path)
                    .with_context(|| format!("failed to read {}", secrets_path.display()))?;
                settings = basic_toml::from_str(&toml_content)
                    .with_context(|| format!("failed to parse {}", secrets_path.display()))?;
            }
        }

        Ok(settings)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        if let Ok(host) = std::env::var("VESTIBULE_HOST") {
            settings.application.host = host;
        }
        if let Ok(port) = std::env::var("VESTIBULE_PORT") {
            if let Ok(port) = port.parse() {
                settings.application.port = port;
            }
        }
        if let Ok(url) = std::env::var("VESTIBULE_REDIRECT_BASE_URL") {
            settings.application.redirect_base_url = url;
        }
        Self::apply_numeric_env_override(
            "VESTIBULE_LOGIN_TTL_SECONDS",
            &mut settings.session.login_ttl_seconds,
        );
        Self::apply_numeric_env_override(
            "VESTIBULE_EXCHANGE_TIMEOUT_SECONDS",
            &mut settings.session.exchange_timeout_seconds,
        );
        if let Ok(secret) = std::env::var("VESTIBULE_STATE_SECRET") {
            settings.session.state_secret = secret;
        }
        if let Ok(secure) = std::env::var("VESTIBULE_COOKIE_SECURE") {
            if let Ok(secure) = secure.parse() {
                settings.cookies.secure = secure;
            }
        }
        if let Ok(level) = std::env::var("VESTIBULE_LOG_LEVEL") {
            settings.logging.level = level;
        }
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value) = std::env::var(env_var) {
            if let Ok(value) = value.parse() {
                *target = value;
            }
        }
    }

    fn initialize_logging(&self) {
        // try_init so tests loading settings repeatedly do not panic
        let _ = env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init();
    }

    /// Generate a state secret when none was configured. Sessions then do
    /// not survive a restart, which matches the in-memory token store.
    fn ensure_state_secret(&mut self) {
        if self.session.state_secret.is_empty() {
            self.session.state_secret = generate_nonce(32);
        }
    }

    /// Bind address for the HTTP server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_sensible() {
        let settings = VestibuleSettings::default();

        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.session.login_ttl_seconds, 600);
        assert_eq!(settings.session.exchange_timeout_seconds, 30);
        assert!(settings.cookies.secure);
        assert_eq!(settings.routes.login_path("google"), "/login/google");
        assert_eq!(settings.routes.callback_path("google"), "/callback/google");
        assert!(settings.providers.is_empty());
    }

    #[test]
    fn route_patterns_include_affixes() {
        let routes = RouteSettings {
            login_prefix: "/auth/start".to_string(),
            login_suffix: "/go".to_string(),
            callback_prefix: "/auth/done".to_string(),
            callback_suffix: String::new(),
        };

        assert_eq!(routes.login_route(), "/auth/start/{provider}/go");
        assert_eq!(routes.login_path("x"), "/auth/start/x/go");
        assert_eq!(routes.callback_route(), "/auth/done/{provider}");
    }

    #[test]
    fn provider_settings_parse_from_toml() {
        let toml = r#"
            [application]
            host = "127.0.0.1"
            port = 9999
            redirect_base_url = "https://example.test"

            [[providers]]
            name = "google"
            client_id = "from-toml"
        "#;

        let settings: VestibuleSettings = basic_toml::from_str(toml).unwrap();
        assert_eq!(settings.application.port, 9999);
        assert_eq!(settings.providers.len(), 1);
        assert_eq!(settings.providers[0].get_client_id().as_deref(), Some("from-toml"));
        // Unspecified sections fall back to defaults
        assert_eq!(settings.session.login_ttl_seconds, 600);
        assert!(settings.providers[0].enabled);
    }

    #[test]
    #[serial]
    fn client_id_env_indirection_wins() {
        std::env::set_var("TEST_PROVIDER_CLIENT_ID", "from-env");

        let provider = ProviderSettings {
            name: "google".to_string(),
            client_id: Some("direct".to_string()),
            client_id_env: Some("TEST_PROVIDER_CLIENT_ID".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(provider.get_client_id().as_deref(), Some("from-env"));

        std::env::remove_var("TEST_PROVIDER_CLIENT_ID");
        assert_eq!(provider.get_client_id().as_deref(), Some("direct"));
    }

    #[test]
    #[serial]
    fn session_env_overrides_apply() {
        std::env::set_var("VESTIBULE_LOGIN_TTL_SECONDS", "42");
        std::env::set_var("VESTIBULE_COOKIE_SECURE", "false");

        let mut settings = VestibuleSettings::default();
        VestibuleSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.session.login_ttl_seconds, 42);
        assert!(!settings.cookies.secure);

        std::env::remove_var("VESTIBULE_LOGIN_TTL_SECONDS");
        std::env::remove_var("VESTIBULE_COOKIE_SECURE");
    }

    #[test]
    #[serial]
    fn malformed_numeric_override_is_ignored() {
        std::env::set_var("VESTIBULE_LOGIN_TTL_SECONDS", "not-a-number");

        let mut settings = VestibuleSettings::default();
        VestibuleSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.session.login_ttl_seconds, 600);

        std::env::remove_var("VESTIBULE_LOGIN_TTL_SECONDS");
    }

    #[test]
    fn empty_state_secret_is_generated() {
        let mut settings = VestibuleSettings::default();
        settings.ensure_state_secret();

        assert!(!settings.session.state_secret.is_empty());

        let configured = settings.session.state_secret.clone();
        settings.ensure_state_secret();
        assert_eq!(settings.session.state_secret, configured);
    }
}
