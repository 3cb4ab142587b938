#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the vestibule application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod flow;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod settings;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use flow::{FlowError, FlowOutcome, IssuedLogin, LoginFlow};
pub use handlers::{health, login_callback, login_redirect, OutcomeRenderer};
pub use models::{CallbackContext, CallbackParams, Identity};
pub use providers::{OidcProvider, Provider, ProviderError, ProviderRegistry};
pub use settings::VestibuleSettings;
pub use store::ExpiringStore;
