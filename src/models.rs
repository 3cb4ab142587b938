//! Shared data types for the login flow

use serde::{Deserialize, Serialize};

/// Verified identity returned by an identity provider after code exchange.
///
/// Produced once per successful exchange and owned by the caller afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Name of the provider that vouched for this identity
    pub provider: String,
    /// Provider-scoped subject identifier
    pub subject: String,
}

/// Parameters the identity provider echoes back on the callback request,
/// from either the query string or a form post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Original request context carried by every flow outcome, so the caller's
/// renderer can log or branch on what actually arrived.
#[derive(Debug, Clone)]
pub struct CallbackContext {
    /// Routing path segment of the provider the callback addressed
    pub provider: String,
    /// Raw callback parameters as received
    pub params: CallbackParams,
}
