//! Flow outcome sum type

use crate::models::{CallbackContext, Identity};
use crate::providers::ProviderError;

/// The result of one callback invocation.
///
/// Exactly one variant is produced per respond call. The set is closed on
/// purpose: the caller's outcome renderer must match all of them.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Code exchange succeeded and the provider vouched for an identity
    Success {
        context: CallbackContext,
        identity: Identity,
    },
    /// The callback arrived without a client token (no cookie)
    MissingToken { context: CallbackContext },
    /// The client token was never issued, already redeemed, or expired
    UnknownToken { context: CallbackContext },
    /// The echoed state did not verify against the stored digest
    StateMismatch { context: CallbackContext },
    /// State verified but the callback carried no authorization code
    MissingCode { context: CallbackContext },
    /// The provider exchange failed or timed out
    ExchangeFailed {
        context: CallbackContext,
        source: ProviderError,
    },
}

impl FlowOutcome {
    /// The request context the outcome was produced for
    #[must_use]
    pub fn context(&self) -> &CallbackContext {
        match self {
            Self::Success { context, .. }
            | Self::MissingToken { context }
            | Self::UnknownToken { context }
            | Self::StateMismatch { context }
            | Self::MissingCode { context }
            | Self::ExchangeFailed { context, .. } => context,
        }
    }

    /// Stable short name, used for logging and the default renderer
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::MissingToken { .. } => "missing_token",
            Self::UnknownToken { .. } => "unknown_token",
            Self::StateMismatch { .. } => "state_mismatch",
            Self::MissingCode { .. } => "missing_code",
            Self::ExchangeFailed { .. } => "exchange_failed",
        }
    }
}
