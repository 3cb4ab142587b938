//! Response helpers and the default outcome renderer

use actix_web::cookie::Cookie;
use actix_web::HttpResponse;
use serde_json::json;

use crate::flow::FlowOutcome;
use crate::handlers::OutcomeRenderer;

/// 302 redirect carrying a cookie
#[must_use]
pub fn redirect_with_cookie(location: &str, cookie: Cookie<'_>) -> HttpResponse {
    HttpResponse::Found()
        .cookie(cookie)
        .append_header(("Location", location.to_owned()))
        .finish()
}

/// JSON error body with the given status
#[must_use]
pub fn error_json(status: actix_web::http::StatusCode, error: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "error": error }))
}

/// A renderer that answers with plain JSON per outcome, so the binary is
/// usable standalone. Deployments replace this with their own renderer via
/// `app_data`.
///
/// Status mapping: success 200; requests missing a token or code 400;
/// unknown tokens and state mismatches 401 (forgery-shaped); exchange
/// failures 502 (upstream fault).
#[must_use]
pub fn default_outcome_renderer() -> OutcomeRenderer {
    use actix_web::http::StatusCode;

    OutcomeRenderer::from_fn(|outcome| match outcome {
        FlowOutcome::Success { identity, .. } => HttpResponse::Ok().json(json!({
            "provider": identity.provider,
            "subject": identity.subject,
        })),
        FlowOutcome::MissingToken { .. } | FlowOutcome::MissingCode { .. } => {
            error_json(StatusCode::BAD_REQUEST, outcome.label())
        }
        FlowOutcome::UnknownToken { .. } | FlowOutcome::StateMismatch { .. } => {
            error_json(StatusCode::UNAUTHORIZED, outcome.label())
        }
        FlowOutcome::ExchangeFailed { .. } => error_json(StatusCode::BAD_GATEWAY, outcome.label()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallbackContext, CallbackParams, Identity};

    fn context() -> CallbackContext {
        CallbackContext {
            provider: "mock".to_string(),
            params: CallbackParams::default(),
        }
    }

    #[test]
    fn redirect_sets_location_and_cookie() {
        let response = redirect_with_cookie("/elsewhere", Cookie::new("name", "value"));

        assert_eq!(response.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            response.headers().get("Location").unwrap().to_str().unwrap(),
            "/elsewhere"
        );
        assert!(response.headers().contains_key("Set-Cookie"));
    }

    #[test]
    fn default_renderer_maps_outcomes_to_statuses() {
        let renderer = default_outcome_renderer();

        let success = renderer.render(FlowOutcome::Success {
            context: context(),
            identity: Identity {
                provider: "provider".to_string(),
                subject: "user-pid".to_string(),
            },
        });
        assert_eq!(success.status(), actix_web::http::StatusCode::OK);

        let missing = renderer.render(FlowOutcome::MissingToken { context: context() });
        assert_eq!(missing.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let unknown = renderer.render(FlowOutcome::UnknownToken { context: context() });
        assert_eq!(unknown.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let mismatch = renderer.render(FlowOutcome::StateMismatch { context: context() });
        assert_eq!(mismatch.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let failed = renderer.render(FlowOutcome::ExchangeFailed {
            context: context(),
            source: crate::providers::ProviderError::Timeout(30),
        });
        assert_eq!(failed.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }
}
