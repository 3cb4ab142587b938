// Callback handler: validates the provider callback and renders the outcome

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{debug, error, warn};

use super::OutcomeRenderer;
use crate::flow::{FlowError, LoginFlow};
use crate::models::CallbackParams;
use crate::settings::VestibuleSettings;
use crate::utils::cookies::{create_expired_login_cookie, login_token_from_request};
use crate::utils::responses::error_json;

/// Handle the provider's callback request.
///
/// Reads the client token from the login cookie, lets the flow controller
/// resolve the callback to exactly one outcome, hands that outcome to the
/// configured renderer exactly once, and clears the login cookie on every
/// response. Accepts parameters from the query string or a form post, since
/// some providers deliver the callback via `response_mode=form_post`.
///
/// # Errors
///
/// Never fails at the actix level; an unknown provider path maps to 404.
pub async fn login_callback(
    path: web::Path<String>,
    query: web::Query<CallbackParams>,
    form: Option<web::Form<CallbackParams>>,
    req: HttpRequest,
    flow: web::Data<LoginFlow>,
    renderer: web::Data<OutcomeRenderer>,
    settings: web::Data<VestibuleSettings>,
) -> Result<HttpResponse> {
    let provider = path.into_inner();
    let params = form.map_or_else(|| query.into_inner(), web::Form::into_inner);
    let client_token = login_token_from_request(&req);

    match flow
        .respond(&provider, client_token.as_deref(), params)
        .await
    {
        Ok(outcome) => {
            debug!(
                "callback for provider {provider} resolved to {}",
                outcome.label()
            );
            let mut response = renderer.render(outcome);
            // The one-shot login cookie is spent whatever the outcome was.
            let clear = create_expired_login_cookie(settings.cookies.secure);
            if let Err(e) = response.add_cookie(&clear) {
                error!("failed to clear login cookie: {e}");
            }
            Ok(response)
        }
        Err(FlowError::UnknownProvider(_)) => {
            warn!("callback addressed unknown provider {provider}");
            Ok(error_json(StatusCode::NOT_FOUND, "unknown_provider"))
        }
        Err(FlowError::Provider(e)) => {
            error!("callback handling failed for {provider}: {e}");
            Ok(error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
            ))
        }
    }
}
