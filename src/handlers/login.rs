// Login redirect handler: issues the provider redirect and sets the cookie

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Result};
use log::{error, warn};

use crate::flow::{FlowError, LoginFlow};
use crate::settings::VestibuleSettings;
use crate::utils::cookies::create_login_cookie;
use crate::utils::responses::{error_json, redirect_with_cookie};

/// Issue a login redirect for the provider named in the path.
///
/// On success the response is a `302 Found` to the provider's authorization
/// URL with the fresh client token set as a cookie.
///
/// # Errors
///
/// Never fails at the actix level; flow errors map to 404 (unknown provider)
/// or 500 (provider could not build its URL).
pub async fn login_redirect(
    path: web::Path<String>,
    flow: web::Data<LoginFlow>,
    settings: web::Data<VestibuleSettings>,
) -> Result<HttpResponse> {
    let provider = path.into_inner();

    match flow.issue(&provider).await {
        Ok(issued) => {
            let cookie = create_login_cookie(
                &issued.client_token,
                settings.cookies.secure,
                settings.session.login_ttl_seconds,
            );
            Ok(redirect_with_cookie(&issued.location, cookie))
        }
        Err(FlowError::UnknownProvider(_)) => {
            warn!("login requested for unknown provider {provider}");
            Ok(error_json(StatusCode::NOT_FOUND, "unknown_provider"))
        }
        Err(FlowError::Provider(e)) => {
            error!("failed to issue login redirect for {provider}: {e}");
            Ok(error_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
            ))
        }
    }
}
