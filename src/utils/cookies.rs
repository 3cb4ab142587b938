//! Login cookie helpers
//!
//! The browser holds the client token in a one-shot cookie between the
//! redirect and the provider callback. The cookie carries nothing but the
//! opaque random token; the digest it unlocks lives server-side.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;

/// Name of the cookie carrying the client token during a login attempt
pub const LOGIN_COOKIE_NAME: &str = "vestibule_login";

/// Cookie carrying a freshly issued client token.
///
/// SameSite is Lax, not Strict: the provider callback is a cross-site
/// top-level navigation and Strict would withhold the cookie from it.
#[must_use]
pub fn create_login_cookie(token: &str, secure: bool, ttl_seconds: u64) -> Cookie<'static> {
    Cookie::build(LOGIN_COOKIE_NAME, token.to_owned())
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::seconds(
            i64::try_from(ttl_seconds).unwrap_or(600),
        ))
        .finish()
}

/// Expired twin of the login cookie, for clearing it after the callback
#[must_use]
pub fn create_expired_login_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(LOGIN_COOKIE_NAME, String::new())
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::ZERO)
        .finish()
}

/// Read the client token from the inbound request, if the browser sent one
#[must_use]
pub fn login_token_from_request(req: &HttpRequest) -> Option<String> {
    req.cookie(LOGIN_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}
