//! HTTP-facing handlers
//!
//! Thin actix-web layer over the [`LoginFlow`](crate::flow::LoginFlow)
//! controller: URL dispatch, cookie plumbing, and handing each callback
//! outcome to the configured renderer.

mod callback;
mod login;

pub use callback::login_callback;
pub use login::login_redirect;

use std::sync::Arc;

use actix_web::HttpResponse;
use serde_json::json;

use crate::flow::FlowOutcome;

/// Caller-supplied mapping from a flow outcome to an HTTP response.
///
/// The callback handler invokes it exactly once per respond call; the
/// controller itself never renders anything user-facing.
#[derive(Clone)]
pub struct OutcomeRenderer {
    render: Arc<dyn Fn(FlowOutcome) -> HttpResponse + Send + Sync>,
}

impl OutcomeRenderer {
    pub fn from_fn<F>(render: F) -> Self
    where
        F: Fn(FlowOutcome) -> HttpResponse + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
        }
    }

    #[must_use]
    pub fn render(&self, outcome: FlowOutcome) -> HttpResponse {
        (self.render)(outcome)
    }
}

/// Health check endpoint
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}
