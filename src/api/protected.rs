//! Example protected API
//!
//! Serves the downstream content the gate fetches. All routes require
//! a session, checked by `require_auth`.

use axum::{Router, middleware, response::Json, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};

/// Create protected example router
///
/// Routes:
/// - GET /api/examples/protected
pub fn protected_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/examples/protected", get(protected_content))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Protected content response
#[derive(Debug, Serialize)]
pub struct ProtectedContent {
    pub content: String,
}

/// GET /api/examples/protected
async fn protected_content(CurrentUser(session): CurrentUser) -> Json<ProtectedContent> {
    tracing::debug!(user_id = %session.user.id, "Serving protected content");

    Json(ProtectedContent {
        content: "This is protected content. You can access this content because you are signed in."
            .to_string(),
    })
}
