//! Example pages
//!
//! Minimal HTML shells around the session and the gate.

use axum::{
    Router,
    extract::State,
    response::Html,
    routing::get,
};
use serde_json::Value;

use crate::AppState;
use crate::auth::{HttpContext, MaybeUser};
use crate::error::AppError;
use crate::gate::{GateOutcome, HttpGate};

/// Create pages router
///
/// Routes:
/// - GET / - Home, shows the signed-in user
/// - GET /protected-ssr - Gate-protected page
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/protected-ssr", get(protected_ssr))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>",
        title = html_escape::encode_text(title),
    ))
}

/// GET /
async fn home(State(state): State<AppState>, MaybeUser(session): MaybeUser) -> Html<String> {
    let base = &state.config.auth.base_path;
    let body = match session {
        Some(session) => format!(
            "<h1>Home</h1>\n<p>Signed in as <strong>{}</strong> ({})</p>\n\
             <form method=\"post\" action=\"{}/signout\"><button type=\"submit\">Sign out</button></form>",
            html_escape::encode_text(&session.user.name),
            html_escape::encode_text(&session.user.email),
            html_escape::encode_double_quoted_attribute(base),
        ),
        None => format!(
            "<h1>Home</h1>\n<p>You are not signed in. <a href=\"{}/signin\">Sign in</a></p>",
            html_escape::encode_double_quoted_attribute(base),
        ),
    };

    page("Home", &body)
}

/// GET /protected-ssr
///
/// Resolves the session over HTTP, then fetches the protected content
/// with the caller's credential. A missing session renders access denied.
async fn protected_ssr(
    State(state): State<AppState>,
    ctx: HttpContext,
) -> Result<Html<String>, AppError> {
    let outcome = HttpGate::from_state(&state).guard(&ctx).await?;

    let body = match &outcome {
        GateOutcome::AccessDenied => {
            return Ok(page(
                "Access Denied",
                &format!(
                    "<h1>Access Denied</h1>\n<p><a href=\"{}/signin?callbackUrl={}\">You must be signed in to view this page</a></p>",
                    html_escape::encode_double_quoted_attribute(&state.config.auth.base_path),
                    urlencoding::encode("/protected-ssr"),
                ),
            ));
        }
        GateOutcome::Served { content, .. } => render_content(content),
        GateOutcome::Degraded { .. } => String::new(),
    };

    Ok(page(
        "Protected Page",
        &format!("<h1>Protected Page</h1>\n<p><strong>{body}</strong></p>"),
    ))
}

fn render_content(content: &Value) -> String {
    let text = match content.get("content") {
        Some(Value::String(text)) => text.clone(),
        _ => content.to_string(),
    };
    html_escape::encode_text(&text).into_owned()
}
