//! Auth routes
//!
//! Mounted under `auth.base_path`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::context::{HttpContext, RequestContext};
use super::provider::Credentials;
use super::resolver::{SessionPayload, resolve, resolve_token};
use super::session::{UpdateTrigger, apply_trigger};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::SIGNINS_TOTAL;

const CREDENTIALS_SIGNIN_ERROR: &str = "CredentialsSignin";

/// Create authentication router
///
/// Routes (relative to `base_path`):
/// - GET /signin - Sign-in page
/// - POST /callback/:provider - Sign in with a provider
/// - GET /session - Current session or `{}`
/// - POST /session - Update the current session
/// - GET /providers - Enabled providers
/// - POST /signout - Sign out
pub fn auth_router(base_path: &str) -> Router<AppState> {
    let routes = Router::new()
        .route("/signin", get(signin_page))
        .route("/callback/:provider", post(provider_callback))
        .route("/session", get(get_session).post(update_session))
        .route("/providers", get(list_providers))
        .route("/signout", post(signout));

    Router::new().nest(base_path, routes)
}

// =============================================================================
// Sign-in Page
// =============================================================================

#[derive(Debug, Deserialize)]
struct SigninQuery {
    error: Option<String>,
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// GET <base>/signin
///
/// Renders a password form that posts to the credentials callback.
async fn signin_page(State(state): State<AppState>, Query(query): Query<SigninQuery>) -> Html<String> {
    let base = &state.config.auth.base_path;
    let error = match query.error.as_deref() {
        Some(CREDENTIALS_SIGNIN_ERROR) => {
            "<p class=\"error\">Sign in failed. Check the details you provided are correct.</p>"
                .to_string()
        }
        Some(other) => format!(
            "<p class=\"error\">Unable to sign in ({}).</p>",
            html_escape::encode_text(other)
        ),
        None => String::new(),
    };
    let callback_url = safe_callback_url(query.callback_url);

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
    <h1>Sign in</h1>
    {error}
    <form method="post" action="{action}">
        <input type="hidden" name="callbackUrl" value="{callback}" />
        <label>Password <input type="password" name="password" /></label>
        <button type="submit">Sign in with Credentials</button>
    </form>
</body>
</html>"#,
        action = html_escape::encode_double_quoted_attribute(&format!("{base}/callback/credentials")),
        callback = html_escape::encode_double_quoted_attribute(&callback_url),
    ))
}

// =============================================================================
// Provider Callback
// =============================================================================

/// Sign-in form fields
#[derive(Debug, Deserialize)]
struct CallbackForm {
    password: Option<String>,
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// POST <base>/callback/:provider
///
/// # Steps
/// 1. Look up the enabled provider
/// 2. Authorize the submitted credentials
/// 3. Issue a session and set the cookie
/// 4. Redirect to the callback URL, or back to sign-in on rejection
async fn provider_callback(
    State(state): State<AppState>,
    Path(provider_id): Path<String>,
    mut ctx: HttpContext,
    axum::Form(form): axum::Form<CallbackForm>,
) -> Result<(CookieJar, Redirect), AppError> {
    let provider = state
        .providers
        .get(&provider_id)
        .ok_or_else(|| AppError::Validation(format!("unknown provider '{provider_id}'")))?;

    let credentials = Credentials {
        password: form.password,
    };

    let Some(identity) = provider.authorize(&credentials) else {
        SIGNINS_TOTAL
            .with_label_values(&[provider.id(), "rejected"])
            .inc();
        tracing::info!(provider = provider.id(), "Sign-in rejected");

        let location = format!(
            "{}/signin?error={}&callbackUrl={}",
            state.config.auth.base_path,
            CREDENTIALS_SIGNIN_ERROR,
            urlencoding::encode(&safe_callback_url(form.callback_url)),
        );
        return Ok((ctx.into_jar(), Redirect::to(&location)));
    };

    let signed = state.issuer.issue(identity)?;
    ctx.set_credential(signed.encoded);

    SIGNINS_TOTAL
        .with_label_values(&[provider.id(), "success"])
        .inc();
    tracing::info!(
        provider = provider.id(),
        user_id = %signed.token.user.id,
        expires_at = %signed.token.expires_at,
        "Session issued"
    );

    let location = safe_callback_url(form.callback_url);
    Ok((ctx.into_jar(), Redirect::to(&location)))
}

/// Only same-origin relative paths are followed
fn safe_callback_url(url: Option<String>) -> String {
    match url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
        _ => "/".to_string(),
    }
}

// =============================================================================
// Session
// =============================================================================

/// GET <base>/session
///
/// Returns the session payload, or `{}` when there is no usable session.
async fn get_session(State(state): State<AppState>, ctx: HttpContext) -> Response {
    match resolve(ctx.credential().as_deref(), state.issuer.key()) {
        Some(payload) => Json(payload).into_response(),
        None => Json(json!({})).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct SessionUpdateRequest {
    #[serde(default)]
    user: Option<SessionUpdateUser>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionUpdateUser {
    name: Option<String>,
}

/// Empty bodies carry no update
fn parse_update(body: &[u8]) -> Result<SessionUpdateRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SessionUpdateRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("invalid session update: {e}")))
}

/// POST <base>/session
///
/// Reissues the current session. A `user.name` in the body is an update
/// trigger; without one (or without a body) the token is re-sent unchanged.
async fn update_session(
    State(state): State<AppState>,
    mut ctx: HttpContext,
    body: Bytes,
) -> Result<(CookieJar, Json<SessionPayload>), AppError> {
    let token = resolve_token(ctx.credential().as_deref(), state.issuer.key())
        .ok_or(AppError::Unauthorized)?;
    let body = parse_update(&body)?;

    let trigger = match body.user.and_then(|user| user.name) {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::Validation("user.name must not be empty".to_string()));
        }
        Some(name) => Some(UpdateTrigger { name }),
        None => None,
    };

    let signed = apply_trigger(&state.issuer, token, trigger.as_ref())?;
    if trigger.is_some() {
        tracing::info!(user_id = %signed.token.user.id, "Session updated");
    }

    ctx.set_credential(signed.encoded);
    Ok((ctx.into_jar(), Json(signed.token.into())))
}

// =============================================================================
// Providers
// =============================================================================

/// GET <base>/providers
async fn list_providers(State(state): State<AppState>) -> Json<Map<String, Value>> {
    let base_url = format!(
        "{}{}",
        state.config.server.base_url(),
        state.config.auth.base_path
    );

    let providers = state
        .providers
        .iter()
        .map(|provider| {
            (
                provider.id().to_string(),
                json!({
                    "id": provider.id(),
                    "name": provider.name(),
                    "type": provider.kind(),
                    "signinUrl": format!("{base_url}/signin"),
                    "callbackUrl": format!("{base_url}/callback/{}", provider.id()),
                }),
            )
        })
        .collect();

    Json(providers)
}

// =============================================================================
// Sign-out
// =============================================================================

/// POST <base>/signout
///
/// Clears the session cookie and redirects home.
async fn signout(mut ctx: HttpContext) -> (CookieJar, Redirect) {
    ctx.clear_credential();
    (ctx.into_jar(), Redirect::to("/"))
}
