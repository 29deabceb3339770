//! authgate - stateless credentials sign-in with signed cookie sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Auth routes (sign-in, session, providers, sign-out)      │
//! │  - Example protected API and pages                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gate                                    │
//! │  - Session lookup over HTTP                                 │
//! │  - Downstream content fetch with the caller's credential    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth                                    │
//! │  - Credentials provider                                     │
//! │  - HMAC-signed session tokens (no server-side store)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the example API, pages and metrics
//! - `auth`: Providers, session tokens, auth routes, middleware
//! - `gate`: Protected resource gate
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request. Everything in it is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session issuer, owns the signing key
    pub issuer: Arc<auth::SessionIssuer>,

    /// Enabled sign-in providers
    pub providers: Arc<auth::Providers>,

    /// Session cookie attributes
    pub cookie: Arc<auth::SessionCookie>,

    /// HTTP client for the gate's outbound calls
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate configuration
    /// 2. Build the signing key and session issuer
    /// 3. Build the provider list
    /// 4. Build the outbound HTTP client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        let key = Arc::new(auth::SigningKey::new(&config.auth.session_secret));
        let issuer = auth::SessionIssuer::new(key, config.auth.session_max_age);

        let providers = auth::Providers::from_ids(&config.auth.providers)?;
        tracing::info!(
            providers = ?providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            "Providers configured"
        );

        let cookie = auth::SessionCookie::new(
            config.should_use_secure_cookies(),
            config.auth.session_max_age,
        );

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(
                config.content.timeout_seconds,
            ))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            issuer: Arc::new(issuer),
            providers: Arc::new(providers),
            cookie: Arc::new(cookie),
            http_client: Arc::new(http_client),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    let metrics = api::metrics_router().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(&state.config.auth.base_path))
        .merge(api::protected_router(state.clone()))
        .merge(api::pages_router())
        .merge(metrics)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Cross-origin policy for a cookie-authenticated API
///
/// Local plain-http deployments mirror any origin. Otherwise only the
/// deployment's own origin may send credentialed requests.
fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::{AllowOrigin, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = HeaderValue::from_str(&server.base_url())
        .map_err(|error| {
            tracing::error!(
                %error,
                domain = %server.domain,
                "Invalid CORS origin, cross-origin requests disabled"
            );
        })
        .into_iter()
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn health_check() -> &'static str {
    "OK"
}
