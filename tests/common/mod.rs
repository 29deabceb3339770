//! Common test utilities for E2E tests

#![allow(dead_code)]

use authgate::{AppState, config};
use tokio::net::TcpListener;

pub const SESSION_COOKIE: &str = "authjs.session-token";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, adjusting the configuration before startup
    pub async fn with_config(customize: impl FnOnce(&mut config::AppConfig)) -> Self {
        authgate::metrics::init_metrics();

        // Bind first so the gate can call back into this server
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                domain: addr.to_string(),
                protocol: "http".to_string(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 3600,
                base_path: "/auth".to_string(),
                providers: vec!["credentials".to_string()],
            },
            content: config::ContentConfig {
                base_url: None,
                path: "/api/examples/protected".to_string(),
                timeout_seconds: 5,
                on_failure: config::FailurePolicy::Degrade,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        customize(&mut config);

        let state = AppState::new(config).unwrap();
        let app = authgate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            addr: format!("http://{}", addr),
            state,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Submit the credentials form
    pub async fn sign_in(&self, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/callback/credentials"))
            .form(&[("password", password), ("callbackUrl", "/protected-ssr")])
            .send()
            .await
            .unwrap()
    }

    /// Sign in with the expected password and return the `name=value` cookie pair
    pub async fn session_cookie(&self) -> String {
        let response = self.sign_in("password").await;
        session_cookie_from(&response).expect("sign-in sets the session cookie")
    }

    /// Mint a session token directly with the server's issuer
    pub fn create_test_token(&self) -> String {
        self.state
            .issuer
            .issue(authgate::auth::Identity::new(
                "test",
                "Test User",
                "test@example.com",
            ))
            .unwrap()
            .encoded
    }
}

/// Extract the session cookie pair from `Set-Cookie` headers
pub fn session_cookie_from(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}
