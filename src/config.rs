//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public domain, optionally with port (e.g., "localhost:3000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the deployment
    ///
    /// # Returns
    /// Full URL like "https://auth.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Session and provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session signing secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 2592000 = 30 days)
    pub session_max_age: i64,
    /// Mount point of the auth routes (default: "/auth")
    pub base_path: String,
    /// Enabled sign-in providers, by id
    pub providers: Vec<String>,
}

impl AuthConfig {
    /// Absolute URL of this deployment's session endpoint
    ///
    /// Always built from `server`, never from request headers.
    pub fn session_url(&self, server: &ServerConfig) -> String {
        format!("{}{}/session", server.base_url(), self.base_path)
    }
}

/// Downstream protected content configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Deployment URL hosting the content route.
    ///
    /// Falls back to `server.base_url()` when unset.
    pub base_url: Option<String>,
    /// Path of the protected content route
    pub path: String,
    /// Timeout applied to outbound requests made by the gate
    pub timeout_seconds: u64,
    /// What the gate does when the content fetch fails
    pub on_failure: FailurePolicy,
}

impl ContentConfig {
    /// Absolute URL of the protected content route
    pub fn url(&self, server: &ServerConfig) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| server.base_url());
        format!("{}{}", base.trim_end_matches('/'), self.path)
    }
}

/// Gate behaviour for a failed downstream content fetch
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and serve the session without content
    #[default]
    Degrade,
    /// Fail the request with a bad gateway response
    Propagate,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE__*)
    ///
    /// Values are checked by `validate`, which `AppState::new` runs.
    ///
    /// # Errors
    /// Returns error if a source cannot be read or a value has the wrong type
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost:3000")?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_max_age", 2_592_000)?
            .set_default("auth.base_path", "/auth")?
            .set_default("auth.providers", vec!["credentials"])?
            .set_default("content.path", "/api/examples/protected")?
            .set_default("content.timeout_seconds", 10)?
            .set_default("content.on_failure", "degrade")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.providers")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        let base_path = &self.auth.base_path;
        if !base_path.starts_with('/') || base_path.ends_with('/') {
            return Err(crate::error::AppError::Config(
                "auth.base_path must start with '/', must not end with '/' and must not be the root"
                    .to_string(),
            ));
        }

        if self.auth.providers.is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.providers must enable at least one provider".to_string(),
            ));
        }

        if !self.content.path.starts_with('/') {
            return Err(crate::error::AppError::Config(
                "content.path must start with '/'".to_string(),
            ));
        }

        if self.content.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "content.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                domain = %self.server.domain,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

/// Loopback, unspecified and `*.localhost` hosts count as local development
fn is_local_server_domain(domain: &str) -> bool {
    let Ok(url) = url::Url::parse(&format!("http://{}", domain.trim())) else {
        return false;
    };

    match url.host() {
        Some(url::Host::Domain(name)) => {
            let name = name.trim_end_matches('.');
            name == "localhost" || name.ends_with(".localhost")
        }
        Some(url::Host::Ipv4(ip)) => ip.is_loopback() || ip.is_unspecified(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback() || ip.is_unspecified(),
        None => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                domain: "localhost:3000".to_string(),
                protocol: "http".to_string(),
            },
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 2_592_000,
                base_path: "/auth".to_string(),
                providers: vec!["credentials".to_string()],
            },
            content: ContentConfig {
                base_url: None,
                path: "/api/examples/protected".to_string(),
                timeout_seconds: 10,
                on_failure: FailurePolicy::Degrade,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "auth.example.com".to_string();
        config.server.protocol = "http".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }

    #[test]
    fn validate_rejects_malformed_base_path() {
        let mut config = valid_config();
        for base_path in ["/auth/", "/", "auth"] {
            config.auth.base_path = base_path.to_string();
            assert!(matches!(
                config.validate(),
                Err(crate::error::AppError::Config(message)) if message.contains("auth.base_path")
            ));
        }
    }

    #[test]
    fn validate_rejects_empty_provider_list() {
        let mut config = valid_config();
        config.auth.providers.clear();

        assert!(matches!(
            config.validate(),
            Err(crate::error::AppError::Config(message)) if message.contains("auth.providers")
        ));
    }

    #[test]
    fn content_url_falls_back_to_server_base_url() {
        let mut config = valid_config();
        assert_eq!(
            config.content.url(&config.server),
            "http://localhost:3000/api/examples/protected"
        );

        config.content.base_url = Some("https://content.example.com/".to_string());
        assert_eq!(
            config.content.url(&config.server),
            "https://content.example.com/api/examples/protected"
        );
    }

    #[test]
    fn session_url_uses_configured_deployment() {
        let mut config = valid_config();
        assert_eq!(
            config.auth.session_url(&config.server),
            "http://localhost:3000/auth/session"
        );

        config.auth.base_path = "/api/auth".to_string();
        assert_eq!(
            config.auth.session_url(&config.server),
            "http://localhost:3000/api/auth/session"
        );
    }

    #[test]
    fn local_domains_are_recognised() {
        for domain in ["localhost:3000", "app.localhost", "127.0.0.1:8080", "[::1]:3000", "0.0.0.0"] {
            assert!(is_local_server_domain(domain), "{domain} should be local");
        }
        for domain in ["auth.example.com", "10.0.0.5:3000", "localhost.example.com"] {
            assert!(!is_local_server_domain(domain), "{domain} should not be local");
        }
    }

    #[test]
    fn secure_cookies_follow_protocol_and_domain() {
        let mut config = valid_config();
        config.server.protocol = "https".to_string();
        assert!(config.should_use_secure_cookies());

        config.server.protocol = "http".to_string();
        config.server.domain = "127.0.0.1:8080".to_string();
        assert!(!config.should_use_secure_cookies());
    }
}
