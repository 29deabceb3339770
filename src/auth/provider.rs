//! Sign-in providers
//!
//! The provider list is fixed at startup from `auth.providers`.
//! Only the credentials provider is implemented; OAuth and email ids
//! are recognised so a misconfiguration fails loudly instead of silently.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use super::session::Identity;
use crate::error::AppError;

/// Shared secret accepted by the credentials provider
pub const EXPECTED_PASSWORD: &str = "password";

/// Provider family, as reported by `GET <base>/providers`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Credentials,
    OAuth,
    Email,
}

/// Submitted sign-in form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub password: Option<String>,
}

/// A way of turning submitted credentials into an identity
pub trait Provider: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn kind(&self) -> ProviderKind;

    /// Returns `None` when the credentials are rejected
    fn authorize(&self, credentials: &Credentials) -> Option<Identity>;
}

/// Single shared-secret provider
///
/// Illustrative only: one fixed secret, no credential store, no lockout.
#[derive(Debug, Clone)]
pub struct CredentialsProvider {
    expected: String,
}

impl Default for CredentialsProvider {
    fn default() -> Self {
        Self {
            expected: EXPECTED_PASSWORD.to_string(),
        }
    }
}

impl Provider for CredentialsProvider {
    fn id(&self) -> &'static str {
        "credentials"
    }

    fn name(&self) -> &'static str {
        "Credentials"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Credentials
    }

    fn authorize(&self, credentials: &Credentials) -> Option<Identity> {
        let secret = credentials.password.as_deref()?;
        if !secrets_match(secret, &self.expected) {
            return None;
        }

        Some(Identity::new("test", "Test User", "test@example.com"))
    }
}

/// Check a secret against the credentials provider
pub fn verify(secret: &str) -> Option<Identity> {
    CredentialsProvider::default().authorize(&Credentials {
        password: Some(secret.to_string()),
    })
}

/// Constant-time string comparison via HMAC tags
fn secrets_match(candidate: &str, expected: &str) -> bool {
    const KEY: &[u8] = b"authgate-credentials";

    let Ok(mut expected_mac) = Hmac::<Sha256>::new_from_slice(KEY) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut candidate_mac) = Hmac::<Sha256>::new_from_slice(KEY) else {
        return false;
    };
    candidate_mac.update(candidate.as_bytes());
    candidate_mac.verify_slice(&expected_tag).is_ok()
}

/// Enabled providers, in configuration order
#[derive(Debug, Clone)]
pub struct Providers {
    list: Vec<Arc<dyn Provider>>,
}

impl Providers {
    /// Build the provider list from configured ids
    ///
    /// # Errors
    /// `Config` for unknown ids and for providers that are not wired up.
    pub fn from_ids(ids: &[String]) -> Result<Self, AppError> {
        let mut list: Vec<Arc<dyn Provider>> = Vec::with_capacity(ids.len());

        for id in ids {
            match id.trim().to_ascii_lowercase().as_str() {
                "credentials" => list.push(Arc::new(CredentialsProvider::default())),
                kind @ ("github" | "keycloak" | "email" | "sendgrid" | "resend") => {
                    return Err(AppError::Config(format!(
                        "auth.providers: provider '{kind}' is not supported by this build"
                    )));
                }
                other => {
                    return Err(AppError::Config(format!(
                        "auth.providers: unknown provider '{other}'"
                    )));
                }
            }
        }

        if list.is_empty() {
            return Err(AppError::Config(
                "auth.providers must enable at least one provider".to_string(),
            ));
        }

        Ok(Self { list })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.list.iter().find(|provider| provider.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.list.iter()
    }
}
