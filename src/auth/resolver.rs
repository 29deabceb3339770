//! Session resolution
//!
//! Turns a raw session token into the payload served by `GET <base>/session`.
//! Every failure collapses to `None`; the reason only reaches the logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{Identity, SessionToken, SigningKey, verify_session_token};
use crate::metrics::SESSION_RESOLUTIONS_TOTAL;

/// Session as seen by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub user: Identity,
    pub expires: DateTime<Utc>,
}

impl From<SessionToken> for SessionPayload {
    fn from(token: SessionToken) -> Self {
        Self {
            user: token.user,
            expires: token.expires_at,
        }
    }
}

/// Resolve a raw token, or `None` if it is absent or unusable
pub fn resolve(raw: Option<&str>, key: &SigningKey) -> Option<SessionPayload> {
    resolve_token(raw, key).map(SessionPayload::from)
}

/// Like [`resolve`], but keeps the full token for reissuing
pub fn resolve_token(raw: Option<&str>, key: &SigningKey) -> Option<SessionToken> {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        SESSION_RESOLUTIONS_TOTAL.with_label_values(&["absent"]).inc();
        return None;
    };

    match verify_session_token(raw, key) {
        Ok(token) => {
            SESSION_RESOLUTIONS_TOTAL.with_label_values(&["valid"]).inc();
            Some(token)
        }
        Err(error) => {
            tracing::debug!(%error, "Rejected session token");
            SESSION_RESOLUTIONS_TOTAL.with_label_values(&["invalid"]).inc();
            None
        }
    }
}
