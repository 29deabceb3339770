//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::sync::Arc;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Authenticated user record carried inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Custom fields attached at issuance (e.g. `address`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            extra: Map::new(),
        }
    }

    /// Attach a custom field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Signed session contents
///
/// Stored in a signed cookie. Never persisted server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub user: Identity,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Explicit request to change mutable fields on reissue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTrigger {
    pub name: String,
}

/// Process-wide HMAC key, built once at startup
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl SigningKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| AppError::Encryption(e.to_string()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `key` - HMAC signing key
///
/// # Returns
/// Signed token string
pub fn create_session_token(session: &SessionToken, key: &SigningKey) -> Result<String, AppError> {
    // 1. Serialize session to JSON
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    let mut mac = key.mac()?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `MalformedToken` if the token cannot be parsed, `InvalidSignature` if
/// the HMAC does not match `key`, `Expired` once `expires_at` has passed.
pub fn verify_session_token(token: &str, key: &SigningKey) -> Result<SessionToken, AppError> {
    verify_session_token_at(token, key, Utc::now())
}

pub(crate) fn verify_session_token_at(
    token: &str,
    key: &SigningKey,
    now: DateTime<Utc>,
) -> Result<SessionToken, AppError> {
    // 1. Split token into payload and signature
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::MalformedToken)?;
    if signature_b64.contains('.') {
        return Err(AppError::MalformedToken);
    }

    // 2. Verify HMAC signature
    let mut mac = key.mac()?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::MalformedToken)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::InvalidSignature)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::MalformedToken)?;

    let session: SessionToken =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::MalformedToken)?;

    // 4. Check if session is expired
    if session.is_expired_at(now) {
        return Err(AppError::Expired);
    }

    Ok(session)
}

/// Token together with its encoded cookie value
#[derive(Debug, Clone)]
pub struct SignedSession {
    pub token: SessionToken,
    pub encoded: String,
}

/// Issues and reissues session tokens
#[derive(Debug, Clone)]
pub struct SessionIssuer {
    key: Arc<SigningKey>,
    max_age: Duration,
}

impl SessionIssuer {
    pub fn new(key: Arc<SigningKey>, max_age_seconds: i64) -> Self {
        Self {
            key,
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Stamp and sign a fresh session for `identity`
    pub fn issue(&self, identity: Identity) -> Result<SignedSession, AppError> {
        let now = Utc::now();
        self.sign(SessionToken {
            user: identity,
            issued_at: now,
            expires_at: now + self.max_age,
        })
    }

    /// Copy `existing`, apply `update`, and sign with fresh stamps
    pub fn reissue(
        &self,
        existing: &SessionToken,
        update: &UpdateTrigger,
    ) -> Result<SignedSession, AppError> {
        let mut identity = existing.user.clone();
        identity.name = update.name.clone();
        self.issue(identity)
    }

    fn sign(&self, token: SessionToken) -> Result<SignedSession, AppError> {
        let encoded = create_session_token(&token, &self.key)?;
        Ok(SignedSession { token, encoded })
    }
}

/// Token callback run whenever a session is written
///
/// Without a trigger the token passes through unchanged.
pub fn apply_trigger(
    issuer: &SessionIssuer,
    token: SessionToken,
    trigger: Option<&UpdateTrigger>,
) -> Result<SignedSession, AppError> {
    match trigger {
        Some(update) => issuer.reissue(&token, update),
        None => issuer.sign(token),
    }
}
