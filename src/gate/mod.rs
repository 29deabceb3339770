//! Protected resource gate
//!
//! Resolves the caller's session through the session endpoint, then
//! fetches downstream content with the same credential. Each request
//! runs the two calls strictly in order.
//!
//! ```text
//! Unauthenticated ──(valid session)──> Authenticated ──(fetch ok)────> Served
//!        │                                   └──────(fetch failed)──> Degraded
//!        └──> AccessDenied
//! ```

mod http;

pub use http::{HttpContentSource, HttpSessionSource};

use async_trait::async_trait;
use serde_json::Value;

use crate::AppState;
use crate::auth::{ForwardedCredential, RequestContext, SessionPayload};
use crate::config::FailurePolicy;
use crate::error::Result;
use crate::metrics::CONTENT_FETCH_TOTAL;

/// Answers "who is this request from"
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// `Ok(None)` means the session endpoint reported no session
    async fn fetch_session(
        &self,
        credential: &ForwardedCredential,
    ) -> Result<Option<SessionPayload>>;
}

/// Downstream source of protected content
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_content(&self, credential: &ForwardedCredential) -> Result<Value>;
}

/// Result of guarding one request
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    AccessDenied,
    Served {
        session: SessionPayload,
        content: Value,
    },
    /// Session present but the content fetch failed
    Degraded { session: SessionPayload },
}

impl GateOutcome {
    pub fn session(&self) -> Option<&SessionPayload> {
        match self {
            GateOutcome::AccessDenied => None,
            GateOutcome::Served { session, .. } | GateOutcome::Degraded { session } => {
                Some(session)
            }
        }
    }

    pub fn content(&self) -> Option<&Value> {
        match self {
            GateOutcome::Served { content, .. } => Some(content),
            _ => None,
        }
    }
}

pub struct Gate<S, C> {
    sessions: S,
    content: C,
    policy: FailurePolicy,
}

pub type HttpGate = Gate<HttpSessionSource, HttpContentSource>;

impl HttpGate {
    /// Gate over the session endpoint and content route from configuration
    ///
    /// Both URLs come from `server`/`content` settings; inbound `Host`
    /// headers never choose where credentials are sent.
    pub fn from_state(state: &AppState) -> Self {
        let config = &state.config;
        Gate::new(
            HttpSessionSource::new(
                state.http_client.clone(),
                config.auth.session_url(&config.server),
            ),
            HttpContentSource::new(
                state.http_client.clone(),
                config.content.url(&config.server),
            ),
            config.content.on_failure,
        )
    }
}

impl<S: SessionSource, C: ContentSource> Gate<S, C> {
    pub fn new(sessions: S, content: C, policy: FailurePolicy) -> Self {
        Self {
            sessions,
            content,
            policy,
        }
    }

    /// Decide whether the request may see the protected content
    ///
    /// # Errors
    /// Only under `FailurePolicy::Propagate`, when the content fetch fails.
    pub async fn guard<R>(&self, ctx: &R) -> Result<GateOutcome>
    where
        R: RequestContext + Sync,
    {
        let credential = ctx.forwarded();

        let session = match self.sessions.fetch_session(&credential).await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(GateOutcome::AccessDenied),
            Err(error) => {
                tracing::warn!(%error, "Error fetching session");
                return Ok(GateOutcome::AccessDenied);
            }
        };

        match self.content.fetch_content(&credential).await {
            Ok(content) => {
                CONTENT_FETCH_TOTAL.with_label_values(&["ok"]).inc();
                Ok(GateOutcome::Served { session, content })
            }
            Err(error) => {
                CONTENT_FETCH_TOTAL.with_label_values(&["failed"]).inc();
                tracing::warn!(
                    %error,
                    user_id = %session.user.id,
                    policy = ?self.policy,
                    "Error fetching protected content"
                );

                match self.policy {
                    FailurePolicy::Degrade => Ok(GateOutcome::Degraded { session }),
                    FailurePolicy::Propagate => Err(error),
                }
            }
        }
    }
}
