//! Credentials authentication
//!
//! Handles:
//! - Provider configuration and credential checks
//! - Stateless signed session tokens
//! - Session resolution and the auth routes
//! - Authentication middleware

pub mod context;
mod middleware;
pub mod provider;
pub mod resolver;
mod routes;
pub mod session;

pub use context::{ForwardedCredential, HttpContext, RequestContext, SessionCookie};
pub use middleware::{CurrentUser, MaybeUser, require_auth};
pub use provider::{Provider, Providers, verify};
pub use resolver::{SessionPayload, resolve};
pub use routes::auth_router;
pub use session::{
    Identity, SessionIssuer, SessionToken, SigningKey, UpdateTrigger, create_session_token,
    verify_session_token,
};
