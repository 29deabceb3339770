//! Request context
//!
//! Decouples session handling from the transport: handlers and the
//! gate read and write the session credential through `RequestContext`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use http::{HeaderMap, header, request::Parts};

use crate::AppState;

const SESSION_COOKIE: &str = "authjs.session-token";
const SECURE_PREFIX: &str = "__Secure-";

/// Transport-independent access to the session credential
pub trait RequestContext {
    /// Session token presented with the request, if any
    fn credential(&self) -> Option<String>;

    /// Attach a session token to the response
    fn set_credential(&mut self, value: String);

    /// Remove the session token from the client
    fn clear_credential(&mut self);

    /// Headers to pass on when calling other services for this request
    fn forwarded(&self) -> ForwardedCredential;
}

/// Credential headers forwarded on outbound calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedCredential {
    pub cookie: Option<String>,
    pub authorization: Option<String>,
}

/// Session cookie attributes
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    max_age: i64,
}

impl SessionCookie {
    pub fn new(secure: bool, max_age: i64) -> Self {
        let name = if secure {
            format!("{SECURE_PREFIX}{SESSION_COOKIE}")
        } else {
            SESSION_COOKIE.to_string()
        };

        Self {
            name,
            secure,
            max_age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie
    }

    pub fn build(&self, value: String) -> Cookie<'static> {
        let mut cookie = self.cookie(value);
        cookie.set_max_age(time::Duration::seconds(self.max_age));
        cookie
    }

    /// Same attributes as the live cookie; browsers drop `__Secure-`
    /// cookies that are set without `Secure`.
    pub fn removal(&self) -> Cookie<'static> {
        self.cookie(String::new())
    }
}

/// Read the session token from `Authorization: Bearer` or the session cookie
pub fn extract_credential(headers: &HeaderMap, cookie: &SessionCookie) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(cookie.name()).map(|c| c.value().to_owned())
        })
}

/// `RequestContext` over an axum request
///
/// Return `into_jar()` from the handler so cookie changes reach the client.
#[derive(Debug, Clone)]
pub struct HttpContext {
    headers: HeaderMap,
    jar: CookieJar,
    cookie: SessionCookie,
}

impl HttpContext {
    pub fn new(headers: HeaderMap, cookie: SessionCookie) -> Self {
        let jar = CookieJar::from_headers(&headers);
        Self {
            headers,
            jar,
            cookie,
        }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }

    fn header(&self, name: header::HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(ToOwned::to_owned)
    }
}

impl RequestContext for HttpContext {
    fn credential(&self) -> Option<String> {
        extract_credential(&self.headers, &self.cookie)
    }

    fn set_credential(&mut self, value: String) {
        self.jar = self.jar.clone().add(self.cookie.build(value));
    }

    fn clear_credential(&mut self) {
        self.jar = self.jar.clone().remove(self.cookie.removal());
    }

    fn forwarded(&self) -> ForwardedCredential {
        ForwardedCredential {
            cookie: self.header(header::COOKIE),
            authorization: self.header(header::AUTHORIZATION),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HttpContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(HttpContext::new(
            parts.headers.clone(),
            state.cookie.as_ref().clone(),
        ))
    }
}
