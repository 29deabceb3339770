//! HTTP-backed gate collaborators

use async_trait::async_trait;
use reqwest::{RequestBuilder, header};
use serde_json::Value;
use std::sync::Arc;

use super::{ContentSource, SessionSource};
use crate::auth::{ForwardedCredential, SessionPayload};
use crate::error::{AppError, Result};

fn with_credential(mut request: RequestBuilder, credential: &ForwardedCredential) -> RequestBuilder {
    if let Some(cookie) = &credential.cookie {
        request = request.header(header::COOKIE, cookie);
    }
    if let Some(authorization) = &credential.authorization {
        request = request.header(header::AUTHORIZATION, authorization);
    }
    request
}

/// Calls the session endpoint over HTTP, even when colocated
#[derive(Debug, Clone)]
pub struct HttpSessionSource {
    client: Arc<reqwest::Client>,
    url: String,
}

impl HttpSessionSource {
    pub fn new(client: Arc<reqwest::Client>, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl SessionSource for HttpSessionSource {
    async fn fetch_session(
        &self,
        credential: &ForwardedCredential,
    ) -> Result<Option<SessionPayload>> {
        let response = with_credential(self.client.get(&self.url), credential)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Downstream(format!(
                "session endpoint returned {status}"
            )));
        }

        let body: Value = response.json().await?;
        if body.get("user").is_none() {
            return Ok(None);
        }

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| AppError::Downstream(format!("malformed session payload: {e}")))
    }
}

/// Fetches protected JSON from the configured content route
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Arc<reqwest::Client>,
    url: String,
}

impl HttpContentSource {
    pub fn new(client: Arc<reqwest::Client>, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch_content(&self, credential: &ForwardedCredential) -> Result<Value> {
        let response = with_credential(self.client.get(&self.url), credential)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Downstream(format!(
                "content endpoint returned {status}"
            )));
        }

        Ok(response.json().await?)
    }
}
