//! REST API client and the gateway traits the engines depend on.

/// Login and logout.
pub mod auth;
/// Chat history, send and read receipts.
pub mod chat;
/// Delivery CRUD and photo upload/delete.
pub mod deliveries;
/// Live chat channel over WebSocket.
pub mod live;
/// Wire types.
pub mod models;
/// Product catalog.
pub mod products;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{error::RemoteError, session::SessionStore};

/// Shared HTTP client for every REST call; attaches the session token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    /// API root without trailing slash.
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: Client, base_url: &str, session: Arc<SessionStore>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Absolute URL for an API path such as `deliveries/3`.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the bearer token when a session exists.
    async fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.session.token().await {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Send an authenticated request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<T, RemoteError> {
        let resp = self.authed(rb).await.send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Send an authenticated request whose body is ignored.
    async fn send_empty(&self, rb: RequestBuilder) -> Result<(), RemoteError> {
        let resp = self.authed(rb).await.send().await?;
        ensure_success(resp).await?;
        Ok(())
    }
}

/// Convert non-2xx responses into a structured error.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_else(|_| "".into());
    Err(RemoteError::new(format!("HTTP status {status} error: {body}")))
}
