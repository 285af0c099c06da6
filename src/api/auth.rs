//! Login/logout against the API and the local session store.

use anyhow::Result;

use super::{
    ApiClient,
    models::{LoginRequest, LoginResponse},
};
use crate::error::RemoteError;

impl ApiClient {
    /// Authenticate and persist the session on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, RemoteError> {
        let rb = self
            .http
            .post(self.url("auth/login"))
            .json(&LoginRequest { username, password });
        // Login never carries a stale token.
        let resp = rb.send().await?;
        let resp = super::ensure_success(resp).await?;
        let login = resp
            .json::<LoginResponse>()
            .await
            .map_err(|e| RemoteError::from(e).or_generic("An unexpected error occurred"))?;

        self.session
            .save_login(&login)
            .await
            .map_err(|e| RemoteError::new(format!("Failed to save session: {e}")))?;
        tracing::info!("logged in as {} ({:?})", login.user.username, login.user.role);
        Ok(login)
    }

    /// Drop the local session.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        tracing::info!("logged out");
        Ok(())
    }
}
