//! Error taxonomy shared by the gateways and the engines.

use thiserror::Error;

/// Any network, HTTP, decoding or transport failure reported by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Human-readable message shown to the user.
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Use `fallback` when the underlying failure carried no message.
    pub fn or_generic(self, fallback: &str) -> Self {
        if self.message.trim().is_empty() {
            Self::new(fallback)
        } else {
            self
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RemoteError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Failure of a wizard stage operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// Local precondition failed; nothing was sent.
    #[error("{0}")]
    Validation(&'static str),
    /// A stage-blocking network call failed.
    #[error("{0}")]
    Remote(String),
    /// The operation does not belong to the current stage.
    #[error("operation not allowed in the current stage")]
    WrongStage,
    /// A later stage ran without a delivery id.
    #[error("Delivery ID not found")]
    MissingDelivery,
}

impl From<RemoteError> for WizardError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e.message)
    }
}
