//! Tri-state envelope for network-backed values shown in the UI.

use crate::error::RemoteError;

/// In-flight, loaded, or failed value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Resource<T> {
    /// Request dispatched, no answer yet.
    #[default]
    Loading,
    /// Request finished with data.
    Success(T),
    /// Request failed; message is user-facing.
    Error(String),
}

impl<T> Resource<T> {
    /// Terminal state for a finished request.
    pub fn from_result(r: Result<T, RemoteError>) -> Self {
        match r {
            Ok(v) => Resource::Success(v),
            Err(e) => Resource::Error(e.message),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    /// Loaded data, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Error message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Resource::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> Resource<Vec<T>> {
    /// Loaded items, empty while loading or after a failure.
    pub fn items(&self) -> &[T] {
        match self {
            Resource::Success(v) => v,
            _ => &[],
        }
    }
}
