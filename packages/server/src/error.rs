//! Backend errors and their HTTP mapping.
//!
//! Handlers never let an error escape: every failure becomes a
//! [`PreparedResponse`] with the matching status code.

use eth2api::{Codec, PreparedResponse};

/// Errors that backend collaborators can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The requested item does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The submitted item was rejected.
    #[error("{0}")]
    Invalid(String),

    /// An unexpected failure in the backend.
    #[error("internal backend error: {0}")]
    Internal(String),
}

impl BackendError {
    pub fn into_response<C: Codec>(self) -> PreparedResponse<C> {
        match self {
            BackendError::NotFound(what) => PreparedResponse::not_found(format!("{what} not found")),
            BackendError::Invalid(msg) => PreparedResponse::bad_input(msg),
            BackendError::Internal(msg) => {
                tracing::error!("backend failure: {msg}");
                PreparedResponse::internal_error(msg)
            }
        }
    }
}
