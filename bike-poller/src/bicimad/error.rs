//! BiciMAD error types.

use crate::transport::TransportError;

/// Errors surfaced by the BiciMAD session and poller.
///
/// Token invalidation and login conflicts are recovered internally; these
/// variants only reach the caller once the bounded recovery is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum BiciMadError {
    /// Network failure, timeout, or non-success HTTP status
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The provider rejected a freshly acquired token as well
    #[error("access token rejected after re-login (code {code})")]
    TokenInvalid { code: String },

    /// Login did not yield a token
    #[error("login failed with code {code}: {description}")]
    AcquisitionFailure { code: String, description: String },

    /// Response body did not have the expected shape
    #[error("unexpected payload: {message}")]
    Payload { message: String },

    /// Token file could not be written
    #[error("token store error: {message}")]
    Store { message: String },
}

impl BiciMadError {
    pub(crate) fn payload(err: impl std::fmt::Display) -> Self {
        BiciMadError::Payload {
            message: err.to_string(),
        }
    }
}
