//! Server-side error taxonomy and its HTTP mapping.

use http::StatusCode;
use thiserror::Error;

use dhc_core::KexError;

/// Anything that can go wrong while issuing a session or verifying a
/// wrapped request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("malformed negotiation or envelope request")]
    MalformedRequest,
    #[error("peer requested group `{requested}`, server is configured for `{configured}`")]
    GroupMismatch {
        requested: String,
        configured: String,
    },
    #[error("peer public value rejected")]
    InvalidPeerKey,
    #[error("no session for the presented serial")]
    UnknownSession,
    #[error("envelope could not be authenticated")]
    Unauthorized,
    #[error("cryptographic operation failed")]
    Crypto,
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MalformedRequest
            | ServerError::GroupMismatch { .. }
            | ServerError::InvalidPeerKey => StatusCode::BAD_REQUEST,
            ServerError::UnknownSession | ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Crypto => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text safe to return to a peer. The two 401 variants share one
    /// message so a caller cannot distinguish a dead session from a failed
    /// decrypt.
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "session rejected",
            StatusCode::BAD_REQUEST => "bad request",
            _ => "internal error",
        }
    }
}

impl From<KexError> for ServerError {
    fn from(err: KexError) -> Self {
        match err {
            KexError::InvalidPeerKey => ServerError::InvalidPeerKey,
            KexError::Crypto => ServerError::Crypto,
        }
    }
}
