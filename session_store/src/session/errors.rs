use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Payload bytes did not decode to a session mapping.
    #[error("Malformed session payload: {0}")]
    Decode(String),

    /// Signature or AEAD verification failed.
    #[error("Session verification failed")]
    Tamper,

    /// Server-side record absent or expired.
    #[error("Session not found")]
    NotFound,

    /// Deployment misconfiguration. Fatal at startup or first save.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl SessionError {
    /// Whether the failure is absorbed at the store boundary: the caller sees
    /// a fresh empty session instead of an error. Tampered or malformed
    /// cookies must never be able to fail a request.
    pub(crate) fn is_absorbed(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Tamper | Self::NotFound)
    }
}
