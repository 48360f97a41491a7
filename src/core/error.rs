//! Error handling - one hierarchy for the whole gateway

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Gateway error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Venue payload could not be understood (snapshots, inbound frames)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Order is missing required fields or carries impossible values
    #[error("Validation error: {0}")]
    Validation(String),

    /// Order asks for something the venue does not offer
    #[error("Unsupported by {venue}: {what}")]
    Unsupported { venue: String, what: String },

    /// No registry entry for the requested symbol
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    /// Signing failed; the payload must not be transmitted
    #[error("Signing error: {0}")]
    Signing(String),

    /// A fill arrived without a venue fill identifier
    #[error("Fill key missing")]
    MissingFillKey,

    /// Terminal connection state
    #[error("Stream closed: code={code} reason={reason}")]
    StreamClosed { code: u16, reason: String },

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Canonical (msgpack) encoding errors
    #[error("Encoding error: {0}")]
    Encoding(#[from] rmp_serde::encode::Error),

    /// Transport collaborator refused the prepared payload
    #[error("Sink error: {0}")]
    Sink(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors raised before any cryptographic work started.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Unsupported { .. } | Error::InstrumentNotFound(_)
        )
    }
}
