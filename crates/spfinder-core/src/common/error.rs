//! Error types for gateway queries.
//!
//! This module defines the central `Error` enum, which captures every failure a
//! chain-state lookup can produce, from local address validation to the remote
//! gateway rejecting a call.
//!
//! ## Error Cases
//! - `AddressFormat`: A provider address failed local validation before any
//!   network call was made.
//! - `InvalidGateway`: The configured gateway host cannot form an endpoint URL.
//! - `Transport`: The HTTP request failed or returned a non-success status.
//! - `Decode`: The gateway replied with a payload that is not a well-formed
//!   JSON-RPC response for the requested type.
//! - `Remote`: The gateway replied with a JSON-RPC error object.
//! - `MissingPeerId`: The miner record carries no peer identity.
//! - `Cancelled`: The surrounding batch was cancelled before the call finished.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for gateway lookups.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The provider address is malformed.
    #[error("invalid provider address `{input}`: {reason}")]
    AddressFormat { input: String, reason: String },

    /// The gateway host does not produce a valid endpoint URL.
    #[error("invalid gateway `{host}`: {reason}")]
    InvalidGateway { host: String, reason: String },

    /// Network or HTTP level failure.
    #[error("transport error: {context}")]
    Transport { context: String },

    /// The response could not be decoded.
    #[error("decode error: {context}")]
    Decode { context: String },

    /// Well-formed error response from the gateway.
    #[error("gateway error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The storage provider has no peer identity on chain.
    #[error("no peer id for storage provider {provider}")]
    MissingPeerId { provider: String },

    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn address(input: &str, reason: impl Into<String>) -> Self {
        Self::AddressFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                context: err.to_string(),
            }
        } else {
            Self::Transport {
                context: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            context: err.to_string(),
        }
    }
}
