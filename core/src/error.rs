//! Error types for the UCode client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the record does not exist" from "the platform returned an unexpected
//! status." All other non-2xx responses land in `Http` with the raw status
//! code and body for debugging.

/// Errors returned by every `UcodeSdk` operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The argument cannot be turned into a request (empty table slug,
    /// missing guid, and so on).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The platform returned 404.
    #[error("resource not found")]
    NotFound { body: String },

    /// The platform returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Status code of the failed response, if the platform answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
