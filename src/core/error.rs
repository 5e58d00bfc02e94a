// Centralized error handling for the tracker

use crate::bencode::response::build_failure_response;
use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur during announce processing
#[derive(Error, Debug)]
pub enum AnnounceError {
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] ValidationError),
}

impl AnnounceError {
    /// Status and bencoded failure body handed back to the transport
    pub fn to_wire(&self) -> (StatusCode, Vec<u8>) {
        (StatusCode::OK, build_failure_response(&self.to_string()))
    }
}

/// Reasons an announce query fails validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter format: {0}")]
    InvalidFormat(String),

    #[error("parameter out of range: {0}")]
    OutOfRange(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}
