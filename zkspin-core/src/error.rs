//! Error types for the rotation pipeline.

use std::time::Duration;

use thiserror::Error;

/// Error type for proof-driven rotations.
#[derive(Error, Debug)]
pub enum SpinError {
    /// The proving service rejected the request or could not be reached.
    #[error("proof submission failed: {0}")]
    Submission(String),

    /// The proof did not complete before the polling deadline.
    #[error("proof {id} not ready after {waited:?}")]
    Timeout { id: String, waited: Duration },

    /// The remote computation reached a terminal failure status.
    #[error("proof {id} failed with status {status}")]
    ProofFailed { id: String, status: String },

    /// Polling kept failing at the transport level.
    #[error("polling proof {id} failed after {attempts} attempts: {reason}")]
    PollFailed {
        id: String,
        attempts: u32,
        reason: String,
    },

    /// A field element numeral could not be parsed or is out of range.
    #[error("malformed field numeral: {0}")]
    MalformedNumeral(String),

    /// The service answered with a payload we cannot interpret.
    #[error("malformed proof response: {0}")]
    MalformedResponse(String),

    /// The phase between two vectors is undefined.
    #[error("degenerate vector: {0}")]
    DegenerateVector(String),

    /// A rotation is already polling or animating.
    #[error("rotation already in progress")]
    Busy,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Handing the proof to the verifier failed.
    #[error("verifier submission failed: {0}")]
    Verifier(String),
}

impl SpinError {
    /// Whether calling `rotate` again with the same orientation may succeed.
    ///
    /// Decoding errors point at a protocol mismatch and are not worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SpinError::Busy
                | SpinError::Submission(_)
                | SpinError::Timeout { .. }
                | SpinError::PollFailed { .. }
                | SpinError::Verifier(_)
        )
    }
}

impl From<serde_json::Error> for SpinError {
    fn from(err: serde_json::Error) -> Self {
        SpinError::MalformedResponse(err.to_string())
    }
}
