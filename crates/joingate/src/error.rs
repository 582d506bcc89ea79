//! Error taxonomy.
//!
//! None of these are fatal: each is either recovered locally (a compensating
//! store removal) or turned into a message for the user.

use std::time::Duration;

use thiserror::Error;

use crate::core::UserId;

/// An outbound call that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// No answer within the configured send timeout.
    #[error("outbound call timed out after {0:?}")]
    Timeout(Duration),

    /// The platform answered and refused the call.
    #[error("rejected by the platform ({code:?}): {description}")]
    Rejected {
        code: Option<i64>,
        description: String,
    },

    /// The call never got an answer (connection, TLS, decoding...).
    #[error("transport failure: {0}")]
    Transport(String),
}

impl DeliveryFailure {
    pub fn rejected(code: Option<i64>, description: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            description: description.into(),
        }
    }
}

/// An inbound payload that could not be understood.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("malformed update payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("empty update payload")]
    Empty,
}

/// A shared contact that does not belong to the person who shared it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contact shared by {sender} belongs to {subject:?}")]
pub struct IdentityMismatch {
    pub sender: UserId,
    pub subject: Option<UserId>,
}

/// An optional collaborator that was not configured. The side-effect that
/// needed it is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not configured")]
pub struct ConfigurationMissing(pub &'static str);

/// Failures of the engine itself, as opposed to the events it handles.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
