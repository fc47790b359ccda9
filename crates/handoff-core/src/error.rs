//! Error taxonomy for the signaling core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignalError>;

#[derive(Debug, Error)]
pub enum SignalError {
    /// Malformed or unexpected input, caught before any connection state is touched.
    #[error("invalid signaling input: {0}")]
    Validation(String),

    /// The peer-connection capability rejected an offer/answer/description step.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// A single remote candidate could not be applied.
    #[error("candidate rejected: {0}")]
    CandidateApply(String),

    /// The data channel could not be created or driven.
    #[error("data channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Common(#[from] handoff_common::Error),
}

impl SignalError {
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    pub fn negotiation(msg: impl std::fmt::Display) -> Self {
        Self::Negotiation(msg.to_string())
    }

    pub fn candidate(msg: impl std::fmt::Display) -> Self {
        Self::CandidateApply(msg.to_string())
    }

    pub fn channel(msg: impl std::fmt::Display) -> Self {
        Self::Channel(msg.to_string())
    }

    /// True for failures that must not abort a negotiation flow.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CandidateApply(_))
    }
}
