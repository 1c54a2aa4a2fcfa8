//! Error types and handling for the processing core.
//!
//! This module defines the error taxonomy that drives retry behavior:
//! validation errors are permanent (dead-lettered at the queue boundary),
//! infrastructure errors are transient (negatively acknowledged and
//! redelivered), and not-found conditions are recoverable where a default
//! makes sense.

use scorekeep_event_system::{FailureKind, HandlerFailure, HandlerResult};

/// Enumeration of possible core errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// Permanently invalid input (malformed Steam ID, empty player name,
    /// invalid event variant). Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist. Callers decide whether to fall
    /// back to a default or fail.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence-layer failure. `out_of_range` marks the distinguishable
    /// numeric-range violation raised when an unsigned counter would
    /// underflow; the kill handler retries those with a clamped value.
    #[error("Repository error: {message}")]
    Repository { message: String, out_of_range: bool },

    /// RCON transport failure (connect, status, command).
    #[error("RCON error: {0}")]
    Rcon(String),

    /// Queue transport failure.
    #[error("Queue error: {0}")]
    Queue(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn repository(message: impl Into<String>) -> Self {
        CoreError::Repository { message: message.into(), out_of_range: false }
    }

    /// The distinguishable "out of range" persistence error (§ unsigned
    /// counter underflow).
    pub fn out_of_range(message: impl Into<String>) -> Self {
        CoreError::Repository { message: message.into(), out_of_range: true }
    }

    pub fn rcon(message: impl Into<String>) -> Self {
        CoreError::Rcon(message.into())
    }

    pub fn queue(message: impl Into<String>) -> Self {
        CoreError::Queue(message.into())
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, CoreError::Repository { out_of_range: true, .. })
    }

    /// Whether a retry may succeed. This predicate is the single source of
    /// truth for the queue consumer's ack/nack/dead-letter decision.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Repository { .. } | CoreError::Rcon(_) | CoreError::Queue(_)
        )
    }

    pub fn failure_kind(&self) -> FailureKind {
        if self.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Validation
        }
    }

    /// Converts into the structured shape handlers hand back to the bus.
    pub fn to_handler_result(&self) -> HandlerResult {
        HandlerResult {
            success: false,
            affected: 0,
            error: Some(HandlerFailure {
                message: self.to_string(),
                kind: self.failure_kind(),
            }),
        }
    }
}

impl From<scorekeep_event_system::EventError> for CoreError {
    fn from(err: scorekeep_event_system::EventError) -> Self {
        CoreError::Queue(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
