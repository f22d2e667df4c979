//! Error types for the event bus

use crate::address::EventAddress;
use crate::emitter::RegistrationId;
use thiserror::Error;

/// Errors surfaced synchronously to the caller of a bus operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Invalid event address: {field} must not be empty (got {value:?})")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Payload conversion failed: {0}")]
    Payload(String),

    #[error("Invalid bus configuration: {0}")]
    Config(String),
}

impl EventError {
    pub(crate) fn invalid_address(field: &'static str, value: impl Into<String>) -> Self {
        EventError::InvalidAddress {
            field,
            value: value.into(),
        }
    }
}

/// Error a listener returns from its callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),

    #[error("Listener panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Shorthand for [`ListenerError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }
}

/// A listener failure as reported to the runtime's error channel.
///
/// Failures are contained to the listener that produced them: the rest of
/// the dispatch pass still runs and the publisher never sees the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Address being dispatched when the listener failed
    pub address: EventAddress,

    /// Registration that failed
    pub registration: RegistrationId,

    /// What went wrong
    pub error: ListenerError,
}

impl std::fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "listener #{} on {} failed: {}",
            self.registration, self.address, self.error
        )
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
