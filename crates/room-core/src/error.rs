//! Error types for room-core
//!
//! Every fallible operation in this crate returns [`RoomResult`]. Errors are
//! grouped so callers can decide how to react:
//!
//! - **Argument errors** - bad input from the host (`InvalidArgument`,
//!   `InvalidIceOptions`, `InvalidTrackOptions`). Fix the input, do not retry.
//! - **Handle errors** - a host handle no longer names a live object
//!   (`DanglingHandle`). The host released the object before using it.
//! - **Lifecycle errors** - an operation on a released participant or a room
//!   in the wrong state (`Released`, `InvalidState`). These are caller bugs.
//! - **Engine errors** - the media engine rejected a publish/unpublish
//!   (`Engine`). Passed through exactly as the engine reported them.
//!
//! Adding a track that is already published, or removing one that is not, is
//! *not* an error: those operations return `Ok(false)`.
//!
//! ```rust
//! use confab_room_core::{ConnectOptionsBuilder, HandleRegistry, RoomError};
//!
//! let handles = HandleRegistry::new();
//! match ConnectOptionsBuilder::new("").build(&handles) {
//!     Err(RoomError::InvalidArgument { field, .. }) => assert_eq!(field, "access_token"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Result type alias for room-core operations
pub type RoomResult<T> = Result<T, RoomError>;

/// Error reported by the media engine when it rejects a renegotiation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} rejected by media engine: {reason}")]
pub struct EngineError {
    /// Engine operation that failed (`publish` or `unpublish`)
    pub operation: String,
    /// Reason reported by the engine
    pub reason: String,
}

impl EngineError {
    /// Create a publish rejection
    pub fn publish(reason: impl Into<String>) -> Self {
        Self { operation: "publish".to_string(), reason: reason.into() }
    }

    /// Create an unpublish rejection
    pub fn unpublish(reason: impl Into<String>) -> Self {
        Self { operation: "unpublish".to_string(), reason: reason.into() }
    }
}

/// Error types for room-core operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoomError {
    /// Malformed or missing required input
    #[error("Invalid argument: {field} - {reason}")]
    InvalidArgument { field: String, reason: String },

    /// A host handle did not resolve to a live object
    #[error("Dangling {kind} handle {handle} at index {index}")]
    DanglingHandle { kind: &'static str, index: usize, handle: u64 },

    /// Operation attempted on a participant after `release()`
    #[error("Participant {participant} has been released")]
    Released { participant: String },

    /// Media engine rejected a renegotiation
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid ICE options: {reason}")]
    InvalidIceOptions { reason: String },

    #[error("Invalid track options: {reason}")]
    InvalidTrackOptions { reason: String },

    /// Settings could not be read or parsed
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// The connector failed to establish or tear down a room
    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },
}

impl RoomError {
    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { field: field.into(), reason: reason.into() }
    }

    /// Create a dangling handle error
    pub fn dangling_handle(kind: &'static str, index: usize, handle: u64) -> Self {
        Self::DanglingHandle { kind, index, handle }
    }

    /// Create a use-after-release error
    pub fn released(participant: impl ToString) -> Self {
        Self::Released { participant: participant.to_string() }
    }

    pub fn invalid_ice_options(reason: impl Into<String>) -> Self {
        Self::InvalidIceOptions { reason: reason.into() }
    }

    pub fn invalid_track_options(reason: impl Into<String>) -> Self {
        Self::InvalidTrackOptions { reason: reason.into() }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    /// Create a connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection { reason: reason.into() }
    }

    /// Check if the error was caused by the caller breaking a lifecycle contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, RoomError::Released { .. } | RoomError::InvalidState { .. })
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            RoomError::InvalidArgument { .. } |
            RoomError::InvalidIceOptions { .. } |
            RoomError::InvalidTrackOptions { .. } => "argument",

            RoomError::DanglingHandle { .. } => "handle",

            RoomError::Released { .. } |
            RoomError::InvalidState { .. } => "lifecycle",

            RoomError::Engine(_) => "engine",

            RoomError::Configuration { .. } => "configuration",

            RoomError::Connection { .. } => "connection",
        }
    }
}

impl From<toml::de::Error> for RoomError {
    fn from(err: toml::de::Error) -> Self {
        RoomError::configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoomError::dangling_handle("audio track", 2, 17);
        assert_eq!(err.to_string(), "Dangling audio track handle 17 at index 2");

        let err = RoomError::invalid_argument("access_token", "must not be empty");
        assert_eq!(err.to_string(), "Invalid argument: access_token - must not be empty");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err: RoomError = EngineError::publish("no transceiver").into();
        assert_eq!(err.to_string(), "publish rejected by media engine: no transceiver");
        assert_eq!(err.category(), "engine");
    }

    #[test]
    fn test_categories() {
        assert_eq!(RoomError::released("PA1").category(), "lifecycle");
        assert!(RoomError::released("PA1").is_contract_violation());
        assert_eq!(RoomError::invalid_ice_options("x").category(), "argument");
        assert!(!RoomError::connection("x").is_contract_violation());
    }
}
