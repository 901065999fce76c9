//! Event sink error types

use automation::{AutomationError, DispId, ParamType};
use thiserror::Error;

/// Result type for event sink operations
pub type Result<T> = std::result::Result<T, EventSinkError>;

/// Error returned by a failing event handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Event sink errors
///
/// Configuration errors are returned from sink construction. Every other
/// variant is only ever seen by the [`ErrorReporter`](crate::ErrorReporter):
/// the native caller always receives `S_OK`.
#[derive(Error, Debug)]
pub enum EventSinkError {
    /// Event interface declares no interface ID
    #[error("event interface {interface} must define an interface ID")]
    MissingInterfaceId { interface: String },

    /// Event interface declares an unusable interface ID
    #[error("event interface {interface} has an invalid interface ID: {source}")]
    InvalidInterfaceId {
        interface: String,
        #[source]
        source: AutomationError,
    },

    /// No callback registered for the DISPID
    #[error("no method found with DISPID {0}")]
    UnknownDispId(DispId),

    /// Argument count differs from the callback's parameter count
    #[error("method {method} takes {expected} arguments, {supplied} supplied")]
    ArgumentCount {
        method: String,
        expected: usize,
        supplied: usize,
    },

    /// Arguments were declared but no argument cells were supplied
    #[error("method {method}: {supplied} arguments declared without an argument array")]
    MissingArgumentCells { method: String, supplied: usize },

    /// A native argument could not be converted to the declared type
    #[error("cannot convert argument {position} to {target}: {source}")]
    Conversion {
        position: usize,
        target: ParamType,
        #[source]
        source: AutomationError,
    },

    /// A converted value did not match the handler's parameter type
    #[error("argument type mismatch: {0}")]
    ArgumentType(#[source] AutomationError),

    /// The handler returned an error
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),

    /// The handler panicked
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

impl EventSinkError {
    /// True for errors raised while building a sink
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingInterfaceId { .. } | Self::InvalidInterfaceId { .. }
        )
    }
}
