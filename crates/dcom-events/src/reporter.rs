//! Side channel for dispatch failures
//!
//! The native caller of an event sink only ever sees `S_OK`. Everything that
//! goes wrong while routing an event is handed to an [`ErrorReporter`].

use crate::error::EventSinkError;

/// Receives dispatch failures
pub trait ErrorReporter: Send + Sync {
    /// Report a failure
    ///
    /// `message` is a human-readable description naming the event; `cause`
    /// carries the underlying error.
    fn report(&self, message: &str, cause: Option<&EventSinkError>);
}

/// Reporter that logs through `tracing` at error level
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, message: &str, cause: Option<&EventSinkError>) {
        match cause {
            Some(cause) => tracing::error!("{}: {}", message, cause),
            None => tracing::error!("{}", message),
        }
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(&str, Option<&EventSinkError>) + Send + Sync,
{
    fn report(&self, message: &str, cause: Option<&EventSinkError>) {
        self(message, cause)
    }
}
