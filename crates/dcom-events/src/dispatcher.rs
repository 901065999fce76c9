//! Event dispatcher
//!
//! Routes one native invocation to its callback:
//!
//! ```text
//! Received -> Resolved -> Validated -> Marshaled -> Invoked -> Completed
//! ```
//!
//! A miss at any stage ends the dispatch with a report to the
//! [`ErrorReporter`]. Nothing escapes [`EventDispatcher::dispatch`]: errors
//! and panics alike are turned into reports.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use automation::{com_is_initialized, lend_cells, DispId, Value, ValueConverter, Variant};

use crate::config::SinkConfig;
use crate::error::EventSinkError;
use crate::interface::EventMethod;
use crate::marshal::ArgumentMarshaler;
use crate::registry::DispIdMap;
use crate::reporter::ErrorReporter;

/// Dispatch progress, for tracing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Resolved,
    Validated,
    Marshaled,
    Invoked,
    Completed,
}

/// How a dispatch ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The callback ran and returned successfully
    Delivered,
    /// The dispatch failed and the failure was reported
    Reported,
    /// No callback for the DISPID and unknown DISPIDs are not reported
    Ignored,
}

/// Routes native invocations to the callbacks of one event interface
pub struct EventDispatcher<L> {
    interface: String,
    map: DispIdMap<L>,
    converter: Arc<dyn ValueConverter>,
    reporter: Arc<dyn ErrorReporter>,
    config: SinkConfig,
}

impl<L> EventDispatcher<L> {
    pub fn new(
        interface: impl Into<String>,
        map: DispIdMap<L>,
        converter: Arc<dyn ValueConverter>,
        reporter: Arc<dyn ErrorReporter>,
        config: SinkConfig,
    ) -> Self {
        Self {
            interface: interface.into(),
            map,
            converter,
            reporter,
            config,
        }
    }

    pub fn map(&self) -> &DispIdMap<L> {
        &self.map
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Dispatch one event
    ///
    /// `args` are the native argument cells, last parameter first.
    pub fn dispatch(&self, listener: &L, dispid: DispId, args: &mut [Variant]) -> DispatchOutcome {
        debug_assert!(com_is_initialized(), "Assumption about COM threading broken.");
        self.trace(dispid, DispatchState::Received);

        let method: &EventMethod<L> = match self.map.get(dispid) {
            Some(method) => method,
            None => return self.unknown_dispid(dispid),
        };
        self.trace(dispid, DispatchState::Resolved);

        let marshaler = ArgumentMarshaler::new(self.converter.as_ref(), self.config.wrap_object_references);

        if let Err(error) = marshaler.validate(method, args.len()) {
            return self.argument_count_failure(dispid, method, args.len(), &error);
        }
        self.trace(dispid, DispatchState::Validated);

        let mut supplied: Vec<&'static str> = Vec::new();
        // Cells handed over as `NativeVariant` are only usable while lent
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            lend_cells(args, |cells| {
                self.marshal_and_call(listener, dispid, method, &marshaler, cells, &mut supplied)
            })
        }));

        let error = match result {
            Ok(Ok(())) => return self.completed(dispid, DispatchOutcome::Delivered),
            Ok(Err(error)) => error,
            Err(payload) => EventSinkError::HandlerPanicked(panic_message(payload.as_ref())),
        };

        self.report(
            &format!(
                "Failed to invoke method {}::{} supplied: [{}]",
                self.interface,
                method.signature(),
                supplied.join(", ")
            ),
            &error,
        );
        self.completed(dispid, DispatchOutcome::Reported)
    }

    /// Reject an invocation that declares `supplied` arguments but carries no
    /// argument cells; the callback is never called
    pub fn dispatch_missing_cells(&self, dispid: DispId, supplied: usize) -> DispatchOutcome {
        debug_assert!(com_is_initialized(), "Assumption about COM threading broken.");
        self.trace(dispid, DispatchState::Received);

        let method: &EventMethod<L> = match self.map.get(dispid) {
            Some(method) => method,
            None => return self.unknown_dispid(dispid),
        };
        self.trace(dispid, DispatchState::Resolved);

        let error = EventSinkError::MissingArgumentCells {
            method: method.signature(),
            supplied,
        };
        self.argument_count_failure(dispid, method, supplied, &error)
    }

    fn argument_count_failure(
        &self,
        dispid: DispId,
        method: &EventMethod<L>,
        supplied: usize,
        error: &EventSinkError,
    ) -> DispatchOutcome {
        self.report(
            &format!(
                "Trying to invoke method {}::{} with {} arguments",
                self.interface,
                method.signature(),
                supplied
            ),
            error,
        );
        self.completed(dispid, DispatchOutcome::Reported)
    }

    fn marshal_and_call(
        &self,
        listener: &L,
        dispid: DispId,
        method: &EventMethod<L>,
        marshaler: &ArgumentMarshaler<'_>,
        args: &mut [Variant],
        supplied: &mut Vec<&'static str>,
    ) -> Result<(), EventSinkError> {
        let values = match marshaler.marshal(method, args) {
            Ok(values) => values,
            Err(failure) => {
                *supplied = failure.collected.iter().map(Value::type_name).collect();
                return Err(failure.error);
            }
        };
        *supplied = values.iter().map(Value::type_name).collect();
        self.trace(dispid, DispatchState::Marshaled);

        method.call(listener, values)?;
        self.trace(dispid, DispatchState::Invoked);
        Ok(())
    }

    fn unknown_dispid(&self, dispid: DispId) -> DispatchOutcome {
        if !self.config.report_unknown_dispids {
            tracing::debug!("{}: ignoring event with DISPID {}", self.interface, dispid);
            return self.completed(dispid, DispatchOutcome::Ignored);
        }
        self.report(
            &format!("No method found with dispId = {}", dispid),
            &EventSinkError::UnknownDispId(dispid),
        );
        self.completed(dispid, DispatchOutcome::Reported)
    }

    fn report(&self, message: &str, cause: &EventSinkError) {
        let reported = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reporter.report(message, Some(cause));
        }));
        if let Err(payload) = reported {
            tracing::error!(
                "error reporter panicked ({}) while reporting: {}: {}",
                panic_message(payload.as_ref()),
                message,
                cause
            );
        }
    }

    fn completed(&self, dispid: DispId, outcome: DispatchOutcome) -> DispatchOutcome {
        tracing::trace!(
            "{}: DISPID {} {:?} ({:?})",
            self.interface,
            dispid,
            DispatchState::Completed,
            outcome
        );
        outcome
    }

    fn trace(&self, dispid: DispId, state: DispatchState) {
        tracing::trace!("{}: DISPID {} {:?}", self.interface, dispid, state);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
