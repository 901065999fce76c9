//! Argument marshaling
//!
//! Event sources pass arguments in `DISPPARAMS` last-to-first: cell `i` of
//! an `N`-argument call holds parameter `N-1-i`. The marshaler converts each
//! cell against the parameter it belongs to and returns the values in
//! declaration order.

use automation::{Value, ValueConverter, Variant};

use crate::error::EventSinkError;
use crate::interface::EventMethod;

/// Failed marshaling, with whatever values were converted before the failure
#[derive(Debug)]
pub struct MarshalFailure {
    pub error: EventSinkError,
    /// Converted values in declaration order
    pub collected: Vec<Value>,
}

/// Converts native argument cells for one callback
pub struct ArgumentMarshaler<'a> {
    converter: &'a dyn ValueConverter,
    wrap_references: bool,
}

impl<'a> ArgumentMarshaler<'a> {
    pub fn new(converter: &'a dyn ValueConverter, wrap_references: bool) -> Self {
        Self {
            converter,
            wrap_references,
        }
    }

    /// Check the native argument count against the callback's parameters
    pub fn validate<L>(&self, method: &EventMethod<L>, supplied: usize) -> Result<(), EventSinkError> {
        if method.param_count() != supplied {
            return Err(EventSinkError::ArgumentCount {
                method: method.signature(),
                expected: method.param_count(),
                supplied,
            });
        }
        Ok(())
    }

    /// Convert `args` (native order) into values in declaration order
    pub fn marshal<L>(
        &self,
        method: &EventMethod<L>,
        args: &mut [Variant],
    ) -> Result<Vec<Value>, MarshalFailure> {
        self.validate(method, args.len()).map_err(|error| MarshalFailure {
            error,
            collected: Vec::new(),
        })?;

        let params = method.param_types();
        let last = params.len().saturating_sub(1);
        let mut collected = Vec::with_capacity(params.len());

        for (i, cell) in args.iter_mut().enumerate() {
            let position = last - i;
            let target = params[position];
            match self.converter.convert(cell, target, self.wrap_references) {
                Ok(value) => collected.push(value),
                Err(source) => {
                    collected.reverse();
                    return Err(MarshalFailure {
                        error: EventSinkError::Conversion {
                            position,
                            target,
                            source,
                        },
                        collected,
                    });
                }
            }
        }

        // Native order is last-to-first
        collected.reverse();
        Ok(collected)
    }
}
