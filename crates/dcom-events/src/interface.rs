//! Event interface descriptors
//!
//! An [`EventInterface`] describes the events a listener wants to receive:
//! the interface ID the sink answers to, and one typed callback per event.
//! Callbacks are closures over the listener taking their arguments as a
//! tuple; the tuple type fixes the declared parameter types.
//!
//! ```
//! use dcom_events::EventInterface;
//!
//! struct Clock;
//!
//! impl Clock {
//!     fn on_tick(&self, _count: i32) {}
//!     fn on_move(&self, _y: i32, _x: i32) {}
//! }
//!
//! let interface = EventInterface::<Clock>::builder("ClockEvents")
//!     .iid("5a3b0a4e-4c5f-4b7e-9d3c-2f1e6b8a9c01")
//!     .callback(1, "on_tick", |clock: &Clock, (count,): (i32,)| clock.on_tick(count))
//!     .callback(2, "on_move", |clock: &Clock, (y, x): (i32, i32)| clock.on_move(y, x))
//!     .build();
//!
//! assert_eq!(interface.methods().len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use automation::{AutomationError, DispId, FromValue, ParamType, Value};

use crate::error::{EventSinkError, HandlerError, Result};

/// Conversion of a handler's return value into a success/failure outcome
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> std::result::Result<(), HandlerError>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> std::result::Result<(), HandlerError> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for std::result::Result<(), E>
where
    E: Into<HandlerError>,
{
    fn into_handler_result(self) -> std::result::Result<(), HandlerError> {
        self.map_err(Into::into)
    }
}

/// Argument tuple of a callback
pub trait EventArgs: Sized {
    /// Declared parameter types, first to last
    fn param_types() -> Vec<ParamType>;

    /// Build the tuple from values in declaration order
    fn from_values(values: Vec<Value>) -> automation::Result<Self>;
}

macro_rules! impl_event_args {
    ($($ty:ident $var:ident),*) => {
        impl<$($ty: FromValue),*> EventArgs for ($($ty,)*) {
            fn param_types() -> Vec<ParamType> {
                vec![$(<$ty as FromValue>::PARAM_TYPE),*]
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn from_values(values: Vec<Value>) -> automation::Result<Self> {
                let mut values = values.into_iter();
                let mut position = 0usize;
                $(
                    let $var = match values.next() {
                        Some(value) => <$ty as FromValue>::from_value(value)?,
                        None => return Err(AutomationError::MissingArgument(position)),
                    };
                    position += 1;
                )*
                Ok(($($var,)*))
            }
        }
    };
}

impl_event_args!();
impl_event_args!(A a);
impl_event_args!(A a, B b);
impl_event_args!(A a, B b, C c);
impl_event_args!(A a, B b, C c, D d);
impl_event_args!(A a, B b, C c, D d, E e);
impl_event_args!(A a, B b, C c, D d, E e, F f);
impl_event_args!(A a, B b, C c, D d, E e, F f, G g);
impl_event_args!(A a, B b, C c, D d, E e, F f, G g, H h);

/// How a callback's DISPID is declared
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispIdTag {
    /// Fixed DISPID
    Explicit(DispId),
    /// Resolve from the method name when the sink is built
    ByName,
}

type Thunk<L> = Box<dyn Fn(&L, Vec<Value>) -> Result<()> + Send + Sync>;

/// A callback declared on an event interface
pub struct EventMethod<L> {
    name: String,
    tag: DispIdTag,
    params: Vec<ParamType>,
    thunk: Thunk<L>,
}

impl<L> EventMethod<L> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> DispIdTag {
        self.tag
    }

    /// Declared parameter types, first to last
    pub fn param_types(&self) -> &[ParamType] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// `name(type, type, ...)`
    ///
    /// Reports prefix this with the interface name (`Interface::name(..)`).
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.name()).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Call the handler with values in declaration order
    pub(crate) fn call(&self, listener: &L, values: Vec<Value>) -> Result<()> {
        (self.thunk)(listener, values)
    }
}

impl<L> fmt::Debug for EventMethod<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMethod")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("params", &self.params)
            .finish()
    }
}

/// Event interface descriptor
pub struct EventInterface<L> {
    name: String,
    iid: Option<String>,
    methods: Vec<Arc<EventMethod<L>>>,
}

impl<L: 'static> EventInterface<L> {
    /// Start describing an interface
    pub fn builder(name: impl Into<String>) -> EventInterfaceBuilder<L> {
        EventInterfaceBuilder::new(name)
    }
}

impl<L> EventInterface<L> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared interface ID string, unvalidated
    pub fn iid(&self) -> Option<&str> {
        self.iid.as_deref()
    }

    /// Declared callbacks in declaration order
    pub fn methods(&self) -> &[Arc<EventMethod<L>>] {
        &self.methods
    }
}

impl<L> fmt::Debug for EventInterface<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInterface")
            .field("name", &self.name)
            .field("iid", &self.iid)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for [`EventInterface`]
pub struct EventInterfaceBuilder<L> {
    interface: EventInterface<L>,
}

impl<L: 'static> EventInterfaceBuilder<L> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            interface: EventInterface {
                name: name.into(),
                iid: None,
                methods: Vec::new(),
            },
        }
    }

    /// Interface ID the sink will answer `QueryInterface` for
    pub fn iid(mut self, iid: impl Into<String>) -> Self {
        self.interface.iid = Some(iid.into());
        self
    }

    /// Register a callback under a fixed DISPID
    pub fn callback<A, F, R>(self, dispid: impl Into<DispId>, name: &str, handler: F) -> Self
    where
        A: EventArgs,
        F: Fn(&L, A) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.method(DispIdTag::Explicit(dispid.into()), name, handler)
    }

    /// Register a callback whose DISPID is looked up by name
    pub fn callback_by_name<A, F, R>(self, name: &str, handler: F) -> Self
    where
        A: EventArgs,
        F: Fn(&L, A) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.method(DispIdTag::ByName, name, handler)
    }

    fn method<A, F, R>(mut self, tag: DispIdTag, name: &str, handler: F) -> Self
    where
        A: EventArgs,
        F: Fn(&L, A) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        let thunk: Thunk<L> = Box::new(move |listener: &L, values: Vec<Value>| {
            let args = A::from_values(values).map_err(EventSinkError::ArgumentType)?;
            handler(listener, args)
                .into_handler_result()
                .map_err(EventSinkError::Handler)
        });
        self.interface.methods.push(Arc::new(EventMethod {
            name: name.to_string(),
            tag,
            params: A::param_types(),
            thunk,
        }));
        self
    }

    pub fn build(self) -> EventInterface<L> {
        self.interface
    }
}
