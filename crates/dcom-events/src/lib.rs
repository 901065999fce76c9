//! COM event sinks for Rust listeners
//!
//! An automation object raises events by calling `IDispatch::Invoke` on the
//! sink objects registered with its connection points. This crate builds such
//! a sink from an explicit table of typed callbacks:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          Event source (native, calls through vtable)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Native sink          │  QueryInterface (own IID,           │
//! │  - IDispatch vtable   │  IUnknown, IDispatch), inert        │
//! │  - Invoke -> S_OK     │  AddRef/Release                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Event dispatcher     │  DISPID map       │  Marshaler      │
//! │  - resolve, validate  │  - built once     │  - reverse      │
//! │  - report failures    │  - read-only      │    arg order    │
//! ├─────────────────────────────────────────────────────────────┤
//! │        Listener callbacks  │  Error reporter (side channel) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use automation::{ApartmentGuard, ApartmentType, DispId, Variant};
//! use dcom_events::{EventInterface, EventSink};
//!
//! struct Clock;
//!
//! let interface = EventInterface::<Clock>::builder("ClockEvents")
//!     .iid("{3C5E1A2B-7D4F-4E6A-8B9C-0D1E2F3A4B5C}")
//!     .callback(1, "on_tick", |_: &Clock, (count,): (i32,)| println!("tick {}", count))
//!     .build();
//! let sink = EventSink::new(interface, Arc::new(Clock)).unwrap();
//!
//! let _apartment = ApartmentGuard::enter(ApartmentType::Mta).unwrap();
//! sink.dispatch(DispId(1), &mut [Variant::from(7i32)]);
//! ```
//!
//! # Modules
//!
//! - [`interface`]: event interface descriptors and typed callbacks
//! - [`registry`]: DISPID to callback mapping
//! - [`marshal`]: argument conversion in native order
//! - [`dispatcher`]: per-invocation routing and failure reporting
//! - [`reporter`]: side channel for dispatch failures
//! - [`sink`]: the sink object handed to event sources

pub mod config;
pub mod dispatcher;
pub mod identity;
pub mod interface;
pub mod marshal;
pub mod registry;
pub mod reporter;
pub mod sink;

mod error;
mod native;

pub use config::SinkConfig;
pub use dispatcher::{DispatchOutcome, DispatchState, EventDispatcher};
pub use error::{EventSinkError, HandlerError, Result};
pub use identity::resolve_interface_id;
pub use interface::{DispIdTag, EventArgs, EventInterface, EventInterfaceBuilder, EventMethod, IntoHandlerResult};
pub use marshal::{ArgumentMarshaler, MarshalFailure};
pub use native::negotiate;
pub use registry::{DispIdMap, DispIdResolver, UnresolvedNames};
pub use reporter::{ErrorReporter, TracingReporter};
pub use sink::{EventSink, EventSinkBuilder};
