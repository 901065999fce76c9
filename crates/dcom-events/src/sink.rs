//! Event sink

use std::ffi::c_void;
use std::fmt;
use std::ptr;
use std::sync::Arc;

use automation::{
    hresult, DispId, DispParams, Guid, HResult, IDispatchVtbl, StandardConverter, ValueConverter,
    Variant, LOCALE_USER_DEFAULT,
};

use crate::config::SinkConfig;
use crate::dispatcher::{DispatchOutcome, EventDispatcher};
use crate::error::Result;
use crate::identity::resolve_interface_id;
use crate::interface::EventInterface;
use crate::native::{InvokeTarget, NativeSink};
use crate::registry::{DispIdMap, DispIdResolver, UnresolvedNames};
use crate::reporter::{ErrorReporter, TracingReporter};

struct SinkShared<L> {
    listener: Arc<L>,
    dispatcher: EventDispatcher<L>,
}

impl<L: Send + Sync + 'static> InvokeTarget for SinkShared<L> {
    fn invoke(&self, dispid: DispId, args: &mut [Variant]) -> DispatchOutcome {
        self.dispatcher.dispatch(&self.listener, dispid, args)
    }

    fn invoke_missing_cells(&self, dispid: DispId, supplied: usize) -> DispatchOutcome {
        self.dispatcher.dispatch_missing_cells(dispid, supplied)
    }
}

/// An `IDispatch` event sink routing native events to a listener
///
/// [`as_raw`](Self::as_raw) is the pointer to hand to an event source. The
/// native object's `AddRef` and `Release` are no-ops: the sink lives exactly
/// as long as this value, so the source registration must be revoked before
/// the sink is dropped.
///
/// Events are delivered synchronously on the thread the source calls from.
/// Sources may call from several threads at once, so callbacks must be
/// reentrant.
pub struct EventSink<L> {
    native: Box<NativeSink>,
    shared: Arc<SinkShared<L>>,
    interface: String,
    iid: Guid,
}

impl<L: Send + Sync + 'static> EventSink<L> {
    /// Create a sink with the default reporter, converter and configuration
    pub fn new(interface: EventInterface<L>, listener: Arc<L>) -> Result<Self> {
        Self::builder(interface, listener).build()
    }

    pub fn builder(interface: EventInterface<L>, listener: Arc<L>) -> EventSinkBuilder<L> {
        EventSinkBuilder::new(interface, listener)
    }

    /// Interface ID the sink answers `QueryInterface` for
    pub fn interface_id(&self) -> Guid {
        self.iid
    }

    pub fn interface_name(&self) -> &str {
        &self.interface
    }

    pub fn listener(&self) -> &Arc<L> {
        &self.shared.listener
    }

    pub fn config(&self) -> &SinkConfig {
        self.shared.dispatcher.config()
    }

    /// DISPIDs with a registered callback, ascending
    pub fn dispids(&self) -> Vec<DispId> {
        self.shared.dispatcher.map().dispids()
    }

    /// Native `IDispatch*`; no reference is transferred
    pub fn as_raw(&self) -> *mut c_void {
        self.native.as_raw()
    }

    /// Dispatch an event without going through the native vtable
    ///
    /// `args` are in native order, last parameter first.
    pub fn dispatch(&self, dispid: DispId, args: &mut [Variant]) -> DispatchOutcome {
        self.shared.dispatcher.dispatch(&self.shared.listener, dispid, args)
    }
}

impl<L> EventSink<L> {
    fn vtbl(&self) -> &'static IDispatchVtbl {
        self.native.vtbl()
    }

    fn raw(&self) -> *mut c_void {
        self.native.as_raw()
    }

    /// `IUnknown::QueryInterface` on the native object
    pub fn query_interface(&self, riid: &Guid) -> std::result::Result<*mut c_void, HResult> {
        let mut out = ptr::null_mut();
        // SAFETY: raw() is this sink's own native object.
        let hr = unsafe { (self.vtbl().base.query_interface)(self.raw(), riid, &mut out) };
        if hr.is_ok() {
            Ok(out)
        } else {
            Err(hr)
        }
    }

    /// `IUnknown::AddRef`; always 0
    pub fn add_ref(&self) -> u32 {
        // SAFETY: raw() is this sink's own native object.
        unsafe { (self.vtbl().base.add_ref)(self.raw()) }
    }

    /// `IUnknown::Release`; always 0
    pub fn release(&self) -> u32 {
        // SAFETY: raw() is this sink's own native object.
        unsafe { (self.vtbl().base.release)(self.raw()) }
    }

    /// `IDispatch::GetTypeInfoCount`; always `E_NOTIMPL`
    pub fn get_type_info_count(&self) -> HResult {
        let mut count = 0u32;
        // SAFETY: raw() is this sink's own native object.
        unsafe { (self.vtbl().get_type_info_count)(self.raw(), &mut count) }
    }

    /// `IDispatch::GetTypeInfo`; always `E_NOTIMPL`
    pub fn get_type_info(&self, index: u32) -> HResult {
        let mut info = ptr::null_mut();
        // SAFETY: raw() is this sink's own native object.
        unsafe { (self.vtbl().get_type_info)(self.raw(), index, LOCALE_USER_DEFAULT, &mut info) }
    }

    /// `IDispatch::GetIDsOfNames`; always `E_NOTIMPL`
    pub fn get_ids_of_names(&self, names: &[&str]) -> HResult {
        let wide: Vec<Vec<u16>> = names
            .iter()
            .map(|name| name.encode_utf16().chain(Some(0)).collect())
            .collect();
        let pointers: Vec<*const u16> = wide.iter().map(|name| name.as_ptr()).collect();
        let mut dispids = vec![DispId::UNKNOWN; names.len()];
        // SAFETY: raw() is this sink's own native object; both arrays hold names.len() entries.
        unsafe {
            (self.vtbl().get_ids_of_names)(
                self.raw(),
                &Guid::NIL,
                pointers.as_ptr(),
                names.len() as u32,
                LOCALE_USER_DEFAULT,
                dispids.as_mut_ptr(),
            )
        }
    }

    /// `IDispatch::Invoke` on the native object; always `S_OK`
    ///
    /// `args` are in native order, last parameter first.
    pub fn invoke(&self, dispid: DispId, flags: u16, args: &mut [Variant]) -> HResult {
        let mut params = DispParams::new(args);
        let mut result = Variant::empty();
        let mut arg_err = 0u32;
        // SAFETY: raw() is this sink's own native object; params borrows args for the call.
        let hr = unsafe {
            (self.vtbl().invoke)(
                self.raw(),
                dispid,
                &Guid::NIL,
                LOCALE_USER_DEFAULT,
                flags,
                &mut params,
                &mut result,
                ptr::null_mut(),
                &mut arg_err,
            )
        };
        debug_assert_eq!(hr, hresult::S_OK);
        hr
    }
}

impl<L> fmt::Debug for EventSink<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("interface", &self.interface)
            .field("iid", &self.iid)
            .field("native", &self.native.as_raw())
            .finish()
    }
}

impl<L> Drop for EventSink<L> {
    fn drop(&mut self) {
        tracing::debug!("dropping event sink for {} at {:p}", self.interface, self.native.as_raw());
    }
}

/// Builder for [`EventSink`]
pub struct EventSinkBuilder<L> {
    interface: EventInterface<L>,
    listener: Arc<L>,
    reporter: Arc<dyn ErrorReporter>,
    converter: Arc<dyn ValueConverter>,
    resolver: Box<dyn DispIdResolver>,
    config: SinkConfig,
}

impl<L: Send + Sync + 'static> EventSinkBuilder<L> {
    pub fn new(interface: EventInterface<L>, listener: Arc<L>) -> Self {
        Self {
            interface,
            listener,
            reporter: Arc::new(TracingReporter),
            converter: Arc::new(StandardConverter),
            resolver: Box::new(UnresolvedNames),
            config: SinkConfig::default(),
        }
    }

    /// Where dispatch failures go; defaults to [`TracingReporter`]
    pub fn reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// DISPID lookup for callbacks registered by name
    pub fn resolver(mut self, resolver: impl DispIdResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(mut self, config: SinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the interface and build the sink
    pub fn build(self) -> Result<EventSink<L>> {
        let iid = resolve_interface_id(&self.interface)?;
        let map = DispIdMap::build(&self.interface, self.resolver.as_ref());
        let interface = self.interface.name().to_string();

        tracing::debug!(
            "creating event sink for {} {} with {} callbacks",
            interface,
            iid,
            map.len()
        );

        let dispatcher = EventDispatcher::new(
            interface.clone(),
            map,
            self.converter,
            self.reporter,
            self.config,
        );
        let shared = Arc::new(SinkShared {
            listener: self.listener,
            dispatcher,
        });
        let native = NativeSink::new(iid, shared.clone());

        Ok(EventSink {
            native,
            shared,
            interface,
            iid,
        })
    }
}
