//! Native `IDispatch` object
//!
//! [`NativeSink`] is the object event sources hold a pointer to. Its first
//! field is the vtable pointer, so a `*mut NativeSink` is a valid
//! `IDispatch*`. The vtable is a single static shared by every sink; the
//! per-sink state sits behind the vtable pointer.
//!
//! `AddRef` and `Release` do nothing and return 0. The owning
//! [`EventSink`](crate::EventSink) decides when the object goes away, and
//! whoever registers the sink with a source must revoke the registration
//! before dropping it.

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use automation::{
    hresult, iid, DispId, DispParams, ExcepInfo, Guid, HResult, IDispatchVtbl, IUnknownVtbl, Lcid,
    Variant,
};

use crate::dispatcher::DispatchOutcome;

/// Receiver of native `Invoke` calls
pub(crate) trait InvokeTarget: Send + Sync {
    /// `args` are in native order, last parameter first
    fn invoke(&self, dispid: DispId, args: &mut [Variant]) -> DispatchOutcome;

    /// `supplied` arguments were declared without an argument array
    fn invoke_missing_cells(&self, dispid: DispId, supplied: usize) -> DispatchOutcome;
}

/// The object behind a sink's `IDispatch*`
#[repr(C)]
pub(crate) struct NativeSink {
    vtbl: &'static IDispatchVtbl,
    iid: Guid,
    target: Arc<dyn InvokeTarget>,
}

impl NativeSink {
    pub(crate) fn new(iid: Guid, target: Arc<dyn InvokeTarget>) -> Box<Self> {
        Box::new(Self {
            vtbl: &SINK_VTBL,
            iid,
            target,
        })
    }

    pub(crate) fn as_raw(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    pub(crate) fn vtbl(&self) -> &'static IDispatchVtbl {
        self.vtbl
    }
}

/// Whether a sink claiming `own` answers `QueryInterface` for `requested`
pub fn negotiate(requested: &Guid, own: &Guid) -> bool {
    requested == own || *requested == iid::IUNKNOWN || *requested == iid::IDISPATCH
}

static SINK_VTBL: IDispatchVtbl = IDispatchVtbl {
    base: IUnknownVtbl {
        query_interface: sink_query_interface,
        add_ref: sink_add_ref,
        release: sink_release,
    },
    get_type_info_count: sink_get_type_info_count,
    get_type_info: sink_get_type_info,
    get_ids_of_names: sink_get_ids_of_names,
    invoke: sink_invoke,
};

unsafe extern "system" fn sink_query_interface(
    this: *mut c_void,
    riid: *const Guid,
    ppv: *mut *mut c_void,
) -> HResult {
    if ppv.is_null() {
        return hresult::E_POINTER;
    }
    if riid.is_null() {
        *ppv = ptr::null_mut();
        return hresult::E_POINTER;
    }

    let sink = &*(this as *const NativeSink);
    if negotiate(&*riid, &sink.iid) {
        *ppv = this;
        hresult::S_OK
    } else {
        tracing::trace!("QueryInterface for {} refused", *riid);
        *ppv = ptr::null_mut();
        hresult::E_NOINTERFACE
    }
}

unsafe extern "system" fn sink_add_ref(_this: *mut c_void) -> u32 {
    0
}

unsafe extern "system" fn sink_release(_this: *mut c_void) -> u32 {
    0
}

unsafe extern "system" fn sink_get_type_info_count(_this: *mut c_void, _pctinfo: *mut u32) -> HResult {
    hresult::E_NOTIMPL
}

unsafe extern "system" fn sink_get_type_info(
    _this: *mut c_void,
    _itinfo: u32,
    _lcid: Lcid,
    _pptinfo: *mut *mut c_void,
) -> HResult {
    hresult::E_NOTIMPL
}

unsafe extern "system" fn sink_get_ids_of_names(
    _this: *mut c_void,
    _riid: *const Guid,
    _rgsz_names: *const *const u16,
    _c_names: u32,
    _lcid: Lcid,
    _rg_disp_id: *mut DispId,
) -> HResult {
    hresult::E_NOTIMPL
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn sink_invoke(
    this: *mut c_void,
    disp_id_member: DispId,
    riid: *const Guid,
    _lcid: Lcid,
    _w_flags: u16,
    p_disp_params: *mut DispParams,
    _p_var_result: *mut Variant,
    _p_excep_info: *mut ExcepInfo,
    _pu_arg_err: *mut u32,
) -> HResult {
    let sink = &*(this as *const NativeSink);

    if !riid.is_null() && !(*riid).is_nil() {
        tracing::debug!("Invoke of DISPID {} with non-null riid {}", disp_id_member, *riid);
    }

    let params = p_disp_params.as_ref();
    if let Some(params) = params.filter(|p| p.c_named_args > 0) {
        tracing::debug!(
            "Invoke of DISPID {}: ignoring {} named arguments",
            disp_id_member,
            params.c_named_args
        );
    }

    let dispatched = panic::catch_unwind(AssertUnwindSafe(|| match params {
        Some(params) if params.is_missing_cells() => {
            sink.target.invoke_missing_cells(disp_id_member, params.c_args as usize)
        }
        // SAFETY: the caller owns the cells for the duration of the call.
        Some(params) => sink.target.invoke(disp_id_member, unsafe { params.args_mut() }),
        None => sink.target.invoke(disp_id_member, &mut []),
    }));
    if dispatched.is_err() {
        tracing::error!("dispatch of DISPID {} panicked", disp_id_member);
    }

    hresult::S_OK
}
