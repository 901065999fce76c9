//! COM object references
//!
//! A COM interface pointer is a pointer to an object whose first field is a
//! pointer to a table of `extern "system"` functions. [`ComPtr`] owns one
//! reference on such an object; [`DispatchProxy`] wraps an `IDispatch` so an
//! event handler can call back into the automation object with plain method
//! calls.
//!
//! Neither type is `Send`: crossing apartments requires marshaling, which
//! this crate does not perform.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

use crate::dispparams::{dispatch_flags, DispId, DispParams, ExcepInfo, Lcid, LOCALE_USER_DEFAULT};
use crate::error::{hresult, AutomationError, HResult, Result};
use crate::guid::{iid, Guid};
use crate::variant::Variant;

/// `IUnknown` vtable
#[repr(C)]
pub struct IUnknownVtbl {
    pub query_interface: unsafe extern "system" fn(
        this: *mut c_void,
        riid: *const Guid,
        ppv: *mut *mut c_void,
    ) -> HResult,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

/// `IDispatch` vtable
#[repr(C)]
pub struct IDispatchVtbl {
    pub base: IUnknownVtbl,
    pub get_type_info_count:
        unsafe extern "system" fn(this: *mut c_void, pctinfo: *mut u32) -> HResult,
    pub get_type_info: unsafe extern "system" fn(
        this: *mut c_void,
        itinfo: u32,
        lcid: Lcid,
        pptinfo: *mut *mut c_void,
    ) -> HResult,
    pub get_ids_of_names: unsafe extern "system" fn(
        this: *mut c_void,
        riid: *const Guid,
        rgsz_names: *const *const u16,
        c_names: u32,
        lcid: Lcid,
        rg_disp_id: *mut DispId,
    ) -> HResult,
    pub invoke: unsafe extern "system" fn(
        this: *mut c_void,
        disp_id_member: DispId,
        riid: *const Guid,
        lcid: Lcid,
        w_flags: u16,
        p_disp_params: *mut DispParams,
        p_var_result: *mut Variant,
        p_excep_info: *mut ExcepInfo,
        pu_arg_err: *mut u32,
    ) -> HResult,
}

/// Owned reference to a COM object
///
/// Cloning calls `AddRef`; dropping calls `Release`.
pub struct ComPtr {
    ptr: NonNull<c_void>,
}

impl ComPtr {
    /// Take a new reference on a borrowed interface pointer
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live COM interface pointer.
    pub unsafe fn from_borrowed(raw: *mut c_void) -> Option<Self> {
        let ptr = NonNull::new(raw)?;
        let this = Self { ptr };
        (this.vtbl().add_ref)(raw);
        Some(this)
    }

    /// Adopt a reference the caller already owns
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live COM interface pointer carrying one
    /// reference that is transferred to the returned value.
    pub unsafe fn from_owned(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(|ptr| Self { ptr })
    }

    /// Raw interface pointer; no reference is transferred
    pub fn as_raw(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    fn vtbl(&self) -> &IUnknownVtbl {
        // SAFETY: every COM interface pointer starts with its vtable pointer.
        unsafe { &**(self.ptr.as_ptr() as *const *const IUnknownVtbl) }
    }

    /// Ask the object for another interface
    pub fn query_interface(&self, riid: &Guid) -> Result<ComPtr> {
        let mut out: *mut c_void = ptr::null_mut();
        // SAFETY: self.ptr is a live interface pointer.
        let hr = unsafe { (self.vtbl().query_interface)(self.as_raw(), riid, &mut out) };
        hr.ok("QueryInterface")?;
        // SAFETY: a successful QueryInterface hands over one reference.
        unsafe { ComPtr::from_owned(out) }.ok_or(AutomationError::NullPointer("QueryInterface result"))
    }
}

impl Clone for ComPtr {
    fn clone(&self) -> Self {
        // SAFETY: self.ptr is a live interface pointer.
        unsafe { (self.vtbl().add_ref)(self.as_raw()) };
        Self { ptr: self.ptr }
    }
}

impl Drop for ComPtr {
    fn drop(&mut self) {
        // SAFETY: this value owns exactly one reference.
        unsafe { (self.vtbl().release)(self.as_raw()) };
    }
}

impl fmt::Debug for ComPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComPtr({:p})", self.ptr)
    }
}

/// Proxy over an `IDispatch` object
#[derive(Clone, Debug)]
pub struct DispatchProxy {
    inner: ComPtr,
}

impl DispatchProxy {
    /// Wrap a borrowed `IDispatch` pointer, taking a reference
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live `IDispatch` interface pointer.
    pub unsafe fn from_borrowed(raw: *mut c_void) -> Option<Self> {
        ComPtr::from_borrowed(raw).map(|inner| Self { inner })
    }

    /// Obtain `IDispatch` from any object reference
    pub fn from_unknown(unknown: &ComPtr) -> Result<Self> {
        unknown
            .query_interface(&iid::IDISPATCH)
            .map(|inner| Self { inner })
    }

    pub fn as_raw(&self) -> *mut c_void {
        self.inner.as_raw()
    }

    /// The underlying object reference
    pub fn as_unknown(&self) -> &ComPtr {
        &self.inner
    }

    pub fn into_unknown(self) -> ComPtr {
        self.inner
    }

    fn vtbl(&self) -> &IDispatchVtbl {
        // SAFETY: the wrapped pointer is an IDispatch, whose vtable extends IUnknown's.
        unsafe { &**(self.inner.as_raw() as *const *const IDispatchVtbl) }
    }

    pub fn query_interface(&self, riid: &Guid) -> Result<ComPtr> {
        self.inner.query_interface(riid)
    }

    /// Number of type descriptions the object provides (0 or 1)
    pub fn type_info_count(&self) -> Result<u32> {
        let mut count = 0u32;
        let hr = unsafe { (self.vtbl().get_type_info_count)(self.as_raw(), &mut count) };
        hr.ok("GetTypeInfoCount")?;
        Ok(count)
    }

    /// Resolve a member name to its DISPID
    pub fn id_of_name(&self, name: &str) -> Result<DispId> {
        let wide: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
        let names = [wide.as_ptr()];
        let mut dispid = DispId::UNKNOWN;
        let hr = unsafe {
            (self.vtbl().get_ids_of_names)(
                self.as_raw(),
                &Guid::NIL,
                names.as_ptr(),
                1,
                LOCALE_USER_DEFAULT,
                &mut dispid,
            )
        };
        hr.ok("GetIDsOfNames")?;
        Ok(dispid)
    }

    /// Raw `Invoke`; `args` are in native (last-to-first) order
    pub fn invoke(&self, dispid: DispId, flags: u16, args: &mut [Variant]) -> Result<Variant> {
        let mut params = DispParams::new(args);
        let mut result = Variant::empty();
        let mut excep = ExcepInfo::default();
        let mut arg_err = 0u32;
        let hr = unsafe {
            (self.vtbl().invoke)(
                self.as_raw(),
                dispid,
                &Guid::NIL,
                LOCALE_USER_DEFAULT,
                flags,
                &mut params,
                &mut result,
                &mut excep,
                &mut arg_err,
            )
        };
        if hr == hresult::DISP_E_EXCEPTION {
            tracing::debug!(
                "Invoke of DISPID {} raised exception {:?}",
                dispid, excep
            );
        }
        hr.ok("Invoke")?;
        Ok(result)
    }

    /// Call a method with arguments in declaration order
    pub fn call_method(&self, dispid: DispId, args: &[Variant]) -> Result<Variant> {
        let mut native: Vec<Variant> = args.iter().rev().copied().collect();
        self.invoke(dispid, dispatch_flags::METHOD, &mut native)
    }
}
