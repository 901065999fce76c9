//! IDispatch invocation records
//!
//! - `DISPID`: member identifier
//! - `DISPPARAMS`: positional arguments, last argument first
//! - `EXCEPINFO`: exception details returned by `Invoke`

use std::ffi::c_void;
use std::fmt;
use std::ptr;
use std::slice;

use crate::error::HResult;
use crate::variant::Variant;

/// Locale identifier
pub type Lcid = u32;

/// `LOCALE_USER_DEFAULT`
pub const LOCALE_USER_DEFAULT: Lcid = 0x0400;

/// `Invoke` flags (`wFlags`)
pub mod dispatch_flags {
    pub const METHOD: u16 = 0x1;
    pub const PROPERTYGET: u16 = 0x2;
    pub const PROPERTYPUT: u16 = 0x4;
    pub const PROPERTYPUTREF: u16 = 0x8;
}

/// Dispatch identifier of an automation member
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DispId(pub i32);

impl DispId {
    /// `DISPID_UNKNOWN`: identifier not resolved
    pub const UNKNOWN: Self = Self(-1);
    /// `DISPID_VALUE`: default member
    pub const VALUE: Self = Self(0);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl From<i32> for DispId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for DispId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DISPID({})", self.0)
    }
}

impl fmt::Display for DispId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Native `DISPPARAMS`
#[repr(C)]
#[derive(Debug)]
pub struct DispParams {
    pub rgvarg: *mut Variant,
    pub rgdispid_named_args: *mut DispId,
    pub c_args: u32,
    pub c_named_args: u32,
}

impl DispParams {
    /// Positional arguments borrowed from `args`, already in native order
    pub fn new(args: &mut [Variant]) -> Self {
        Self {
            rgvarg: if args.is_empty() {
                ptr::null_mut()
            } else {
                args.as_mut_ptr()
            },
            rgdispid_named_args: ptr::null_mut(),
            c_args: args.len() as u32,
            c_named_args: 0,
        }
    }

    /// No arguments
    pub fn empty() -> Self {
        Self::new(&mut [])
    }

    /// Declares arguments but carries no argument array
    pub fn is_missing_cells(&self) -> bool {
        self.c_args > 0 && self.rgvarg.is_null()
    }

    /// Argument cells in native (reverse) order
    ///
    /// # Safety
    ///
    /// `rgvarg` must point at `c_args` valid cells for the lifetime `'a`
    /// with no other live reference to them.
    pub unsafe fn args_mut<'a>(&self) -> &'a mut [Variant] {
        if self.c_args == 0 || self.rgvarg.is_null() {
            return &mut [];
        }
        slice::from_raw_parts_mut(self.rgvarg, self.c_args as usize)
    }
}

/// Native `EXCEPINFO`
#[repr(C)]
pub struct ExcepInfo {
    pub w_code: u16,
    pub w_reserved: u16,
    pub bstr_source: *mut u16,
    pub bstr_description: *mut u16,
    pub bstr_help_file: *mut u16,
    pub dw_help_context: u32,
    pub pv_reserved: *mut c_void,
    pub pfn_deferred_fill_in: Option<unsafe extern "system" fn(*mut ExcepInfo) -> HResult>,
    pub scode: i32,
}

impl Default for ExcepInfo {
    fn default() -> Self {
        Self {
            w_code: 0,
            w_reserved: 0,
            bstr_source: ptr::null_mut(),
            bstr_description: ptr::null_mut(),
            bstr_help_file: ptr::null_mut(),
            dw_help_context: 0,
            pv_reserved: ptr::null_mut(),
            pfn_deferred_fill_in: None,
            scode: 0,
        }
    }
}

impl fmt::Debug for ExcepInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcepInfo")
            .field("w_code", &self.w_code)
            .field("scode", &HResult(self.scode))
            .finish_non_exhaustive()
    }
}
