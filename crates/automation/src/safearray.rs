//! SAFEARRAY support
//!
//! Only one-dimensional arrays of single-byte elements are decoded; event
//! sources use them for binary payloads (`VT_ARRAY|VT_UI1`).

use std::ffi::c_void;
use std::slice;

use bytes::Bytes;

use crate::error::{AutomationError, Result};

/// Bounds of one SAFEARRAY dimension
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct SafeArrayBound {
    pub c_elements: u32,
    pub l_lbound: i32,
}

/// SAFEARRAY header with a single trailing bound (`oaidl.h` layout)
#[repr(C)]
#[derive(Debug)]
pub struct SafeArray {
    pub c_dims: u16,
    pub f_features: u16,
    pub cb_elements: u32,
    pub c_locks: u32,
    pub pv_data: *mut c_void,
    pub rgsabound: [SafeArrayBound; 1],
}

impl SafeArray {
    /// Copy the contents of a one-dimensional byte array
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point at a valid SAFEARRAY whose data pointer
    /// covers `c_elements * cb_elements` readable bytes.
    pub unsafe fn read_bytes(ptr: *const SafeArray) -> Result<Bytes> {
        let array = ptr
            .as_ref()
            .ok_or(AutomationError::NullPointer("SAFEARRAY"))?;
        if array.c_dims != 1 {
            return Err(AutomationError::InvalidSafeArray(format!(
                "{} dimensions",
                array.c_dims
            )));
        }
        if array.cb_elements != 1 {
            return Err(AutomationError::InvalidSafeArray(format!(
                "element size {}",
                array.cb_elements
            )));
        }
        let len = array.rgsabound[0].c_elements as usize;
        if len == 0 {
            return Ok(Bytes::new());
        }
        if array.pv_data.is_null() {
            return Err(AutomationError::NullPointer("SAFEARRAY data"));
        }
        let data = slice::from_raw_parts(array.pv_data as *const u8, len);
        Ok(Bytes::copy_from_slice(data))
    }
}

/// Owned one-dimensional byte SAFEARRAY
///
/// Keeps the header and the data alive together so the header can be lent
/// to a callee inside a `VT_ARRAY|VT_UI1` cell.
pub struct SafeByteArray {
    header: Box<SafeArray>,
    _data: Bytes,
}

impl SafeByteArray {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let header = Box::new(SafeArray {
            c_dims: 1,
            f_features: 0,
            cb_elements: 1,
            c_locks: 0,
            pv_data: data.as_ptr() as *mut c_void,
            rgsabound: [SafeArrayBound {
                c_elements: data.len() as u32,
                l_lbound: 0,
            }],
        });
        Self {
            header,
            _data: data,
        }
    }

    /// Pointer to the header, as stored in `VARIANT::parray`
    pub fn as_ptr(&self) -> *mut SafeArray {
        &*self.header as *const SafeArray as *mut SafeArray
    }
}
