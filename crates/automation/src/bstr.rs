//! Automation strings (BSTR)
//!
//! A BSTR points at UTF-16 code units preceded by a 4-byte byte-length prefix
//! and followed by a terminating NUL. A null BSTR is the empty string.

use std::fmt;
use std::ptr;
use std::slice;

/// Owned, length-prefixed UTF-16 string with BSTR layout
///
/// Memory belongs to this process allocator, not to `SysAllocString`, so the
/// pointer may be lent to a callee but must never be freed by one.
#[derive(Clone)]
pub struct Bstr {
    /// Two prefix units, the text, and a terminator
    buf: Box<[u16]>,
}

impl Bstr {
    /// Encode `s` as a BSTR
    pub fn new(s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        let prefix = ((units.len() * 2) as u32).to_ne_bytes();
        let mut buf = Vec::with_capacity(units.len() + 3);
        buf.push(u16::from_ne_bytes([prefix[0], prefix[1]]));
        buf.push(u16::from_ne_bytes([prefix[2], prefix[3]]));
        buf.extend_from_slice(&units);
        buf.push(0);
        Self {
            buf: buf.into_boxed_slice(),
        }
    }

    /// Pointer to the first code unit, as stored in `VARIANT::bstrVal`
    pub fn as_ptr(&self) -> *mut u16 {
        // SAFETY: the buffer always holds at least the two prefix units
        // and the terminator, so offset 2 is in bounds.
        unsafe { self.buf.as_ptr().add(2) as *mut u16 }
    }

    /// Number of UTF-16 code units
    pub fn len(&self) -> usize {
        self.buf.len() - 3
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode back to a Rust string
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.buf[2..self.buf.len() - 1])
    }

    /// Decode a native BSTR
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point just past a valid 4-byte length prefix
    /// followed by that many bytes of UTF-16 data.
    pub unsafe fn read(ptr: *const u16) -> String {
        if ptr.is_null() {
            return String::new();
        }
        let prefix = (ptr as *const u8).sub(4) as *const u32;
        let byte_len = ptr::read_unaligned(prefix) as usize;
        let units = slice::from_raw_parts(ptr, byte_len / 2);
        String::from_utf16_lossy(units)
    }
}

impl From<&str> for Bstr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for Bstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BSTR({:?})", self.to_string_lossy())
    }
}
