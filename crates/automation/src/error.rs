//! Automation error types

use std::fmt;
use thiserror::Error;

use crate::value::ParamType;
use crate::variant::VarType;

/// Result type for automation operations
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Automation-specific errors
#[derive(Error, Debug)]
pub enum AutomationError {
    /// GUID string could not be parsed
    #[error("invalid GUID: {0:?}")]
    InvalidGuid(String),

    /// A value could not be converted to the requested type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ParamType,
        found: &'static str,
    },

    /// A value does not fit into the requested type
    #[error("overflow converting {value} to {target}")]
    Overflow { target: ParamType, value: String },

    /// VARTYPE the converter does not understand
    #[error("unsupported VARTYPE {0}")]
    UnsupportedVarType(VarType),

    /// Fewer values than declared parameters
    #[error("missing argument at position {0}")]
    MissingArgument(usize),

    /// A required native pointer was null
    #[error("null pointer: {0}")]
    NullPointer(&'static str),

    /// SAFEARRAY layout not supported
    #[error("invalid SAFEARRAY: {0}")]
    InvalidSafeArray(String),

    /// A native cell was used outside the callback it was lent to
    #[error("native argument cell used after its callback returned")]
    CellExpired,

    /// A native call returned a failure HRESULT
    #[error("{operation} failed: {hr}")]
    Hresult {
        operation: &'static str,
        hr: HResult,
    },
}

/// Native HRESULT status code
///
/// Laid out as a plain 32-bit signed integer so it can be returned directly
/// from `extern "system"` vtable entries.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HResult(pub i32);

impl HResult {
    /// Build from the unsigned code as written in Windows headers
    pub const fn from_code(code: u32) -> Self {
        Self(code as i32)
    }

    /// Unsigned code
    pub const fn code(self) -> u32 {
        self.0 as u32
    }

    /// Severity bit clear
    pub const fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Severity bit set
    pub const fn is_err(self) -> bool {
        self.0 < 0
    }

    /// Convert a failure code into an error for `operation`
    pub fn ok(self, operation: &'static str) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(AutomationError::Hresult { operation, hr: self })
        }
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HRESULT({:#010x})", self.code())
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.code())
    }
}

/// HRESULT codes used by automation objects
pub mod hresult {
    use super::HResult;

    /// Operation successful
    pub const S_OK: HResult = HResult::from_code(0x00000000);
    /// Operation successful, returning false
    pub const S_FALSE: HResult = HResult::from_code(0x00000001);
    /// Not implemented
    pub const E_NOTIMPL: HResult = HResult::from_code(0x80004001);
    /// No such interface supported
    pub const E_NOINTERFACE: HResult = HResult::from_code(0x80004002);
    /// Invalid pointer
    pub const E_POINTER: HResult = HResult::from_code(0x80004003);
    /// Unspecified error
    pub const E_FAIL: HResult = HResult::from_code(0x80004005);
    /// Invalid argument
    pub const E_INVALIDARG: HResult = HResult::from_code(0x80070057);
    /// Unknown name or DISPID
    pub const DISP_E_MEMBERNOTFOUND: HResult = HResult::from_code(0x80020003);
    /// Type mismatch in an argument
    pub const DISP_E_TYPEMISMATCH: HResult = HResult::from_code(0x80020005);
    /// Bad VARTYPE
    pub const DISP_E_BADVARTYPE: HResult = HResult::from_code(0x80020008);
    /// Exception raised by the callee
    pub const DISP_E_EXCEPTION: HResult = HResult::from_code(0x80020009);
    /// Value out of range
    pub const DISP_E_OVERFLOW: HResult = HResult::from_code(0x8002000A);
    /// Wrong number of arguments
    pub const DISP_E_BADPARAMCOUNT: HResult = HResult::from_code(0x8002000E);
    /// Thread already initialized with a different concurrency model
    pub const RPC_E_CHANGED_MODE: HResult = HResult::from_code(0x80010106);
}
