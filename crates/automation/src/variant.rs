//! VARIANT cells
//!
//! A VARIANT is a 16-bit type tag followed by a union of every automation
//! scalar and pointer type. The layout below matches `oaidl.h`: 24 bytes on
//! 64-bit targets (the record arm holds two pointers), 16 bytes on 32-bit.

use std::ffi::c_void;
use std::fmt;

use crate::bstr::Bstr;
use crate::safearray::SafeArray;

/// VARTYPE tag of a VARIANT cell
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VarType(pub u16);

impl VarType {
    pub const EMPTY: Self = Self(0);
    pub const NULL: Self = Self(1);
    pub const I2: Self = Self(2);
    pub const I4: Self = Self(3);
    pub const R4: Self = Self(4);
    pub const R8: Self = Self(5);
    pub const CY: Self = Self(6);
    pub const DATE: Self = Self(7);
    pub const BSTR: Self = Self(8);
    pub const DISPATCH: Self = Self(9);
    pub const ERROR: Self = Self(10);
    pub const BOOL: Self = Self(11);
    pub const VARIANT: Self = Self(12);
    pub const UNKNOWN: Self = Self(13);
    pub const I1: Self = Self(16);
    pub const UI1: Self = Self(17);
    pub const UI2: Self = Self(18);
    pub const UI4: Self = Self(19);
    pub const I8: Self = Self(20);
    pub const UI8: Self = Self(21);
    pub const INT: Self = Self(22);
    pub const UINT: Self = Self(23);

    /// Array flag
    pub const ARRAY: u16 = 0x2000;
    /// By-reference flag
    pub const BYREF: u16 = 0x4000;
    const TYPEMASK: u16 = 0x0fff;

    /// Tag without the ARRAY/BYREF modifiers
    pub fn base(self) -> Self {
        Self(self.0 & Self::TYPEMASK)
    }

    pub fn is_byref(self) -> bool {
        self.0 & Self::BYREF != 0
    }

    pub fn is_array(self) -> bool {
        self.0 & Self::ARRAY != 0
    }

    /// Add the by-reference modifier
    pub fn byref(self) -> Self {
        Self(self.0 | Self::BYREF)
    }

    /// Add the array modifier
    pub fn array(self) -> Self {
        Self(self.0 | Self::ARRAY)
    }

    fn base_name(self) -> Option<&'static str> {
        let name = match self.base() {
            Self::EMPTY => "VT_EMPTY",
            Self::NULL => "VT_NULL",
            Self::I2 => "VT_I2",
            Self::I4 => "VT_I4",
            Self::R4 => "VT_R4",
            Self::R8 => "VT_R8",
            Self::CY => "VT_CY",
            Self::DATE => "VT_DATE",
            Self::BSTR => "VT_BSTR",
            Self::DISPATCH => "VT_DISPATCH",
            Self::ERROR => "VT_ERROR",
            Self::BOOL => "VT_BOOL",
            Self::VARIANT => "VT_VARIANT",
            Self::UNKNOWN => "VT_UNKNOWN",
            Self::I1 => "VT_I1",
            Self::UI1 => "VT_UI1",
            Self::UI2 => "VT_UI2",
            Self::UI4 => "VT_UI4",
            Self::I8 => "VT_I8",
            Self::UI8 => "VT_UI8",
            Self::INT => "VT_INT",
            Self::UINT => "VT_UINT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base_name() {
            Some(name) => f.write_str(name)?,
            None => write!(f, "VT_{:#06x}", self.base().0)?,
        }
        if self.is_array() {
            f.write_str("|VT_ARRAY")?;
        }
        if self.is_byref() {
            f.write_str("|VT_BYREF")?;
        }
        Ok(())
    }
}

/// `VARIANT_TRUE`
pub const VARIANT_TRUE: i16 = -1;
/// `VARIANT_FALSE`
pub const VARIANT_FALSE: i16 = 0;

/// Payload union of a VARIANT
#[repr(C)]
#[derive(Clone, Copy)]
pub union VariantData {
    pub ll_val: i64,
    pub l_val: i32,
    pub i_val: i16,
    pub c_val: i8,
    pub b_val: u8,
    pub ui_val: u16,
    pub ul_val: u32,
    pub ull_val: u64,
    pub flt_val: f32,
    pub dbl_val: f64,
    pub bool_val: i16,
    pub scode: i32,
    pub cy_val: i64,
    pub date: f64,
    pub bstr_val: *mut u16,
    pub punk_val: *mut c_void,
    pub pdisp_val: *mut c_void,
    pub parray: *mut SafeArray,
    pub byref: *mut c_void,
    pub record: [*mut c_void; 2],
}

/// Native VARIANT cell
///
/// `Variant` is `Copy` because it is a plain native record: copying one never
/// adds a reference to an object it points at. Ownership of BSTRs, arrays and
/// interface pointers stays with whoever allocated the cell.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Variant {
    pub vt: VarType,
    pub reserved1: u16,
    pub reserved2: u16,
    pub reserved3: u16,
    pub data: VariantData,
}

impl Variant {
    /// Build a cell from a tag and payload
    pub fn new(vt: VarType, data: VariantData) -> Self {
        Self {
            vt,
            reserved1: 0,
            reserved2: 0,
            reserved3: 0,
            data,
        }
    }

    /// `VT_EMPTY`
    pub fn empty() -> Self {
        Self::new(VarType::EMPTY, VariantData { ll_val: 0 })
    }

    /// `VT_NULL`
    pub fn null() -> Self {
        Self::new(VarType::NULL, VariantData { ll_val: 0 })
    }

    /// `VT_BSTR` borrowing `bstr`; the string must outlive every use of the cell
    pub fn from_bstr(bstr: &Bstr) -> Self {
        Self::new(VarType::BSTR, VariantData { bstr_val: bstr.as_ptr() })
    }

    /// `VT_DISPATCH` cell holding a borrowed interface pointer
    pub fn from_dispatch(pdisp: *mut c_void) -> Self {
        Self::new(VarType::DISPATCH, VariantData { pdisp_val: pdisp })
    }

    /// `VT_UNKNOWN` cell holding a borrowed interface pointer
    pub fn from_unknown(punk: *mut c_void) -> Self {
        Self::new(VarType::UNKNOWN, VariantData { punk_val: punk })
    }

    /// `VT_ERROR` cell
    pub fn from_scode(scode: i32) -> Self {
        Self::new(VarType::ERROR, VariantData { scode })
    }

    /// `VT_CY` cell from the scaled (x10000) integer
    pub fn from_currency(cy: i64) -> Self {
        Self::new(VarType::CY, VariantData { cy_val: cy })
    }

    /// `VT_DATE` cell
    pub fn from_date(date: f64) -> Self {
        Self::new(VarType::DATE, VariantData { date })
    }

    /// `VT_ARRAY|VT_UI1` cell borrowing a SAFEARRAY
    pub fn from_safearray(vt: VarType, parray: *mut SafeArray) -> Self {
        Self::new(vt.array(), VariantData { parray })
    }

    /// `VT_BYREF|vt` cell pointing at caller-owned storage
    pub fn by_ref<T>(vt: VarType, target: *mut T) -> Self {
        Self::new(vt.byref(), VariantData { byref: target.cast() })
    }

    pub fn is_empty(&self) -> bool {
        self.vt == VarType::EMPTY
    }

    pub fn is_null(&self) -> bool {
        self.vt == VarType::NULL
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: every arm of the union is 8 bytes or wider at offset 0
        // and reading the low 64 bits as an integer is always defined.
        let bits = unsafe { self.data.ll_val };
        write!(f, "VARIANT({}, {:#018x})", self.vt, bits)
    }
}

macro_rules! variant_from {
    ($($ty:ty => $vt:ident . $field:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    let mut cell = Self::empty();
                    cell.vt = VarType::$vt;
                    cell.data.$field = value;
                    cell
                }
            }
        )*
    };
}

variant_from! {
    i8 => I1.c_val,
    u8 => UI1.b_val,
    i16 => I2.i_val,
    u16 => UI2.ui_val,
    i32 => I4.l_val,
    u32 => UI4.ul_val,
    i64 => I8.ll_val,
    u64 => UI8.ull_val,
    f32 => R4.flt_val,
    f64 => R8.dbl_val,
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        let bool_val = if value { VARIANT_TRUE } else { VARIANT_FALSE };
        Self::new(VarType::BOOL, VariantData { bool_val })
    }
}
