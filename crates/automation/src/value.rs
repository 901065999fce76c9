//! Converted automation values
//!
//! [`Value`] is what a VARIANT cell becomes after conversion; [`ParamType`]
//! names the type a handler parameter declares; [`FromValue`] turns a value
//! into the concrete Rust type of that parameter.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;

use bytes::Bytes;

use crate::error::{AutomationError, Result};
use crate::object::{ComPtr, DispatchProxy};
use crate::variant::{VarType, Variant, VARIANT_FALSE, VARIANT_TRUE};

/// Declared type of a handler parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Scaled x10000 fixed point (`VT_CY`)
    Currency,
    /// OLE automation date (`VT_DATE`)
    Date,
    /// Status code (`VT_ERROR`)
    SCode,
    String,
    Bytes,
    Dispatch,
    Unknown,
    /// The native cell itself, unconverted
    Variant,
    /// Whatever the cell naturally holds
    Any,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Currency => "Currency",
            Self::Date => "Date",
            Self::SCode => "SCode",
            Self::String => "String",
            Self::Bytes => "Bytes",
            Self::Dispatch => "DispatchProxy",
            Self::Unknown => "ComPtr",
            Self::Variant => "NativeVariant",
            Self::Any => "Value",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted argument
#[derive(Debug)]
pub enum Value {
    Empty,
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Currency(i64),
    Date(f64),
    SCode(i32),
    String(String),
    Bytes(Bytes),
    Dispatch(DispatchProxy),
    Unknown(ComPtr),
    Variant(NativeVariant),
}

impl Value {
    /// Runtime type name; `NULL` for empty and null values
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Empty | Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Currency(_) => "Currency",
            Self::Date(_) => "Date",
            Self::SCode(_) => "SCode",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::Dispatch(_) => "DispatchProxy",
            Self::Unknown(_) => "ComPtr",
            Self::Variant(_) => "NativeVariant",
        }
    }

    /// True for `Empty` and `Null`
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Empty | Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Currency(v) => {
                let sign = if *v < 0 { "-" } else { "" };
                let abs = v.unsigned_abs();
                write!(f, "{}{}.{:04}", sign, abs / 10_000, abs % 10_000)
            }
            Self::Date(v) => write!(f, "{}", v),
            Self::SCode(v) => write!(f, "{:#010x}", *v as u32),
            Self::String(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "{:?}", v),
            Self::Dispatch(v) => write!(f, "{:?}", v),
            Self::Unknown(v) => write!(f, "{:?}", v),
            Self::Variant(v) => write!(f, "{:?}", v),
        }
    }
}

thread_local! {
    /// Address ranges of the argument cells currently lent on this thread
    static LENT_CELLS: RefCell<Vec<Range<usize>>> = const { RefCell::new(Vec::new()) };
}

/// Lend `cells` to `f`
///
/// [`NativeVariant`] handles pointing into `cells` are usable only while
/// `f` runs on this thread; afterwards every access fails with
/// [`AutomationError::CellExpired`].
pub fn lend_cells<R>(cells: &mut [Variant], f: impl FnOnce(&mut [Variant]) -> R) -> R {
    struct Loan(Range<usize>);

    impl Drop for Loan {
        fn drop(&mut self) {
            LENT_CELLS.with(|lent| {
                let mut lent = lent.borrow_mut();
                if let Some(pos) = lent.iter().rposition(|r| *r == self.0) {
                    lent.remove(pos);
                }
            });
        }
    }

    let start = cells.as_mut_ptr() as usize;
    let range = start..start + std::mem::size_of_val(cells);
    LENT_CELLS.with(|lent| lent.borrow_mut().push(range.clone()));
    let _loan = Loan(range);
    f(cells)
}

fn is_lent(cell: *const Variant) -> bool {
    let addr = cell as usize;
    LENT_CELLS.with(|lent| {
        lent.borrow().iter().any(|r| {
            r.contains(&addr) && (addr - r.start) % std::mem::size_of::<Variant>() == 0
        })
    })
}

/// The native argument cell handed to a handler unconverted
///
/// Used for out-parameters: the handler writes its result through the
/// by-reference cell. Access is checked against the cells lent by
/// [`lend_cells`], so a handle kept past its callback only yields
/// [`AutomationError::CellExpired`]. Not `Send`: the loan is per thread.
#[derive(Debug)]
pub struct NativeVariant {
    cell: *mut Variant,
}

impl NativeVariant {
    pub fn new(cell: *mut Variant) -> Self {
        Self { cell }
    }

    pub fn as_ptr(&self) -> *mut Variant {
        self.cell
    }

    fn cell(&self) -> Result<*mut Variant> {
        if is_lent(self.cell) {
            Ok(self.cell)
        } else {
            Err(AutomationError::CellExpired)
        }
    }

    pub fn vt(&self) -> Result<VarType> {
        let cell = self.cell()?;
        // SAFETY: lent cells stay borrowed by `lend_cells` while registered.
        Ok(unsafe { (*cell).vt })
    }

    /// Copy of the native cell
    pub fn get(&self) -> Result<Variant> {
        let cell = self.cell()?;
        // SAFETY: as in `vt`.
        Ok(unsafe { *cell })
    }

    /// Store `value` through a `VT_BYREF` cell
    ///
    /// Only scalar targets are supported; the value is coerced to the
    /// referenced type with overflow checks.
    pub fn write(&self, value: Value) -> Result<()> {
        let cell = self.cell()?;
        let vt = self.vt()?;
        if !vt.is_byref() || vt.is_array() {
            return Err(AutomationError::UnsupportedVarType(vt));
        }
        // SAFETY: the cell is lent; a by-ref cell points at storage of its base type.
        let target = unsafe { (*cell).data.byref };
        if target.is_null() {
            return Err(AutomationError::NullPointer("VT_BYREF target"));
        }
        macro_rules! store {
            ($ty:ty, $param:ident) => {{
                let v: $ty = <$ty as FromValue>::from_value(crate::convert::coerce(value, ParamType::$param)?)?;
                unsafe { *(target as *mut $ty) = v };
            }};
        }
        match vt.base() {
            VarType::I1 => store!(i8, I8),
            VarType::UI1 => store!(u8, U8),
            VarType::I2 => store!(i16, I16),
            VarType::UI2 => store!(u16, U16),
            VarType::I4 | VarType::INT => store!(i32, I32),
            VarType::UI4 | VarType::UINT => store!(u32, U32),
            VarType::I8 => store!(i64, I64),
            VarType::UI8 => store!(u64, U64),
            VarType::R4 => store!(f32, F32),
            VarType::R8 => store!(f64, F64),
            VarType::CY => {
                let cy = crate::convert::coerce(value, ParamType::Currency)?;
                let Value::Currency(v) = cy else {
                    return Err(AutomationError::TypeMismatch {
                        expected: ParamType::Currency,
                        found: cy.type_name(),
                    });
                };
                unsafe { *(target as *mut i64) = v };
            }
            VarType::BOOL => {
                let b = bool::from_value(crate::convert::coerce(value, ParamType::Bool)?)?;
                unsafe { *(target as *mut i16) = if b { VARIANT_TRUE } else { VARIANT_FALSE } };
            }
            other => return Err(AutomationError::UnsupportedVarType(other.byref())),
        }
        Ok(())
    }
}

/// Conversion from a [`Value`] to a handler parameter type
pub trait FromValue: Sized {
    /// Type requested from the converter for this parameter
    const PARAM_TYPE: ParamType;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: ParamType, found: &Value) -> Result<T> {
    Err(AutomationError::TypeMismatch {
        expected,
        found: found.type_name(),
    })
}

macro_rules! from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const PARAM_TYPE: ParamType = ParamType::$variant;

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => mismatch(Self::PARAM_TYPE, &other),
                    }
                }
            }
        )*
    };
}

from_value! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Bytes => Bytes,
    DispatchProxy => Dispatch,
    ComPtr => Unknown,
    NativeVariant => Variant,
}

impl FromValue for Value {
    const PARAM_TYPE: ParamType = ParamType::Any;

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// Empty and null cells become `None`
impl<T: FromValue> FromValue for Option<T> {
    const PARAM_TYPE: ParamType = T::PARAM_TYPE;

    fn from_value(value: Value) -> Result<Self> {
        if value.is_nothing() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
