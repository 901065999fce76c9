//! VARIANT to [`Value`] conversion
//!
//! Conversion happens in two steps:
//! 1. the cell is decoded into its *natural* value according to its VARTYPE
//!    (following `VT_BYREF` indirections and wrapping object references);
//! 2. the natural value is coerced to the declared parameter type, with
//!    range checks on every narrowing conversion.
//!
//! Empty and null cells pass through step 2 unchanged for every target so
//! that optional parameters can observe them.

use std::ffi::c_void;

use crate::bstr::Bstr;
use crate::error::{AutomationError, Result};
use crate::object::{ComPtr, DispatchProxy};
use crate::safearray::SafeArray;
use crate::value::{NativeVariant, ParamType, Value};
use crate::variant::{VarType, Variant};

/// Converts native argument cells into handler values
pub trait ValueConverter: Send + Sync {
    /// Convert `cell` to `target`
    ///
    /// When `wrap_references` is set, `VT_DISPATCH` cells become
    /// [`DispatchProxy`] values instead of raw [`ComPtr`] handles.
    fn convert(&self, cell: &mut Variant, target: ParamType, wrap_references: bool) -> Result<Value>;
}

/// Default converter covering the scalar, string, object and byte-array
/// VARTYPEs that event sources emit
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardConverter;

impl StandardConverter {
    pub fn new() -> Self {
        Self
    }
}

impl ValueConverter for StandardConverter {
    fn convert(&self, cell: &mut Variant, target: ParamType, wrap_references: bool) -> Result<Value> {
        if target == ParamType::Variant {
            return Ok(Value::Variant(NativeVariant::new(cell)));
        }
        // SAFETY: cells come from a DISPPARAMS the caller guarantees valid.
        let natural = unsafe { natural_value(cell, wrap_references)? };
        coerce(natural, target)
    }
}

/// Decode a cell according to its own VARTYPE
///
/// # Safety
///
/// Pointer payloads (BSTR, arrays, objects, by-ref targets) must be valid.
pub unsafe fn natural_value(cell: &Variant, wrap_references: bool) -> Result<Value> {
    let vt = cell.vt;
    if vt.is_byref() {
        return deref_value(cell, wrap_references);
    }
    if vt.is_array() {
        return match vt.base() {
            VarType::UI1 | VarType::I1 => SafeArray::read_bytes(cell.data.parray).map(Value::Bytes),
            _ => Err(AutomationError::UnsupportedVarType(vt)),
        };
    }
    let data = &cell.data;
    let value = match vt {
        VarType::EMPTY => Value::Empty,
        VarType::NULL => Value::Null,
        VarType::I1 => Value::I8(data.c_val),
        VarType::UI1 => Value::U8(data.b_val),
        VarType::I2 => Value::I16(data.i_val),
        VarType::UI2 => Value::U16(data.ui_val),
        VarType::I4 | VarType::INT => Value::I32(data.l_val),
        VarType::UI4 | VarType::UINT => Value::U32(data.ul_val),
        VarType::I8 => Value::I64(data.ll_val),
        VarType::UI8 => Value::U64(data.ull_val),
        VarType::R4 => Value::F32(data.flt_val),
        VarType::R8 => Value::F64(data.dbl_val),
        VarType::BOOL => Value::Bool(data.bool_val != 0),
        VarType::CY => Value::Currency(data.cy_val),
        VarType::DATE => Value::Date(data.date),
        VarType::ERROR => Value::SCode(data.scode),
        VarType::BSTR => Value::String(Bstr::read(data.bstr_val)),
        VarType::DISPATCH => object_value(data.pdisp_val, wrap_references),
        VarType::UNKNOWN => object_value(data.punk_val, false),
        other => return Err(AutomationError::UnsupportedVarType(other)),
    };
    Ok(value)
}

unsafe fn object_value(raw: *mut c_void, wrap: bool) -> Value {
    if wrap {
        DispatchProxy::from_borrowed(raw).map_or(Value::Null, Value::Dispatch)
    } else {
        ComPtr::from_borrowed(raw).map_or(Value::Null, Value::Unknown)
    }
}

/// Read through a `VT_BYREF` cell into a temporary by-value cell
unsafe fn deref_value(cell: &Variant, wrap_references: bool) -> Result<Value> {
    let target = cell.data.byref;
    if target.is_null() {
        return Err(AutomationError::NullPointer("VT_BYREF target"));
    }
    let inner_vt = VarType(cell.vt.0 & !VarType::BYREF);
    if inner_vt == VarType::VARIANT {
        return natural_value(&*(target as *const Variant), wrap_references);
    }

    let mut copy = Variant::empty();
    copy.vt = inner_vt;
    if inner_vt.is_array() {
        copy.data.parray = *(target as *const *mut SafeArray);
    } else {
        match inner_vt {
            VarType::I1 | VarType::UI1 => copy.data.b_val = *(target as *const u8),
            VarType::I2 | VarType::UI2 | VarType::BOOL => copy.data.ui_val = *(target as *const u16),
            VarType::I4
            | VarType::UI4
            | VarType::INT
            | VarType::UINT
            | VarType::R4
            | VarType::ERROR => copy.data.ul_val = *(target as *const u32),
            VarType::I8 | VarType::UI8 | VarType::R8 | VarType::CY | VarType::DATE => {
                copy.data.ull_val = *(target as *const u64)
            }
            VarType::BSTR | VarType::DISPATCH | VarType::UNKNOWN => {
                copy.data.byref = *(target as *const *mut c_void)
            }
            _ => return Err(AutomationError::UnsupportedVarType(cell.vt)),
        }
    }
    natural_value(&copy, wrap_references)
}

fn mismatch<T>(target: ParamType, value: &Value) -> Result<T> {
    Err(AutomationError::TypeMismatch {
        expected: target,
        found: value.type_name(),
    })
}

fn overflow(target: ParamType, value: &Value) -> AutomationError {
    AutomationError::Overflow {
        target,
        value: value.to_string(),
    }
}

fn float_to_wide(v: f64, target: ParamType, value: &Value) -> Result<i128> {
    if !v.is_finite() || v.abs() >= 1e38 {
        return Err(overflow(target, value));
    }
    Ok(v.round_ties_even() as i128)
}

fn to_wide_int(value: &Value, target: ParamType) -> Result<i128> {
    match value {
        Value::Bool(b) => Ok(if *b { -1 } else { 0 }),
        Value::I8(v) => Ok(*v as i128),
        Value::U8(v) => Ok(*v as i128),
        Value::I16(v) => Ok(*v as i128),
        Value::U16(v) => Ok(*v as i128),
        Value::I32(v) | Value::SCode(v) => Ok(*v as i128),
        Value::U32(v) => Ok(*v as i128),
        Value::I64(v) => Ok(*v as i128),
        Value::U64(v) => Ok(*v as i128),
        Value::F32(v) => float_to_wide(*v as f64, target, value),
        Value::F64(v) | Value::Date(v) => float_to_wide(*v, target, value),
        Value::Currency(v) => float_to_wide(*v as f64 / 10_000.0, target, value),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i128>() {
                Ok(v) => Ok(v),
                Err(_) => match s.parse::<f64>() {
                    Ok(f) => float_to_wide(f, target, value),
                    Err(_) => mismatch(target, value),
                },
            }
        }
        other => mismatch(target, other),
    }
}

fn to_float(value: &Value, target: ParamType) -> Result<f64> {
    match value {
        Value::F32(v) => Ok(*v as f64),
        Value::F64(v) | Value::Date(v) => Ok(*v),
        Value::Currency(v) => Ok(*v as f64 / 10_000.0),
        Value::String(s) => s.trim().parse::<f64>().or_else(|_| mismatch(target, value)),
        other => to_wide_int(other, target).map(|v| v as f64),
    }
}

fn to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                to_float(value, ParamType::Bool).map(|v| v != 0.0)
            }
        }
        other => to_float(other, ParamType::Bool).map(|v| v != 0.0),
    }
}

macro_rules! coerce_int {
    ($value:expr, $target:ident, $ty:ty) => {{
        let wide = to_wide_int(&$value, ParamType::$target)?;
        <$ty>::try_from(wide)
            .map(Value::$target)
            .map_err(|_| overflow(ParamType::$target, &$value))
    }};
}

/// Coerce a value to a declared parameter type
pub fn coerce(value: Value, target: ParamType) -> Result<Value> {
    if value.is_nothing() || target == ParamType::Any {
        return Ok(value);
    }
    match target {
        ParamType::Any => Ok(value),
        ParamType::Bool => to_bool(&value).map(Value::Bool),
        ParamType::I8 => coerce_int!(value, I8, i8),
        ParamType::U8 => coerce_int!(value, U8, u8),
        ParamType::I16 => coerce_int!(value, I16, i16),
        ParamType::U16 => coerce_int!(value, U16, u16),
        ParamType::I32 => coerce_int!(value, I32, i32),
        ParamType::U32 => coerce_int!(value, U32, u32),
        ParamType::I64 => coerce_int!(value, I64, i64),
        ParamType::U64 => coerce_int!(value, U64, u64),
        ParamType::F32 => {
            let v = to_float(&value, target)?;
            if v.is_finite() && v.abs() > f32::MAX as f64 {
                return Err(overflow(target, &value));
            }
            Ok(Value::F32(v as f32))
        }
        ParamType::F64 => to_float(&value, target).map(Value::F64),
        ParamType::Date => to_float(&value, target).map(Value::Date),
        ParamType::Currency => match value {
            Value::Currency(v) => Ok(Value::Currency(v)),
            Value::F32(_) | Value::F64(_) | Value::Date(_) | Value::String(_) => {
                let scaled = to_float(&value, target)? * 10_000.0;
                let wide = float_to_wide(scaled, target, &value)?;
                i64::try_from(wide)
                    .map(Value::Currency)
                    .map_err(|_| overflow(target, &value))
            }
            other => {
                let wide = to_wide_int(&other, target)?;
                wide.checked_mul(10_000)
                    .and_then(|v| i64::try_from(v).ok())
                    .map(Value::Currency)
                    .ok_or_else(|| overflow(target, &other))
            }
        },
        ParamType::SCode => match value {
            Value::SCode(v) => Ok(Value::SCode(v)),
            Value::U32(v) => Ok(Value::SCode(v as i32)),
            other => match coerce_int!(other, I32, i32)? {
                Value::I32(v) => Ok(Value::SCode(v)),
                converted => mismatch(target, &converted),
            },
        },
        ParamType::String => match value {
            Value::String(s) => Ok(Value::String(s)),
            Value::Bytes(_) | Value::Dispatch(_) | Value::Unknown(_) | Value::Variant(_) => {
                mismatch(target, &value)
            }
            other => Ok(Value::String(other.to_string())),
        },
        ParamType::Bytes => match value {
            Value::Bytes(b) => Ok(Value::Bytes(b)),
            other => mismatch(target, &other),
        },
        ParamType::Dispatch => match value {
            Value::Dispatch(d) => Ok(Value::Dispatch(d)),
            Value::Unknown(unknown) => DispatchProxy::from_unknown(&unknown).map(Value::Dispatch),
            other => mismatch(target, &other),
        },
        ParamType::Unknown => match value {
            Value::Unknown(u) => Ok(Value::Unknown(u)),
            Value::Dispatch(d) => Ok(Value::Unknown(d.into_unknown())),
            other => mismatch(target, &other),
        },
        ParamType::Variant => match value {
            Value::Variant(v) => Ok(Value::Variant(v)),
            other => mismatch(target, &other),
        },
    }
}
