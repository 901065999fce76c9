//! OLE Automation types for COM event delivery
//!
//! This crate provides the native building blocks shared by COM automation
//! clients and servers, laid out bit-compatibly with the Windows ABI:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Typed values (this crate)                  │
//! │   Value / ParamType / FromValue   │   ValueConverter        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Native records                   │  Object references      │
//! │  - VARIANT, BSTR, SAFEARRAY       │  - IUnknown / IDispatch │
//! │  - DISPPARAMS, EXCEPINFO          │    vtables              │
//! │  - GUID, HRESULT, DISPID          │  - ComPtr, DispatchProxy│
//! ├─────────────────────────────────────────────────────────────┤
//! │        Apartment (COM initialization of the current thread) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`guid`]: GUID/IID values and well-known interface IDs
//! - [`variant`]: VARIANT cells and VARTYPE tags
//! - [`bstr`]: length-prefixed automation strings
//! - [`safearray`]: one-dimensional SAFEARRAY support
//! - [`dispparams`]: DISPPARAMS, EXCEPINFO and DISPID
//! - [`object`]: vtables and reference-counted object pointers
//! - [`value`]: converted values and declared parameter types
//! - [`convert`]: VARIANT to [`Value`] conversion
//! - [`apartment`]: COM threading model of the calling thread

pub mod apartment;
pub mod bstr;
pub mod convert;
pub mod dispparams;
pub mod guid;
pub mod object;
pub mod safearray;
pub mod value;
pub mod variant;

mod error;

pub use apartment::{com_is_initialized, ApartmentGuard, ApartmentType};
pub use bstr::Bstr;
pub use convert::{StandardConverter, ValueConverter};
pub use dispparams::{dispatch_flags, DispId, DispParams, ExcepInfo, Lcid, LOCALE_USER_DEFAULT};
pub use error::{hresult, AutomationError, HResult, Result};
pub use guid::{iid, Guid};
pub use object::{ComPtr, DispatchProxy, IDispatchVtbl, IUnknownVtbl};
pub use safearray::{SafeArray, SafeArrayBound, SafeByteArray};
pub use value::{lend_cells, FromValue, NativeVariant, ParamType, Value};
pub use variant::{VarType, Variant, VariantData};
