//! COM initialization of the calling thread
//!
//! Objects that receive native calls assume the caller already initialized
//! COM on its thread. [`ApartmentGuard`] enters an apartment for the lifetime
//! of the guard and [`com_is_initialized`] reports whether the current thread
//! is inside one.
//!
//! On Windows this maps onto `CoInitializeEx` / `CoGetApartmentType`. On
//! other targets there is no COM runtime, so the apartment is tracked per
//! thread by this module alone.

use std::marker::PhantomData;

use crate::error::Result;

/// Apartment type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApartmentType {
    /// Multi-Threaded Apartment - concurrent call execution
    Mta,
    /// Single-Threaded Apartment - serialized call execution
    Sta,
}

/// Keeps the current thread inside a COM apartment
///
/// Guards nest: entering the same apartment type again is allowed and each
/// guard undoes exactly its own initialization. The guard is tied to the
/// thread that created it.
#[derive(Debug)]
pub struct ApartmentGuard {
    kind: ApartmentType,
    _not_send: PhantomData<*const ()>,
}

impl ApartmentGuard {
    /// Initialize COM on this thread with the given apartment type
    pub fn enter(kind: ApartmentType) -> Result<Self> {
        platform::enter(kind)?;
        tracing::trace!("entered {:?} apartment", kind);
        Ok(Self {
            kind,
            _not_send: PhantomData,
        })
    }

    pub fn apartment_type(&self) -> ApartmentType {
        self.kind
    }
}

impl Drop for ApartmentGuard {
    fn drop(&mut self) {
        platform::leave();
        tracing::trace!("left {:?} apartment", self.kind);
    }
}

/// Whether the current thread has initialized COM
pub fn com_is_initialized() -> bool {
    current_apartment().is_some()
}

/// Apartment type of the current thread, if any
pub fn current_apartment() -> Option<ApartmentType> {
    platform::current()
}

#[cfg(windows)]
mod platform {
    use super::ApartmentType;
    use crate::error::{AutomationError, HResult, Result};
    use windows::Win32::System::Com::{
        CoGetApartmentType, CoInitializeEx, CoUninitialize, APTTYPE, APTTYPEQUALIFIER,
        APTTYPE_MAINSTA, APTTYPE_MTA, APTTYPE_NA, APTTYPE_STA, COINIT_APARTMENTTHREADED,
        COINIT_MULTITHREADED,
    };

    pub(super) fn enter(kind: ApartmentType) -> Result<()> {
        let flags = match kind {
            ApartmentType::Mta => COINIT_MULTITHREADED,
            ApartmentType::Sta => COINIT_APARTMENTTHREADED,
        };
        // SAFETY: balanced by CoUninitialize in `leave` when the guard drops.
        unsafe { CoInitializeEx(None, flags) }.map_err(|e| AutomationError::Hresult {
            operation: "CoInitializeEx",
            hr: HResult(e.code().0),
        })
    }

    pub(super) fn leave() {
        // SAFETY: only called for a successful CoInitializeEx.
        unsafe { CoUninitialize() };
    }

    pub(super) fn current() -> Option<ApartmentType> {
        let mut kind = APTTYPE(0);
        let mut qualifier = APTTYPEQUALIFIER(0);
        // SAFETY: both out-pointers reference live locals.
        unsafe { CoGetApartmentType(&mut kind, &mut qualifier) }.ok()?;
        match kind {
            APTTYPE_MTA => Some(ApartmentType::Mta),
            APTTYPE_STA | APTTYPE_MAINSTA | APTTYPE_NA => Some(ApartmentType::Sta),
            _ => None,
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use super::ApartmentType;
    use crate::error::{hresult, AutomationError, Result};
    use std::cell::RefCell;

    thread_local! {
        static APARTMENT: RefCell<Option<(ApartmentType, usize)>> = const { RefCell::new(None) };
    }

    pub(super) fn enter(kind: ApartmentType) -> Result<()> {
        APARTMENT.with(|apartment| {
            let mut apartment = apartment.borrow_mut();
            match apartment.as_mut() {
                None => {
                    *apartment = Some((kind, 1));
                    Ok(())
                }
                Some((current, depth)) if *current == kind => {
                    *depth += 1;
                    Ok(())
                }
                Some(_) => Err(AutomationError::Hresult {
                    operation: "CoInitializeEx",
                    hr: hresult::RPC_E_CHANGED_MODE,
                }),
            }
        })
    }

    pub(super) fn leave() {
        APARTMENT.with(|apartment| {
            let mut apartment = apartment.borrow_mut();
            if let Some((_, depth)) = apartment.as_mut() {
                *depth -= 1;
                if *depth == 0 {
                    *apartment = None;
                }
            }
        });
    }

    pub(super) fn current() -> Option<ApartmentType> {
        APARTMENT.with(|apartment| apartment.borrow().map(|(kind, _)| kind))
    }
}
