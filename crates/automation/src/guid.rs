//! GUID values
//!
//! COM identifies interfaces and classes by 128-bit GUIDs. [`Guid`] has the
//! native `GUID` layout so a `*const Guid` can be received directly as a
//! `REFIID` argument.

use std::fmt;
use std::str::FromStr;

use crate::error::{AutomationError, Result};

/// Globally unique identifier with the native `GUID` layout
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// The all-zero GUID (`IID_NULL`)
    pub const NIL: Self = Self::from_u128(0);

    /// Build from the 128-bit big-endian value as written in IDL
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    /// Parse `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, with or without braces
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AutomationError::InvalidGuid(s.to_string()));
        }
        uuid::Uuid::parse_str(trimmed)
            .map(Self::from)
            .map_err(|_| AutomationError::InvalidGuid(s.to_string()))
    }

    /// Generate a random v4 GUID
    pub fn generate() -> Self {
        Self::from(uuid::Uuid::new_v4())
    }

    /// Check if this is the nil GUID
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Convert to a [`uuid::Uuid`]
    pub fn to_uuid(&self) -> uuid::Uuid {
        uuid::Uuid::from_fields(self.data1, self.data2, self.data3, &self.data4)
    }
}

impl From<uuid::Uuid> for Guid {
    fn from(uuid: uuid::Uuid) -> Self {
        let (data1, data2, data3, data4) = uuid.as_fields();
        Self {
            data1,
            data2,
            data3,
            data4: *data4,
        }
    }
}

impl FromStr for Guid {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GUID({})", self)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.to_uuid().hyphenated())
    }
}

/// Well-known interface IDs
pub mod iid {
    use super::Guid;

    /// IUnknown interface ID
    pub const IUNKNOWN: Guid = Guid::from_u128(0x00000000_0000_0000_c000_000000000046);
    /// IDispatch interface ID
    pub const IDISPATCH: Guid = Guid::from_u128(0x00020400_0000_0000_c000_000000000046);
    /// IConnectionPointContainer interface ID
    pub const ICONNECTIONPOINTCONTAINER: Guid =
        Guid::from_u128(0xb196b284_bab4_101a_b69c_00aa00341d07);
    /// IConnectionPoint interface ID
    pub const ICONNECTIONPOINT: Guid = Guid::from_u128(0xb196b286_bab4_101a_b69c_00aa00341d07);
}
