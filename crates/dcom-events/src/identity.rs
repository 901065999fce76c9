//! Interface identity of a sink

use automation::Guid;

use crate::error::{EventSinkError, Result};
use crate::interface::EventInterface;

/// Interface ID declared by `interface`
///
/// Fails when the ID is missing, blank, or not a GUID.
pub fn resolve_interface_id<L>(interface: &EventInterface<L>) -> Result<Guid> {
    let declared = interface
        .iid()
        .map(str::trim)
        .filter(|iid| !iid.is_empty())
        .ok_or_else(|| EventSinkError::MissingInterfaceId {
            interface: interface.name().to_string(),
        })?;

    Guid::parse(declared).map_err(|source| EventSinkError::InvalidInterfaceId {
        interface: interface.name().to_string(),
        source,
    })
}
