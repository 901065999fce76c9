//! DISPID to callback mapping
//!
//! Built once per sink from the callbacks declared on an [`EventInterface`]
//! and read-only afterwards, so concurrent dispatches need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use automation::DispId;

use crate::interface::{DispIdTag, EventInterface, EventMethod};

/// Resolves DISPIDs for callbacks declared by name
pub trait DispIdResolver: Send + Sync {
    /// DISPID of `method` on `interface`, or [`DispId::UNKNOWN`]
    fn resolve(&self, interface: &str, method: &str) -> DispId;
}

/// Resolver that resolves nothing
///
/// Event sources do not have to expose type information, so by-name
/// callbacks stay at `DISPID_UNKNOWN` unless a resolver is supplied.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnresolvedNames;

impl DispIdResolver for UnresolvedNames {
    fn resolve(&self, _interface: &str, _method: &str) -> DispId {
        DispId::UNKNOWN
    }
}

impl<F> DispIdResolver for F
where
    F: Fn(&str, &str) -> DispId + Send + Sync,
{
    fn resolve(&self, interface: &str, method: &str) -> DispId {
        self(interface, method)
    }
}

/// DISPID to callback table
pub struct DispIdMap<L> {
    entries: HashMap<DispId, Arc<EventMethod<L>>>,
}

impl<L> DispIdMap<L> {
    /// Build the table for `interface`
    ///
    /// Duplicate DISPIDs are not rejected: the callback declared last wins.
    pub fn build(interface: &EventInterface<L>, resolver: &dyn DispIdResolver) -> Self {
        let mut entries = HashMap::with_capacity(interface.methods().len());

        for method in interface.methods() {
            let dispid = match method.tag() {
                DispIdTag::Explicit(dispid) => dispid,
                DispIdTag::ByName => {
                    let dispid = resolver.resolve(interface.name(), method.name());
                    if dispid.is_unknown() {
                        tracing::warn!(
                            "{}::{}: DISPID could not be resolved by name, registered as {}",
                            interface.name(),
                            method.name(),
                            dispid
                        );
                    }
                    dispid
                }
            };

            if let Some(previous) = entries.insert(dispid, method.clone()) {
                tracing::warn!(
                    "{}: DISPID {} declared by both {} and {}, keeping {}",
                    interface.name(),
                    dispid,
                    previous.name(),
                    method.name(),
                    method.name()
                );
            }
        }

        Self { entries }
    }

    /// Callback registered for `dispid`
    pub fn get(&self, dispid: DispId) -> Option<&Arc<EventMethod<L>>> {
        self.entries.get(&dispid)
    }

    pub fn contains(&self, dispid: DispId) -> bool {
        self.entries.contains_key(&dispid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered DISPIDs in ascending order
    pub fn dispids(&self) -> Vec<DispId> {
        let mut ids: Vec<DispId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}
