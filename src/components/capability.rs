//! Capability keys.
//!
//! A [`CapabilityKey`] is the stable identifier a unit is registered under in
//! a node's registry. Keys are interned by name in a [`CapabilityTable`] owned
//! by the [`World`](crate::entities::world::World); the same name always maps
//! to the same key for the lifetime of the table.
//!
//! A unit has one concrete key (its kind) and may additionally satisfy other
//! keys, the way one behavior can fulfil several contracts.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Interned capability identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CapabilityKey(u32);

impl CapabilityKey {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.0)
    }
}

/// Name <-> key interning table.
#[derive(Debug, Default, Clone)]
pub struct CapabilityTable {
    names: Vec<String>,
    keys: FxHashMap<String, CapabilityKey>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for `name`, registering it on first use.
    pub fn intern(&mut self, name: impl AsRef<str>) -> CapabilityKey {
        let name = name.as_ref();
        if let Some(key) = self.keys.get(name) {
            return *key;
        }
        let key = CapabilityKey(self.names.len() as u32);
        self.names.push(name.to_owned());
        self.keys.insert(name.to_owned(), key);
        key
    }

    /// Key for an already registered `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<CapabilityKey> {
        self.keys.get(name.as_ref()).copied()
    }

    pub fn name(&self, key: CapabilityKey) -> Option<&str> {
        self.names.get(key.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
