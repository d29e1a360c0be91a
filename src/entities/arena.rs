//! Generational slot storage and the handles that address it.
//!
//! Nodes and units never hold references to each other. Parents, children and
//! managers are stored as [`NodeId`] / [`UnitId`] handles into an [`Arena`]
//! owned by the [`World`](super::world::World).
//!
//! Each handle pairs a slot index with the slot's generation. Releasing a slot
//! bumps its generation, so handles to a released object stop resolving
//! instead of aliasing whatever reuses the slot:
//!
//! ```text
//! NodeId { index: 5, generation: 0 }  <- original
//! NodeId { index: 5, generation: 1 }  <- after the slot is reused
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

/// Handle types stored in an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> u32;
    fn generation(self) -> u32;
}

macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl ArenaKey for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({}v{})"), self.index, self.generation)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}v{}", self.index, self.generation)
            }
        }
    };
}

arena_key!(
    /// Handle to a hierarchy node.
    NodeId,
    "Node"
);
arena_key!(
    /// Handle to a capability unit.
    UnitId,
    "Unit"
);

struct Entry<V> {
    generation: u32,
    value: Option<V>,
}

/// Slot storage with free-list reuse and generation checks.
pub struct Arena<K: ArenaKey, V> {
    entries: Vec<Entry<V>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Arena<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Store `value`, reusing a released slot when one is available.
    pub fn insert(&mut self, value: V) -> K {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.value = Some(value);
            K::from_parts(index, entry.generation)
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                value: Some(value),
            });
            K::from_parts(index, 0)
        }
    }

    /// Release the slot behind `key`. Stale keys return `None`.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let entry = self.entries.get_mut(key.index() as usize)?;
        if entry.generation != key.generation() {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&V> {
        let entry = self.entries.get(key.index() as usize)?;
        if entry.generation != key.generation() {
            return None;
        }
        entry.value.as_ref()
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        let entry = self.entries.get_mut(key.index() as usize)?;
        if entry.generation != key.generation() {
            return None;
        }
        entry.value.as_mut()
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handles of every occupied slot, in slot order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|_| K::from_parts(index as u32, entry.generation))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> + '_ {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry
                .value
                .as_ref()
                .map(|value| (K::from_parts(index as u32, entry.generation), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena: Arena<NodeId, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_released_handle_goes_stale() {
        let mut arena: Arena<NodeId, &str> = Arena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        assert!(!arena.contains(a));
        assert_eq!(arena.remove(a), None);

        let reused = arena.insert("c");
        assert_eq!(reused.index(), a.index());
        assert_ne!(reused.generation(), a.generation());
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(reused), Some(&"c"));
    }

    #[test]
    fn test_keys_skip_free_slots() {
        let mut arena: Arena<UnitId, u8> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let c = arena.insert(3);
        arena.remove(b);
        assert_eq!(arena.keys().collect::<Vec<_>>(), vec![a, c]);
        assert!(!arena.is_empty());
    }

    #[test]
    fn test_debug_format() {
        let mut arena: Arena<NodeId, ()> = Arena::new();
        let a = arena.insert(());
        assert_eq!(format!("{a:?}"), "Node(0v0)");
        assert_eq!(a.to_string(), "0v0");
    }
}
