//! Order-preserving, duplicate-free list with positional mutation.
//!
//! [`OrderedList`] keeps its values in a doubly linked chain stored in a slab
//! (`Vec` of links plus a free list) and indexes every value to its slab slot
//! with an [`FxHashMap`]. This gives:
//!
//! - O(1) `contains`, `len`, `first`, `last`, `swap` and removal by value
//! - positional `insert` / `remove_at` / `set_index` without shifting memory
//! - `index_of` and `get` by walking the chain (from the nearer end for `get`)
//!
//! Values are unique within one list. Inserting a value that is already
//! present moves it to the requested position instead of duplicating it.
//!
//! Hierarchy nodes use it for their children (sibling order) and capability
//! units for their managers (priority among sharing nodes).

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug)]
struct Link<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Keyed ordered list. See the [module docs](self).
#[derive(Clone)]
pub struct OrderedList<T: Copy + Eq + Hash> {
    links: Vec<Link<T>>,
    free: Vec<usize>,
    slots: FxHashMap<T, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<T: Copy + Eq + Hash> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq + Hash> OrderedList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            free: Vec::new(),
            slots: FxHashMap::default(),
            head: None,
            tail: None,
        }
    }

    /// Number of values in the list.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `value` is present.
    pub fn contains(&self, value: &T) -> bool {
        self.slots.contains_key(value)
    }

    pub fn first(&self) -> Option<T> {
        self.head.map(|slot| self.links[slot].value)
    }

    pub fn last(&self) -> Option<T> {
        self.tail.map(|slot| self.links[slot].value)
    }

    /// Value at `index`, walking from whichever end is closer.
    pub fn get(&self, index: usize) -> Option<T> {
        self.slot_at(index).map(|slot| self.links[slot].value)
    }

    /// Position of `value`, or `None` when absent.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        let target = *self.slots.get(value)?;
        let mut current = self.head;
        let mut index = 0;
        while let Some(slot) = current {
            if slot == target {
                return Some(index);
            }
            index += 1;
            current = self.links[slot].next;
        }
        None
    }

    /// Insert `value` at `index` (clamped to `[0, len]`).
    ///
    /// If the value is already present it is moved to `index` instead (clamped
    /// to `[0, len - 1]`). Always succeeds.
    pub fn insert(&mut self, value: T, index: usize) -> bool {
        if self.contains(&value) {
            return self.set_index(&value, index);
        }
        let index = index.min(self.len());
        let before = self.slot_at(index);
        let slot = self.allocate(value);
        self.link_before(slot, before);
        self.slots.insert(value, slot);
        true
    }

    /// Append `value` (or move it to the end if already present).
    pub fn push(&mut self, value: T) -> bool {
        let len = self.len();
        self.insert(value, len)
    }

    /// Remove `value`, returning the index it occupied.
    pub fn remove(&mut self, value: &T) -> Option<usize> {
        let index = self.index_of(value)?;
        let slot = self.slots.remove(value)?;
        self.unlink(slot);
        self.free.push(slot);
        Some(index)
    }

    /// Remove the value at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let slot = self.slot_at(index)?;
        let value = self.links[slot].value;
        self.slots.remove(&value);
        self.unlink(slot);
        self.free.push(slot);
        Some(value)
    }

    /// Move an existing `value` to `index` (clamped to `[0, len - 1]`).
    ///
    /// Other values keep their relative order. Returns `false` when the value
    /// is absent.
    pub fn set_index(&mut self, value: &T, index: usize) -> bool {
        let Some(&slot) = self.slots.get(value) else {
            return false;
        };
        let chain_len = self.len() - 1;
        let index = index.min(chain_len);
        self.unlink(slot);
        // The chain is one shorter now, so `index` names the slot to precede.
        let before = self.walk(index, chain_len);
        self.link_before(slot, before);
        true
    }

    /// Exchange the positions of two present values.
    pub fn swap(&mut self, a: &T, b: &T) -> bool {
        let (Some(&slot_a), Some(&slot_b)) = (self.slots.get(a), self.slots.get(b)) else {
            return false;
        };
        if slot_a == slot_b {
            return true;
        }
        self.links[slot_a].value = *b;
        self.links[slot_b].value = *a;
        self.slots.insert(*a, slot_b);
        self.slots.insert(*b, slot_a);
        true
    }

    /// Exchange the values at two positions.
    pub fn swap_at(&mut self, a: usize, b: usize) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(value_a), Some(value_b)) => self.swap(&value_a, &value_b),
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.free.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate values front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    /// Copy the values out, front to back.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    fn slot_at(&self, index: usize) -> Option<usize> {
        self.walk(index, self.len())
    }

    /// Slot at `index` in a chain currently holding `len` links.
    fn walk(&self, index: usize, len: usize) -> Option<usize> {
        if index >= len {
            return None;
        }
        if index <= len / 2 {
            let mut current = self.head;
            for _ in 0..index {
                current = current.and_then(|slot| self.links[slot].next);
            }
            current
        } else {
            let mut current = self.tail;
            for _ in 0..(len - 1 - index) {
                current = current.and_then(|slot| self.links[slot].prev);
            }
            current
        }
    }

    fn allocate(&mut self, value: T) -> usize {
        let link = Link {
            value,
            prev: None,
            next: None,
        };
        if let Some(slot) = self.free.pop() {
            self.links[slot] = link;
            slot
        } else {
            self.links.push(link);
            self.links.len() - 1
        }
    }

    /// Splice `slot` in front of `before`, or at the tail when `before` is `None`.
    fn link_before(&mut self, slot: usize, before: Option<usize>) {
        match before {
            Some(next) => {
                let prev = self.links[next].prev;
                self.links[slot].prev = prev;
                self.links[slot].next = Some(next);
                self.links[next].prev = Some(slot);
                match prev {
                    Some(prev) => self.links[prev].next = Some(slot),
                    None => self.head = Some(slot),
                }
            }
            None => {
                self.links[slot].prev = self.tail;
                self.links[slot].next = None;
                match self.tail {
                    Some(tail) => self.links[tail].next = Some(slot),
                    None => self.head = Some(slot),
                }
                self.tail = Some(slot);
            }
        }
    }

    fn unlink(&mut self, slot: usize) {
        let Link { prev, next, .. } = self.links[slot];
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.tail = prev,
        }
        self.links[slot].prev = None;
        self.links[slot].next = None;
    }
}

impl<T: Copy + Eq + Hash + fmt::Debug> fmt::Debug for OrderedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Front-to-back iterator over an [`OrderedList`].
pub struct Iter<'a, T: Copy + Eq + Hash> {
    list: &'a OrderedList<T>,
    current: Option<usize>,
}

impl<T: Copy + Eq + Hash> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let slot = self.current?;
        let link = &self.list.links[slot];
        self.current = link.next;
        Some(link.value)
    }
}

impl<'a, T: Copy + Eq + Hash> IntoIterator for &'a OrderedList<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(values: &[u32]) -> OrderedList<u32> {
        let mut list = OrderedList::new();
        for v in values {
            list.push(*v);
        }
        list
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut list = list_of(&[1, 2]);
        assert!(list.insert(3, 99));
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
        assert!(list.insert(0, 0));
        assert_eq!(list.to_vec(), vec![0, 1, 2, 3]);
        assert_eq!(list.first(), Some(0));
        assert_eq!(list.last(), Some(3));
    }

    #[test]
    fn test_reinsert_repositions_without_duplicate() {
        let mut list = list_of(&[1, 2, 3]);
        assert!(list.insert(3, 0));
        assert_eq!(list.to_vec(), vec![3, 1, 2]);
        assert_eq!(list.len(), 3);
        assert!(list.push(3));
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_index_of_tracks_order() {
        let mut list = list_of(&[10, 20, 30, 40]);
        assert_eq!(list.index_of(&30), Some(2));
        assert_eq!(list.index_of(&99), None);
        list.remove(&20);
        assert_eq!(list.index_of(&30), Some(1));
        assert_eq!(list.index_of(&40), Some(2));
        assert_eq!(list.get(2), Some(40));
        assert_eq!(list.get(3), None);
    }

    #[test]
    fn test_remove_at_and_remove() {
        let mut list = list_of(&[1, 2, 3]);
        assert_eq!(list.remove_at(1), Some(2));
        assert_eq!(list.remove_at(5), None);
        assert_eq!(list.remove(&3), Some(1));
        assert_eq!(list.remove(&3), None);
        assert_eq!(list.to_vec(), vec![1]);
        assert!(!list.contains(&2));
    }

    #[test]
    fn test_set_index_moves_forward_and_back() {
        let mut list = list_of(&[1, 2, 3, 4]);
        assert!(list.set_index(&1, 2));
        assert_eq!(list.to_vec(), vec![2, 3, 1, 4]);
        assert!(list.set_index(&4, 0));
        assert_eq!(list.to_vec(), vec![4, 2, 3, 1]);
        assert!(list.set_index(&2, 100));
        assert_eq!(list.to_vec(), vec![4, 3, 1, 2]);
        assert!(!list.set_index(&9, 0));
    }

    #[test]
    fn test_swap_keeps_other_order() {
        let mut list = list_of(&[1, 2, 3, 4]);
        assert!(list.swap(&1, &4));
        assert_eq!(list.to_vec(), vec![4, 2, 3, 1]);
        assert!(list.swap_at(1, 2));
        assert_eq!(list.to_vec(), vec![4, 3, 2, 1]);
        assert_eq!(list.index_of(&1), Some(3));
        assert!(!list.swap_at(0, 9));
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = list_of(&[1, 2, 3]);
        list.remove(&2);
        list.insert(5, 1);
        assert_eq!(list.to_vec(), vec![1, 5, 3]);
        assert_eq!(list.links.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut list = list_of(&[1, 2]);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
        assert_eq!(list.iter().count(), 0);
    }
}
