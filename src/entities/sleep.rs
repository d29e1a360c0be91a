//! Reference-counted sleep.
//!
//! A node's `sleeping` counter is the number of reasons it is asleep: its own
//! requests plus one inherited from a sleeping parent. When the counter crosses
//! between zero and positive, every child that does not ignore parent sleep
//! gains or loses one, recursively. Counters saturate at zero.
//!
//! Counter updates for a whole subtree are applied before any
//! `sleeping_changed` is dispatched, parents first.

use smallvec::SmallVec;

use crate::entities::arena::NodeId;
use crate::entities::world::World;

/// Pending `(node, new, previous)` sleep notifications.
pub(crate) type SleepChanges = SmallVec<[(NodeId, u32, u32); 8]>;

impl World {
    /// Raw sleep counter.
    pub fn sleeping(&self, id: NodeId) -> u32 {
        self.node(id).map_or(0, |node| node.sleeping)
    }

    pub fn is_sleeping(&self, id: NodeId) -> bool {
        self.sleeping(id) > 0
    }

    /// Sleep requests made on this node itself, excluding the one inherited
    /// from its parent.
    pub fn own_sleeping(&self, id: NodeId) -> u32 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        let parent_sleeping = node.parent.is_some_and(|p| self.is_sleeping(p));
        if node.inherits_sleep(parent_sleeping) {
            node.sleeping.saturating_sub(1)
        } else {
            node.sleeping
        }
    }

    pub fn is_self_sleeping(&self, id: NodeId) -> bool {
        self.own_sleeping(id) > 0
    }

    /// Set the raw counter, propagating a zero crossing to the subtree.
    pub fn set_sleeping(&mut self, id: NodeId, value: u32) -> bool {
        self.mutation(|world| {
            if world.live(id).is_none_or(|node| node.sleeping == value) {
                return false;
            }
            let mut changes = SleepChanges::new();
            world.apply_sleep(id, value, &mut changes);
            world.emit_sleep_changes(changes);
            true
        })
    }

    /// Add one sleep request.
    pub fn sleep(&mut self, id: NodeId) -> bool {
        let value = self.sleeping(id).saturating_add(1);
        self.set_sleeping(id, value)
    }

    /// Withdraw one sleep request.
    pub fn wake(&mut self, id: NodeId) -> bool {
        match self.sleeping(id) {
            0 => false,
            value => self.set_sleeping(id, value - 1),
        }
    }

    pub fn ignore_parent_sleep(&self, id: NodeId) -> u32 {
        self.node(id).map_or(0, |node| node.ignore_parent_sleep)
    }

    pub fn is_ignoring_parent_sleep(&self, id: NodeId) -> bool {
        self.ignore_parent_sleep(id) > 0
    }

    /// Set the ignore-parent-sleep counter.
    ///
    /// When the counter crosses zero under a sleeping parent, the sleep
    /// inherited from that parent is removed or restored.
    pub fn set_ignore_parent_sleep(&mut self, id: NodeId, value: u32) -> bool {
        self.mutation(|world| {
            let Some(node) = world.live_mut(id) else {
                return false;
            };
            if node.ignore_parent_sleep == value {
                return false;
            }
            let previous = std::mem::replace(&mut node.ignore_parent_sleep, value);
            let flipped = (previous > 0) != (value > 0);
            let parent = node.parent;
            let mut changes = SleepChanges::new();
            if flipped && parent.is_some_and(|p| world.is_sleeping(p)) {
                let delta = if value > 0 { -1 } else { 1 };
                world.adjust_sleep(id, delta, &mut changes);
            }
            world.emit_node(id, |s| &s.ignore_parent_sleep_changed, (id, value, previous));
            world.emit_sleep_changes(changes);
            true
        })
    }

    /// Increment the ignore-parent-sleep counter.
    pub fn ignore_sleep(&mut self, id: NodeId) -> bool {
        let value = self.ignore_parent_sleep(id).saturating_add(1);
        self.set_ignore_parent_sleep(id, value)
    }

    /// Decrement the ignore-parent-sleep counter.
    pub fn heed_sleep(&mut self, id: NodeId) -> bool {
        match self.ignore_parent_sleep(id) {
            0 => false,
            value => self.set_ignore_parent_sleep(id, value - 1),
        }
    }

    /// Shift the counter by one, saturating at zero.
    pub(crate) fn adjust_sleep(&mut self, id: NodeId, delta: i32, changes: &mut SleepChanges) {
        let current = self.sleeping(id);
        let value = if delta < 0 {
            current.saturating_sub(1)
        } else {
            current.saturating_add(1)
        };
        self.apply_sleep(id, value, changes);
    }

    /// Silently write the counter, cascading zero crossings to the subtree.
    fn apply_sleep(&mut self, id: NodeId, value: u32, changes: &mut SleepChanges) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.sleeping == value {
            return;
        }
        let previous = std::mem::replace(&mut node.sleeping, value);
        changes.push((id, value, previous));
        if (previous > 0) == (value > 0) {
            return;
        }
        let children: SmallVec<[NodeId; 8]> = node.children.iter().collect();
        for child in children {
            if self.is_ignoring_parent_sleep(child) {
                continue;
            }
            let delta = if value > 0 { 1 } else { -1 };
            self.adjust_sleep(child, delta, changes);
        }
    }

    pub(crate) fn emit_sleep_changes(&mut self, changes: SleepChanges) {
        for (id, value, previous) in changes {
            self.emit_node(id, |s| &s.sleeping_changed, (id, value, previous));
        }
    }
}
