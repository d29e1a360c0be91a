//! The per-node capability registry and system tags.
//!
//! A node maps each [`CapabilityKey`] to at most one unit. The unit side keeps
//! an ordered manager list holding every node that registers it under any key,
//! once. [`World::link`] and [`World::unlink`] are the only places either side
//! changes; both update the two structures before dispatching anything.
//!
//! Notification order:
//!
//! - link: `disposed_changed` (when it revives a disposed unit), then
//!   `manager_added` (first key only), then `component_added`
//! - unlink: `manager_removed` (last key only), then `component_removed`

use log::debug;
use smallvec::SmallVec;

use crate::components::capability::CapabilityKey;
use crate::entities::arena::{NodeId, UnitId};
use crate::entities::node::SystemTag;
use crate::entities::world::World;

impl World {
    // =========================================================================
    // Linking
    // =========================================================================

    /// Register `unit` on `node` under `key` (the unit's kind when `None`).
    ///
    /// `index` positions the node in the unit's manager list; `None` appends a
    /// new manager and leaves an existing one in place. Any other unit under
    /// the same key is unlinked first. Linking a disposed unit revives it.
    pub(crate) fn link(
        &mut self,
        node: NodeId,
        unit: UnitId,
        key: Option<CapabilityKey>,
        index: Option<usize>,
    ) -> bool {
        if self.live(node).is_none() {
            return self.reject("attach", "stale node");
        }
        let Some(data) = self.units.get(unit) else {
            return self.reject("attach", "stale unit");
        };
        let key = key.unwrap_or(data.kind);
        if !data.satisfies(key) {
            return self.reject("attach", "unit does not satisfy the key");
        }
        if !data.shareable && data.managers.first().is_some_and(|m| m != node) {
            return self.reject("attach", "exclusive unit already has a manager");
        }

        match self.component(node, key) {
            Some(current) if current == unit => {
                if let (Some(index), Some(data)) = (index, self.units.get_mut(unit)) {
                    data.managers.set_index(&node, index);
                }
                return true;
            }
            Some(_) => {
                self.unlink(node, key);
                // Listeners may have changed either side; start over.
                return self.link(node, unit, Some(key), index);
            }
            None => {}
        }

        let Some(node_data) = self.live_mut(node) else {
            return false;
        };
        node_data.components.push((key, unit));
        let Some(data) = self.units.get_mut(unit) else {
            return false;
        };
        let added = if data.managers.contains(&node) {
            if let Some(index) = index {
                data.managers.set_index(&node, index);
            }
            None
        } else {
            let index = index.unwrap_or(usize::MAX).min(data.managers.len());
            data.managers.insert(node, index);
            Some(index)
        };
        let revived = std::mem::replace(&mut data.disposed, false);
        debug_assert!(self.mirrors(node, unit));

        if revived {
            debug!("revived unit {unit}");
            self.emit_unit(unit, |s| &s.disposed_changed, (unit, false, true));
        }
        if let Some(index) = added {
            debug!("{unit} gained manager {node}");
            self.emit_unit(unit, |s| &s.manager_added, (unit, node, index));
        }
        self.emit_node(node, |s| &s.component_added, (node, unit, key));
        true
    }

    /// Remove the registry entry for `key` on `node`, returning its unit.
    ///
    /// Works on nodes that are mid-disposal. An unmanaged unit flagged for
    /// auto-dispose is disposed afterwards.
    pub(crate) fn unlink(&mut self, node: NodeId, key: CapabilityKey) -> Option<UnitId> {
        let node_data = self.nodes.get_mut(node)?;
        let position = node_data.components.iter().position(|(k, _)| *k == key)?;
        let (_, unit) = node_data.components.remove(position);
        let still_held = node_data.components.iter().any(|(_, u)| *u == unit);
        let removed = if still_held {
            None
        } else {
            self.units
                .get_mut(unit)
                .and_then(|data| data.managers.remove(&node))
        };
        debug_assert!(self.mirrors(node, unit));

        if let Some(index) = removed {
            debug!("{unit} lost manager {node}");
            self.emit_unit(unit, |s| &s.manager_removed, (unit, node, index));
        }
        self.emit_node(node, |s| &s.component_removed, (node, unit, key));

        let orphaned = self
            .units
            .get(unit)
            .is_some_and(|data| !data.disposed && data.auto_dispose && data.managers.is_empty());
        if removed.is_some() && orphaned {
            self.dispose_unit_inner(unit);
        }
        Some(unit)
    }

    // =========================================================================
    // Node-side registry
    // =========================================================================

    /// Register `unit` under `key` (its kind when `None`).
    pub fn attach_capability(
        &mut self,
        node: NodeId,
        unit: UnitId,
        key: Option<CapabilityKey>,
    ) -> bool {
        self.mutation(|world| world.link(node, unit, key, None))
    }

    /// Remove whatever unit is registered under `key`.
    pub fn detach_capability(&mut self, node: NodeId, key: CapabilityKey) -> Option<UnitId> {
        if self.live(node).is_none() {
            return None;
        }
        self.mutation(|world| world.unlink(node, key))
    }

    /// Remove every key under which `unit` is registered on `node`.
    pub fn detach_unit(&mut self, node: NodeId, unit: UnitId) -> bool {
        if self.live(node).is_none() {
            return false;
        }
        self.mutation(|world| world.unlink_unit(node, unit))
    }

    pub(crate) fn unlink_unit(&mut self, node: NodeId, unit: UnitId) -> bool {
        let keys: SmallVec<[CapabilityKey; 4]> = self
            .node(node)
            .map(|data| {
                data.components
                    .iter()
                    .filter(|(_, u)| *u == unit)
                    .map(|(k, _)| *k)
                    .collect()
            })
            .unwrap_or_default();
        for &key in keys.iter().rev() {
            if self.component(node, key) == Some(unit) {
                self.unlink(node, key);
            }
        }
        !keys.is_empty()
    }

    /// Remove every registry entry, last registered first.
    pub fn detach_capabilities(&mut self, node: NodeId) -> bool {
        if self.live(node).is_none() {
            return false;
        }
        self.mutation(|world| world.unlink_all(node))
    }

    pub(crate) fn unlink_all(&mut self, node: NodeId) -> bool {
        let mut any = false;
        while let Some(&(key, _)) = self.node(node).and_then(|data| data.components.last()) {
            self.unlink(node, key);
            any = true;
        }
        any
    }

    /// Unit registered under `key`.
    pub fn component(&self, node: NodeId, key: CapabilityKey) -> Option<UnitId> {
        self.node(node)?
            .components
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, u)| *u)
    }

    pub fn has_capability(&self, node: NodeId, key: CapabilityKey) -> bool {
        self.component(node, key).is_some()
    }

    /// First key under which `unit` is registered on `node`.
    pub fn capability_key_of(&self, node: NodeId, unit: UnitId) -> Option<CapabilityKey> {
        self.node(node)?
            .components
            .iter()
            .find(|(_, u)| *u == unit)
            .map(|(k, _)| *k)
    }

    /// Registry entries in registration order.
    pub fn capability_entries(&self, node: NodeId) -> Vec<(CapabilityKey, UnitId)> {
        self.node(node)
            .map(|data| data.components.to_vec())
            .unwrap_or_default()
    }

    /// Distinct units registered on `node`, in registration order.
    pub fn capabilities(&self, node: NodeId) -> Vec<UnitId> {
        let mut units = Vec::new();
        for (_, unit) in self.capability_entries(node) {
            if !units.contains(&unit) {
                units.push(unit);
            }
        }
        units
    }

    pub fn capability_count(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |data| data.components.len())
    }

    // =========================================================================
    // Systems
    // =========================================================================

    pub fn add_system(&mut self, node: NodeId, tag: SystemTag) -> bool {
        let Some(data) = self.live_mut(node) else {
            return false;
        };
        if !data.systems.insert(tag) {
            return false;
        }
        self.emit_node(node, |s| &s.system_added, (node, tag));
        true
    }

    pub fn remove_system(&mut self, node: NodeId, tag: SystemTag) -> bool {
        let Some(data) = self.live_mut(node) else {
            return false;
        };
        if !data.systems.remove(&tag) {
            return false;
        }
        self.emit_node(node, |s| &s.system_removed, (node, tag));
        true
    }

    pub fn has_system(&self, node: NodeId, tag: SystemTag) -> bool {
        self.node(node).is_some_and(|data| data.systems.contains(&tag))
    }

    /// System tags, sorted by name.
    pub fn systems(&self, node: NodeId) -> Vec<SystemTag> {
        let mut tags: Vec<SystemTag> = self
            .node(node)
            .map(|data| data.systems.iter().copied().collect())
            .unwrap_or_default();
        tags.sort();
        tags
    }

    pub fn remove_systems(&mut self, node: NodeId) -> bool {
        let tags = self.systems(node);
        let mut any = false;
        for tag in tags {
            any |= self.remove_system(node, tag);
        }
        any
    }
}
