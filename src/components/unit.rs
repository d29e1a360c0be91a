//! Capability units.
//!
//! A unit is a unit of behavior or data attached to nodes through their
//! registries. It has one concrete kind, may satisfy further capability keys,
//! and carries an optional payload of any `'static` type.
//!
//! - *Exclusive* units (the default) have at most one manager.
//! - *Shareable* units may be managed by any number of nodes; the manager list
//!   keeps the order in which they were added (or were later moved to).
//!
//! A unit whose last manager leaves is disposed when its auto-dispose flag is
//! set. Disposing a managed unit detaches it from every manager first.
//!
//! # Example
//!
//! ```ignore
//! let transform = world.capability("Transform");
//! let unit = world.create_unit(UnitSpec::new(transform).with_payload(Transform2D::default()));
//! world.attach(unit, node, None, None);
//! world.unit_payload_mut::<Transform2D>(unit).unwrap().x = 10.0;
//! ```

use std::any::Any;
use std::fmt;

use log::debug;
use smallvec::{SmallVec, smallvec};

use crate::collections::OrderedList;
use crate::components::capability::CapabilityKey;
use crate::entities::arena::{NodeId, UnitId};
use crate::entities::world::World;
use crate::events::unit::UnitSignals;

/// Description of a unit to create.
pub struct UnitSpec {
    kind: CapabilityKey,
    satisfies: SmallVec<[CapabilityKey; 4]>,
    shareable: bool,
    auto_dispose: Option<bool>,
    payload: Option<Box<dyn Any>>,
}

impl UnitSpec {
    pub fn new(kind: CapabilityKey) -> Self {
        Self {
            kind,
            satisfies: smallvec![kind],
            shareable: false,
            auto_dispose: None,
            payload: None,
        }
    }

    /// Allow any number of managers.
    pub fn shareable(mut self) -> Self {
        self.shareable = true;
        self
    }

    /// Also register under `key`.
    pub fn satisfies(mut self, key: CapabilityKey) -> Self {
        if !self.satisfies.contains(&key) {
            self.satisfies.push(key);
        }
        self
    }

    /// Override the configured auto-dispose default.
    pub fn auto_dispose(mut self, value: bool) -> Self {
        self.auto_dispose = Some(value);
        self
    }

    pub fn with_payload<T: Any>(mut self, payload: T) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }
}

/// Storage for one unit.
pub struct UnitData {
    pub(crate) kind: CapabilityKey,
    pub(crate) satisfies: SmallVec<[CapabilityKey; 4]>,
    pub(crate) shareable: bool,
    pub(crate) auto_dispose: bool,
    pub(crate) disposed: bool,
    pub(crate) managers: OrderedList<NodeId>,
    pub(crate) payload: Option<Box<dyn Any>>,
    pub(crate) signals: UnitSignals,
}

impl UnitData {
    pub(crate) fn satisfies(&self, key: CapabilityKey) -> bool {
        self.satisfies.contains(&key)
    }
}

impl fmt::Debug for UnitData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitData")
            .field("kind", &self.kind)
            .field("satisfies", &self.satisfies)
            .field("shareable", &self.shareable)
            .field("auto_dispose", &self.auto_dispose)
            .field("disposed", &self.disposed)
            .field("managers", &self.managers)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

impl World {
    // =========================================================================
    // Creation and properties
    // =========================================================================

    pub fn create_unit(&mut self, spec: UnitSpec) -> UnitId {
        let id = self.units.insert(UnitData {
            kind: spec.kind,
            satisfies: spec.satisfies,
            shareable: spec.shareable,
            auto_dispose: spec.auto_dispose.unwrap_or(self.config.unit_auto_dispose),
            disposed: false,
            managers: OrderedList::new(),
            payload: spec.payload,
            signals: UnitSignals::default(),
        });
        debug!("created unit {id}");
        id
    }

    /// Whether `id` names a unit that has not been disposed.
    pub fn contains_unit(&self, id: UnitId) -> bool {
        self.units.get(id).is_some_and(|unit| !unit.disposed)
    }

    pub fn is_unit_disposed(&self, id: UnitId) -> bool {
        !self.contains_unit(id)
    }

    pub fn unit_kind(&self, id: UnitId) -> Option<CapabilityKey> {
        self.units.get(id).map(|unit| unit.kind)
    }

    /// Whether the unit can be registered under `key`.
    pub fn unit_satisfies(&self, id: UnitId, key: CapabilityKey) -> bool {
        self.units.get(id).is_some_and(|unit| unit.satisfies(key))
    }

    pub fn is_shareable(&self, id: UnitId) -> bool {
        self.units.get(id).is_some_and(|unit| unit.shareable)
    }

    pub fn unit_auto_dispose(&self, id: UnitId) -> bool {
        self.units.get(id).is_some_and(|unit| unit.auto_dispose)
    }

    /// Set the auto-dispose flag. Enabling it on an unmanaged unit disposes it.
    pub fn set_unit_auto_dispose(&mut self, id: UnitId, value: bool) -> bool {
        let Some(unit) = self.units.get_mut(id).filter(|unit| !unit.disposed) else {
            return false;
        };
        if unit.auto_dispose == value {
            return false;
        }
        unit.auto_dispose = value;
        if value && unit.managers.is_empty() {
            self.dispose_unit(id);
        }
        true
    }

    pub fn unit_payload<T: Any>(&self, id: UnitId) -> Option<&T> {
        self.units.get(id)?.payload.as_ref()?.downcast_ref()
    }

    pub fn unit_payload_mut<T: Any>(&mut self, id: UnitId) -> Option<&mut T> {
        self.units.get_mut(id)?.payload.as_mut()?.downcast_mut()
    }

    /// Replace the payload, returning the previous one.
    pub fn set_unit_payload<T: Any>(&mut self, id: UnitId, payload: T) -> Option<Box<dyn Any>> {
        let unit = self.units.get_mut(id)?;
        unit.payload.replace(Box::new(payload))
    }

    // =========================================================================
    // Managers
    // =========================================================================

    /// Managers in order.
    pub fn managers(&self, id: UnitId) -> Vec<NodeId> {
        self.units
            .get(id)
            .map(|unit| unit.managers.to_vec())
            .unwrap_or_default()
    }

    pub fn manager_count(&self, id: UnitId) -> usize {
        self.units.get(id).map_or(0, |unit| unit.managers.len())
    }

    /// The single manager of a unit managed by exactly one node.
    pub fn manager(&self, id: UnitId) -> Option<NodeId> {
        let unit = self.units.get(id)?;
        if unit.managers.len() == 1 {
            unit.managers.first()
        } else {
            None
        }
    }

    pub fn manager_at(&self, id: UnitId, index: usize) -> Option<NodeId> {
        self.units.get(id)?.managers.get(index)
    }

    pub fn manager_index(&self, id: UnitId, node: NodeId) -> Option<usize> {
        self.units.get(id)?.managers.index_of(&node)
    }

    pub fn has_manager(&self, id: UnitId, node: NodeId) -> bool {
        self.units
            .get(id)
            .is_some_and(|unit| unit.managers.contains(&node))
    }

    /// Move `node` to `index` in the manager list (clamped).
    pub fn set_manager_index(&mut self, id: UnitId, node: NodeId, index: usize) -> bool {
        self.units
            .get_mut(id)
            .filter(|unit| !unit.disposed)
            .is_some_and(|unit| unit.managers.set_index(&node, index))
    }

    pub fn swap_managers(&mut self, id: UnitId, a: NodeId, b: NodeId) -> bool {
        self.units
            .get_mut(id)
            .filter(|unit| !unit.disposed)
            .is_some_and(|unit| unit.managers.swap(&a, &b))
    }

    pub fn swap_managers_at(&mut self, id: UnitId, a: usize, b: usize) -> bool {
        self.units
            .get_mut(id)
            .filter(|unit| !unit.disposed)
            .is_some_and(|unit| unit.managers.swap_at(a, b))
    }

    // =========================================================================
    // Attach / detach
    // =========================================================================

    /// Add `node` as a manager at `index` (`None` appends), registering the
    /// unit under `key` (its kind when `None`).
    ///
    /// An existing manager is moved to `index` instead of being duplicated.
    pub fn attach(
        &mut self,
        id: UnitId,
        node: NodeId,
        key: Option<CapabilityKey>,
        index: Option<usize>,
    ) -> bool {
        let index = Some(index.unwrap_or(usize::MAX));
        self.mutation(|world| world.link(node, id, key, index))
    }

    /// Remove `node` as a manager, dropping every key it holds the unit under.
    pub fn detach(&mut self, id: UnitId, node: NodeId) -> bool {
        if !self.has_manager(id, node) {
            return false;
        }
        self.mutation(|world| world.unlink_unit(node, id))
    }

    /// Remove the manager at `index`, returning it.
    pub fn detach_at(&mut self, id: UnitId, index: usize) -> Option<NodeId> {
        let node = self.manager_at(id, index)?;
        self.detach(id, node).then_some(node)
    }

    /// Remove every manager, last to first.
    pub fn detach_all(&mut self, id: UnitId) -> bool {
        self.mutation(|world| world.detach_all_inner(id))
    }

    fn detach_all_inner(&mut self, id: UnitId) -> bool {
        let managers = self.managers(id);
        for &node in managers.iter().rev() {
            if self.has_manager(id, node) {
                self.unlink_unit(node, id);
            }
        }
        !managers.is_empty()
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Dispose the unit.
    ///
    /// A managed unit is flagged for auto-dispose and detached from every
    /// manager; losing the last one finalizes it. Attaching it again from a
    /// listener during that cascade keeps it alive. An unmanaged unit is
    /// finalized right away: `disposed_changed` fires once and its listeners
    /// are dropped.
    ///
    /// A disposed unit keeps its slot. Attaching it to a node revives it;
    /// [`release_unit`](Self::release_unit) frees it for good.
    pub fn dispose_unit(&mut self, id: UnitId) -> bool {
        self.mutation(|world| world.dispose_unit_inner(id))
    }

    pub(crate) fn dispose_unit_inner(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.units.get_mut(id).filter(|unit| !unit.disposed) else {
            return false;
        };
        if !unit.managers.is_empty() {
            unit.auto_dispose = true;
            self.detach_all_inner(id);
            return true;
        }
        unit.disposed = true;
        self.emit_unit(id, |s| &s.disposed_changed, (id, true, false));
        // A listener may have attached it again.
        if let Some(unit) = self.units.get_mut(id).filter(|unit| unit.disposed) {
            unit.signals.dispose();
            unit.signals = UnitSignals::default();
            debug!("disposed unit {id}");
        }
        true
    }

    /// Dispose the unit if needed and free its slot; the handle goes stale.
    ///
    /// Fails while the unit is still managed, which happens when a listener
    /// re-attaches it during disposal.
    pub fn release_unit(&mut self, id: UnitId) -> bool {
        if !self.units.contains(id) {
            return false;
        }
        self.dispose_unit(id);
        if self.units.get(id).is_some_and(|unit| !unit.disposed) {
            return self.reject("release_unit", "unit was attached again");
        }
        if let Some(mut unit) = self.units.remove(id) {
            unit.signals.dispose();
        }
        debug!("released unit {id}");
        true
    }
}
