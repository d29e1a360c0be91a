//! The [`World`]: owner of every node and capability unit.
//!
//! Nodes and units live in two generational [`Arena`]s. All cross references
//! (parent, children, registry entries, managers) are handles, so the graph
//! can be mutated freely while notifications are being dispatched: listeners
//! receive `&mut World` and may reparent, attach, detach or dispose anything,
//! including the subject of the notification they are handling.
//!
//! Operations are spread over several modules, each adding an `impl World`
//! block:
//!
//! - [`node`](super::node) – naming, engine membership, parenting, child order
//! - [`sleep`](super::sleep) – reference-counted sleep and its propagation
//! - [`registry`](super::registry) – the per-node capability registry and system tags
//! - [`dispose`](super::dispose) – node disposal
//! - [`unit`](crate::components::unit) – capability unit attach/detach/dispose
//! - [`dump`](crate::systems::dump) – diagnostics
//!
//! Failures (stale handles, cycles, exclusivity violations, ...) are reported
//! as `false` / `None`; nothing here panics on bad input.

use std::rc::Rc;

use log::debug;

use crate::components::capability::{CapabilityKey, CapabilityTable};
use crate::components::unit::UnitData;
use crate::entities::arena::{Arena, NodeId, UnitId};
use crate::entities::node::NodeData;
use crate::events::node::{NodeSignal, NodeSignals};
use crate::events::unit::{UnitSignal, UnitSignals};
use crate::resources::engine::Engine;
use crate::resources::graphconfig::GraphConfig;

/// Owner of the node and unit arenas.
pub struct World {
    pub(crate) nodes: Arena<NodeId, NodeData>,
    pub(crate) units: Arena<UnitId, UnitData>,
    pub(crate) capabilities: CapabilityTable,
    pub(crate) engine: Option<Rc<dyn Engine>>,
    pub(crate) config: GraphConfig,
    depth: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: Arena::new(),
            units: Arena::new(),
            capabilities: CapabilityTable::new(),
            engine: None,
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GraphConfig {
        &mut self.config
    }

    // =========================================================================
    // Engine collaborator
    // =========================================================================

    /// Install (or remove) the engine consulted for roots, names and membership.
    pub fn set_engine(&mut self, engine: Option<Rc<dyn Engine>>) {
        self.engine = engine;
    }

    pub fn engine(&self) -> Option<&Rc<dyn Engine>> {
        self.engine.as_ref()
    }

    // =========================================================================
    // Capability keys
    // =========================================================================

    /// Key for `name`, registering it on first use.
    pub fn capability(&mut self, name: impl AsRef<str>) -> CapabilityKey {
        self.capabilities.intern(name)
    }

    /// Key for an already registered `name`.
    pub fn find_capability(&self, name: impl AsRef<str>) -> Option<CapabilityKey> {
        self.capabilities.get(name)
    }

    pub fn capability_name(&self, key: CapabilityKey) -> Option<&str> {
        self.capabilities.name(key)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Number of nodes that have not been released.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of units that have not been released, disposed ones included.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Handles of every node, in slot order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Handles of every unit, in slot order.
    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.units.keys()
    }

    /// Whether `id` refers to a node that is neither released nor being disposed.
    pub fn contains(&self, id: NodeId) -> bool {
        self.live(id).is_some()
    }

    /// Whether the node has been disposed (or is being disposed right now).
    pub fn is_disposed(&self, id: NodeId) -> bool {
        self.live(id).is_none()
    }

    /// Node storage, including nodes that are mid-disposal.
    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Node storage, excluding nodes that are mid-disposal.
    pub(crate) fn live(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).filter(|node| !node.disposing)
    }

    pub(crate) fn live_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id).filter(|node| !node.disposing)
    }

    /// Channels of a live node, for subscribing.
    pub fn node_signals_mut(&mut self, id: NodeId) -> Option<&mut NodeSignals> {
        self.live_mut(id).map(|node| &mut node.signals)
    }

    /// Channels of a unit, for subscribing. A disposed unit has fresh, empty
    /// channels, so listeners added afterwards hear it being revived.
    pub fn unit_signals_mut(&mut self, id: UnitId) -> Option<&mut UnitSignals> {
        self.units.get_mut(id).map(|unit| &mut unit.signals)
    }

    // =========================================================================
    // Notification helpers
    // =========================================================================

    /// Dispatch one of `id`'s channels against a snapshot of its listeners.
    pub(crate) fn emit_node<A>(
        &mut self,
        id: NodeId,
        pick: fn(&NodeSignals) -> &NodeSignal<A>,
        args: A,
    ) {
        let snapshot = match self.nodes.get(id) {
            Some(node) => pick(&node.signals).snapshot(),
            None => return,
        };
        if !snapshot.is_empty() {
            snapshot.dispatch(self, &args);
        }
    }

    pub(crate) fn emit_unit<A>(
        &mut self,
        id: UnitId,
        pick: fn(&UnitSignals) -> &UnitSignal<A>,
        args: A,
    ) {
        let snapshot = match self.units.get(id) {
            Some(unit) => pick(&unit.signals).snapshot(),
            None => return,
        };
        if !snapshot.is_empty() {
            snapshot.dispatch(self, &args);
        }
    }

    /// Run a structural mutation, validating the whole graph once the
    /// outermost call returns when `check_invariants` is configured.
    pub(crate) fn mutation<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        if cfg!(debug_assertions) && self.depth == 0 && self.config.check_invariants {
            let checked = self.check_invariants();
            debug_assert!(checked.is_ok(), "graph invariant broken: {checked:?}");
        }
        result
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    /// Whether `node`'s registry and `unit`'s manager list agree about the pair.
    pub(crate) fn mirrors(&self, node: NodeId, unit: UnitId) -> bool {
        let registered = self
            .nodes
            .get(node)
            .is_some_and(|data| data.components.iter().any(|(_, u)| *u == unit));
        let managed = self
            .units
            .get(unit)
            .is_some_and(|data| data.managers.contains(&node));
        registered == managed
    }

    /// Validate every structural invariant of the graph.
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (id, node) in self.nodes.iter() {
            if let Some(parent) = node.parent {
                let Some(parent_node) = self.nodes.get(parent) else {
                    return Err(format!("{id:?} points at missing parent {parent:?}"));
                };
                if !parent_node.children.contains(&id) {
                    return Err(format!("{id:?} is not among the children of {parent:?}"));
                }
                if parent_node.child_names.get(&node.local_name) != Some(&id) {
                    return Err(format!(
                        "{parent:?} does not index {id:?} under '{}'",
                        node.local_name
                    ));
                }
            }
            if node.child_names.len() != node.children.len() {
                return Err(format!("{id:?} child name index is out of sync"));
            }
            for child in node.children.iter() {
                match self.nodes.get(child) {
                    Some(child_node) if child_node.parent == Some(id) => {}
                    _ => return Err(format!("{child:?} listed under {id:?} without parenting it")),
                }
            }

            let mut steps = 0;
            let mut current = node.parent;
            while let Some(ancestor) = current {
                if ancestor == id || steps > self.nodes.len() {
                    return Err(format!("{id:?} is its own ancestor"));
                }
                steps += 1;
                current = self.nodes.get(ancestor).and_then(|a| a.parent);
            }

            for (index, (key, unit)) in node.components.iter().enumerate() {
                if node.components[..index].iter().any(|(k, _)| k == key) {
                    return Err(format!("{id:?} registers {key:?} twice"));
                }
                let Some(unit_data) = self.units.get(*unit) else {
                    return Err(format!("{id:?} registers missing {unit:?}"));
                };
                if !unit_data.managers.contains(&id) {
                    return Err(format!("{unit:?} does not list manager {id:?}"));
                }
                if !unit_data.satisfies(*key) {
                    return Err(format!("{unit:?} does not satisfy {key:?}"));
                }
            }
        }

        for (id, unit) in self.units.iter() {
            if !unit.shareable && unit.managers.len() > 1 {
                return Err(format!("exclusive {id:?} has {} managers", unit.managers.len()));
            }
            if unit.disposed && !unit.managers.is_empty() {
                return Err(format!("disposed {id:?} still has managers"));
            }
            for manager in unit.managers.iter() {
                if !self.mirrors(manager, id) {
                    return Err(format!("{manager:?} manages {id:?} without registering it"));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn reject(&self, operation: &str, reason: &str) -> bool {
        debug!("{operation} rejected: {reason}");
        false
    }
}
