//! Notifications raised by hierarchy nodes.
//!
//! Every structural or state change on a node is announced on one of the
//! channels in [`NodeSignals`]. Arguments follow two shapes:
//!
//! - `(subject, new value, previous value)` for state changes
//! - `(subject, added or removed item, position)` for collection changes
//!
//! Listeners receive `&mut World`, so renderers and schedulers can react by
//! mutating the graph directly. Subscribe through
//! [`World::node_signals_mut`](crate::entities::world::World::node_signals_mut).

use crate::components::capability::CapabilityKey;
use crate::entities::arena::{NodeId, UnitId};
use crate::entities::node::SystemTag;
use crate::entities::world::World;
use crate::events::signal::Signal;

/// Channel whose listeners get mutable access to the world.
pub type NodeSignal<A> = Signal<A, World>;

/// `(node, managed, previously managed)`
pub type EngineChanged = (NodeId, bool, bool);
/// `(node, new name, previous name)`
pub type NameChanged = (NodeId, String, String);
/// `(parent, child, index)`
pub type ChildChanged = (NodeId, NodeId, usize);
/// `(parent, first index, last index, inclusive)`.
///
/// Inclusive ranges moved every index from first to last. Exclusive ranges
/// (swaps) only moved the two end points.
pub type ChildIndicesChanged = (NodeId, usize, usize, bool);
/// `(node, new parent, previous parent)`
pub type ParentChanged = (NodeId, Option<NodeId>, Option<NodeId>);
/// `(node, new index, previous index)`; `None` while unparented.
pub type ParentIndexChanged = (NodeId, Option<usize>, Option<usize>);
/// `(node, unit, key)`
pub type ComponentChanged = (NodeId, UnitId, CapabilityKey);
/// `(node, system tag)`
pub type SystemChanged = (NodeId, SystemTag);
/// `(node, new count, previous count)`
pub type CounterChanged = (NodeId, u32, u32);

/// All channels owned by one node.
#[derive(Debug, Default)]
pub struct NodeSignals {
    pub engine_changed: NodeSignal<EngineChanged>,
    pub global_name_changed: NodeSignal<NameChanged>,
    pub local_name_changed: NodeSignal<NameChanged>,
    pub child_added: NodeSignal<ChildChanged>,
    pub child_removed: NodeSignal<ChildChanged>,
    pub child_indices_changed: NodeSignal<ChildIndicesChanged>,
    pub parent_changed: NodeSignal<ParentChanged>,
    pub parent_index_changed: NodeSignal<ParentIndexChanged>,
    pub component_added: NodeSignal<ComponentChanged>,
    pub component_removed: NodeSignal<ComponentChanged>,
    pub system_added: NodeSignal<SystemChanged>,
    pub system_removed: NodeSignal<SystemChanged>,
    pub sleeping_changed: NodeSignal<CounterChanged>,
    pub ignore_parent_sleep_changed: NodeSignal<CounterChanged>,
}

impl NodeSignals {
    /// Release every channel.
    pub fn dispose(&mut self) {
        self.engine_changed.dispose();
        self.global_name_changed.dispose();
        self.local_name_changed.dispose();
        self.child_added.dispose();
        self.child_removed.dispose();
        self.child_indices_changed.dispose();
        self.parent_changed.dispose();
        self.parent_index_changed.dispose();
        self.component_added.dispose();
        self.component_removed.dispose();
        self.system_added.dispose();
        self.system_removed.dispose();
        self.sleeping_changed.dispose();
        self.ignore_parent_sleep_changed.dispose();
    }
}
