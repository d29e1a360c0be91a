//! Node disposal.
//!
//! Disposing an engine-managed node only detaches it and marks it for
//! auto-dispose; the node is released once the engine lets go of it
//! ([`World::detach_engine`]). Any other node is finalized immediately:
//!
//! 1. its children are disposed, last to first
//! 2. its registry is emptied, last entry first
//! 3. it is detached from its parent
//! 4. its channels are disposed and its slot is released
//!
//! While this runs the node counts as disposed: public operations on it fail,
//! and its handle goes stale when the slot is released.

use log::debug;
use smallvec::SmallVec;

use crate::entities::arena::NodeId;
use crate::entities::world::World;

impl World {
    /// Dispose the node and its subtree, or defer it while engine-managed.
    pub fn dispose(&mut self, id: NodeId) -> bool {
        self.mutation(|world| world.dispose_inner(id))
    }

    pub(crate) fn dispose_inner(&mut self, id: NodeId) -> bool {
        let Some(node) = self.live_mut(id) else {
            return false;
        };
        if node.managed {
            node.auto_dispose = true;
            if node.parent.is_some() {
                self.reparent(id, None, None);
            }
            debug!("deferred disposal of managed node {id}");
            return true;
        }
        self.finalize_node(id);
        true
    }

    fn finalize_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.disposing = true;
        let children: SmallVec<[NodeId; 8]> = node.children.iter().collect();

        for &child in children.iter().rev() {
            if self.parent(child) == Some(id) {
                self.dispose_inner(child);
            }
        }
        // Managed children only leave; anything still listed is cut loose.
        let remaining: SmallVec<[NodeId; 8]> = self.children(id).collect();
        for child in remaining {
            self.reparent(child, None, None);
        }

        self.unlink_all(id);
        if self.parent(id).is_some() {
            self.reparent(id, None, None);
        }

        if let Some(mut node) = self.nodes.remove(id) {
            node.signals.dispose();
        }
        debug!("disposed node {id}");
    }
}
