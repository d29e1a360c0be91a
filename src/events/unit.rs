//! Notifications raised by capability units.

use crate::entities::arena::{NodeId, UnitId};
use crate::entities::world::World;
use crate::events::signal::Signal;

pub type UnitSignal<A> = Signal<A, World>;

/// `(unit, manager, index)`
pub type ManagerChanged = (UnitId, NodeId, usize);
/// `(unit, disposed, previously disposed)`
pub type DisposedChanged = (UnitId, bool, bool);

/// All channels owned by one unit.
#[derive(Debug, Default)]
pub struct UnitSignals {
    pub manager_added: UnitSignal<ManagerChanged>,
    pub manager_removed: UnitSignal<ManagerChanged>,
    pub disposed_changed: UnitSignal<DisposedChanged>,
}

impl UnitSignals {
    pub fn dispose(&mut self) {
        self.manager_added.dispose();
        self.manager_removed.dispose();
        self.disposed_changed.dispose();
    }
}
