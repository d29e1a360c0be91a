//! Priority-ordered synchronous multicast channel.
//!
//! A [`Signal`] owns an ordered registry of listener slots. Slots are kept
//! sorted by descending priority; equal priorities keep subscription order.
//!
//! Listeners are `Rc<dyn Fn(&mut C, &A)>`: `A` is the argument tuple carried
//! by the notification (its arity is just the tuple length) and `C` is a
//! context handed to every listener by the dispatcher. Graph notifications use
//! `C = World` so a listener can mutate the graph that is announcing a change.
//!
//! # Dispatch rules
//!
//! - [`Signal::snapshot`] copies the slot list at call time and
//!   [`Snapshot::dispatch`] walks that copy. Listeners subscribed during the
//!   pass wait for the next dispatch; listeners unsubscribed before they are
//!   reached are skipped.
//! - A slot may carry a guard predicate. When it returns `false` the listener
//!   is skipped for that dispatch (the slot still counts as visited).
//! - Subscribing the same listener `Rc` again only updates its priority (and
//!   its guard, when one is given). The slot itself is kept, so a dispatch
//!   already in progress still reaches it.
//! - After [`Signal::dispose`] every call is a silent no-op.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use entitygraph::events::signal::{Listener, Signal};
//!
//! let hits = Rc::new(Cell::new(0));
//! let counter = hits.clone();
//! let listener: Listener<(i32,)> = Rc::new(move |_, (value,)| counter.set(counter.get() + value));
//!
//! let mut signal = Signal::<(i32,)>::new();
//! signal.subscribe(listener.clone(), 0);
//! signal.subscribe(listener, 5); // same listener: only the priority changes
//! signal.emit((2,));
//! assert_eq!(hits.get(), 2);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Listener callback: receives the dispatch context and the arguments.
pub type Listener<A, C = ()> = Rc<dyn Fn(&mut C, &A)>;

/// Optional per-slot predicate evaluated against the dispatch arguments.
pub type Guard<A> = Rc<dyn Fn(&A) -> bool>;

/// Handle to a subscription within one [`Signal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

/// One registered listener.
pub struct Slot<A, C: ?Sized> {
    id: SlotId,
    listener: Listener<A, C>,
    guard: RefCell<Option<Guard<A>>>,
    priority: Cell<i32>,
    live: Cell<bool>,
}

impl<A, C: ?Sized> Slot<A, C> {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority.get()
    }

    /// Cleared once the slot is unsubscribed.
    pub fn is_live(&self) -> bool {
        self.live.get()
    }
}

/// Priority multicast dispatcher. See the [module docs](self).
pub struct Signal<A, C: ?Sized = ()> {
    slots: Vec<Rc<Slot<A, C>>>,
    next_id: u64,
    disposed: bool,
}

impl<A, C: ?Sized> Default for Signal<A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, C: ?Sized> fmt::Debug for Signal<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.slots.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn same_listener<A, C: ?Sized>(a: &Listener<A, C>, b: &Listener<A, C>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl<A, C: ?Sized> Signal<A, C> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
            disposed: false,
        }
    }

    /// Register `listener` at `priority`.
    ///
    /// Re-subscribing a listener that is already registered updates its
    /// priority and returns the existing handle. Returns `None` once disposed.
    pub fn subscribe(&mut self, listener: Listener<A, C>, priority: i32) -> Option<SlotId> {
        self.register(listener, priority, None)
    }

    /// Like [`subscribe`](Self::subscribe), with a guard predicate that must
    /// hold for the listener to run on a given dispatch.
    pub fn subscribe_guarded(
        &mut self,
        listener: Listener<A, C>,
        priority: i32,
        guard: impl Fn(&A) -> bool + 'static,
    ) -> Option<SlotId> {
        self.register(listener, priority, Some(Rc::new(guard)))
    }

    /// Register a closure. Each call creates a new slot.
    pub fn connect(&mut self, priority: i32, f: impl Fn(&mut C, &A) + 'static) -> Option<SlotId>
    where
        A: 'static,
        C: 'static,
    {
        self.register(Rc::new(f), priority, None)
    }

    fn register(
        &mut self,
        listener: Listener<A, C>,
        priority: i32,
        guard: Option<Guard<A>>,
    ) -> Option<SlotId> {
        if self.disposed {
            return None;
        }
        if let Some(position) = self
            .slots
            .iter()
            .position(|slot| same_listener(&slot.listener, &listener))
        {
            let slot = &self.slots[position];
            let id = slot.id;
            if guard.is_some() {
                slot.guard.replace(guard);
            }
            self.set_priority(id, priority);
            return Some(id);
        }
        let id = SlotId(self.next_id);
        self.next_id += 1;
        self.place(Rc::new(Slot {
            id,
            listener,
            guard: RefCell::new(guard),
            priority: Cell::new(priority),
            live: Cell::new(true),
        }));
        Some(id)
    }

    /// Insert keeping descending priority, ties ordered by subscription.
    fn place(&mut self, slot: Rc<Slot<A, C>>) {
        let priority = slot.priority.get();
        let id = slot.id;
        let position = self.slots.partition_point(|other| {
            let other_priority = other.priority.get();
            other_priority > priority || (other_priority == priority && other.id < id)
        });
        self.slots.insert(position, slot);
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SlotId) -> bool {
        match self.slots.iter().position(|slot| slot.id == id) {
            Some(position) => {
                let slot = self.slots.remove(position);
                slot.live.set(false);
                true
            }
            None => false,
        }
    }

    /// Remove the subscription holding `listener`.
    pub fn unsubscribe_listener(&mut self, listener: &Listener<A, C>) -> bool {
        match self
            .slots
            .iter()
            .position(|slot| same_listener(&slot.listener, listener))
        {
            Some(position) => {
                let id = self.slots[position].id;
                self.unsubscribe(id)
            }
            None => false,
        }
    }

    /// Change a slot's priority and re-sort.
    pub fn set_priority(&mut self, id: SlotId, priority: i32) -> bool {
        let Some(position) = self.slots.iter().position(|slot| slot.id == id) else {
            return false;
        };
        if self.slots[position].priority.get() == priority {
            return true;
        }
        let slot = self.slots.remove(position);
        slot.priority.set(priority);
        self.place(slot);
        true
    }

    pub fn priority(&self, id: SlotId) -> Option<i32> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.priority.get())
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.iter().any(|slot| slot.id == id)
    }

    pub fn contains_listener(&self, listener: &Listener<A, C>) -> bool {
        self.slots
            .iter()
            .any(|slot| same_listener(&slot.listener, listener))
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot handles in dispatch order.
    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }

    /// Unsubscribe every listener.
    pub fn clear(&mut self) {
        for slot in self.slots.drain(..) {
            slot.live.set(false);
        }
    }

    /// Clear all listeners and refuse any further use.
    pub fn dispose(&mut self) {
        self.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Copy of the current slot list, for dispatching while the signal itself
    /// may be mutated.
    pub fn snapshot(&self) -> Snapshot<A, C> {
        Snapshot {
            slots: self.slots.iter().cloned().collect(),
        }
    }

    /// Run every listener against `ctx` and `args`.
    pub fn dispatch(&self, ctx: &mut C, args: &A) {
        if self.disposed {
            return;
        }
        self.snapshot().dispatch(ctx, args);
    }
}

impl<A> Signal<A, ()> {
    /// Dispatch on a context-free signal.
    pub fn emit(&self, args: A) {
        self.dispatch(&mut (), &args);
    }
}

/// Frozen dispatch order taken by [`Signal::snapshot`].
pub struct Snapshot<A, C: ?Sized> {
    slots: SmallVec<[Rc<Slot<A, C>>; 4]>,
}

impl<A, C: ?Sized> Snapshot<A, C> {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Invoke the captured listeners in order. Slots unsubscribed since the
    /// snapshot was taken are skipped.
    pub fn dispatch(self, ctx: &mut C, args: &A) {
        for slot in self.slots {
            if !slot.live.get() {
                continue;
            }
            let guard = slot.guard.borrow().clone();
            if let Some(guard) = guard {
                if !guard(args) {
                    continue;
                }
            }
            (slot.listener)(&mut *ctx, args);
        }
    }
}
