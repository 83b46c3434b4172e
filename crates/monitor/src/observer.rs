//! Observers and the observer registry.
//!
//! Registrations are non-owning: the registry holds weak handles and
//! never extends an observer's lifetime. Fan-out iterates a stable
//! snapshot of the registry taken when delivery starts, so observers
//! may add or remove registrations mid-delivery without affecting the
//! round in progress, and dead handles are pruned lazily afterwards.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use vista_diff::{ListDiff, Snapshot};

/// Identifier of one observer registration.
pub type ObserverId = u64;

/// Receives list monitor notifications.
pub trait ListObserver {
    /// The monitor went live. The snapshot is the full initial view,
    /// to be treated as one large insertion.
    fn did_start(&self, snapshot: &Snapshot);

    /// The view changed; `snapshot` is the state after applying `diff`.
    fn did_change(&self, diff: &ListDiff, snapshot: &Snapshot);

    /// The monitor was torn down by a store configuration change and
    /// must be re-created.
    fn was_invalidated(&self) {}
}

/// Weak, ordered observer registrations.
pub struct ObserverRegistry<T: ?Sized> {
    entries: RefCell<Vec<(ObserverId, Weak<T>)>>,
    next_id: Cell<ObserverId>,
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ObserverRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Registers an observer without taking ownership of it.
    pub fn add(&self, observer: &Rc<T>) -> ObserverId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries
            .borrow_mut()
            .push((id, Rc::downgrade(observer)));
        id
    }

    /// Removes a registration. Returns true if it existed.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() < before
    }

    /// Returns the number of live registrations.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }

    /// Returns true if no live registrations exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers to every observer in registration order, over a stable
    /// snapshot of the registry. Observers removed before their turn
    /// are skipped; observers added during delivery wait for the next
    /// round. Dead handles are pruned afterwards.
    pub fn notify(&self, mut deliver: impl FnMut(&T)) {
        let snapshot: Vec<(ObserverId, Weak<T>)> = self.entries.borrow().clone();
        for (id, weak) in snapshot {
            let registered = self.entries.borrow().iter().any(|(entry, _)| *entry == id);
            if !registered {
                continue;
            }
            if let Some(observer) = weak.upgrade() {
                deliver(&observer);
            }
        }
        self.prune();
    }

    /// Drops registrations whose observers no longer exist.
    pub fn prune(&self) {
        self.entries
            .borrow_mut()
            .retain(|(_, weak)| weak.strong_count() > 0);
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
