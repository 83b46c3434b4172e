//! Record monitors.
//!
//! The object-level degenerate case of a list monitor: the query
//! resolves to a single identity, and the diff reduces to updated or
//! deleted. State transitions, observer handling, and invalidation
//! match the list monitor exactly.

use crate::context::{AffinityContext, Completion};
use crate::list::MonitorState;
use crate::observer::{ObserverId, ObserverRegistry};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use vista_core::{Error, Record, RecordId, Result};
use vista_store::{Store, StoreEvent, SubscriberId};

/// What happened to a watched record.
#[derive(Clone, Debug)]
pub enum RecordChange {
    /// The record was updated in place.
    Updated {
        record: Rc<Record>,
        /// Indices of the fields whose values changed.
        changed_fields: Vec<usize>,
    },
    /// The record was deleted. Identities are never reused, so this is
    /// the last change the monitor will ever report.
    Deleted,
}

/// Receives record monitor notifications.
pub trait RecordObserver {
    /// The watched record changed.
    fn did_change(&self, change: &RecordChange);

    /// The monitor was torn down by a store configuration change and
    /// must be re-created.
    fn was_invalidated(&self) {}
}

/// The context-affine state of one record monitor.
pub struct RecordMonitor {
    store: Rc<Store>,
    context: Rc<dyn AffinityContext>,
    collection: String,
    id: RecordId,
    current: Option<Rc<Record>>,
    state: MonitorState,
    subscription: Option<SubscriberId>,
}

impl RecordMonitor {
    fn load(&mut self) -> Result<()> {
        let record = self
            .store
            .get(&self.collection, self.id)?
            .ok_or_else(|| Error::record_not_found(self.collection.clone(), self.id))?;
        self.current = Some(record);
        self.state = MonitorState::Live;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.state = MonitorState::Invalidated;
        self.current = None;
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
        }
    }

    fn guard_context(&self, operation: &'static str) -> Result<()> {
        debug_assert!(
            self.context.is_current(),
            "{} called off the affinity context",
            operation
        );
        if !self.context.is_current() {
            return Err(Error::OffContext { operation });
        }
        Ok(())
    }
}

impl Drop for RecordMonitor {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
        }
    }
}

/// Handle to a record monitor.
pub struct RecordHandle {
    monitor: Rc<RefCell<RecordMonitor>>,
    observers: Rc<ObserverRegistry<dyn RecordObserver>>,
}

impl Clone for RecordHandle {
    fn clone(&self) -> Self {
        Self {
            monitor: self.monitor.clone(),
            observers: self.observers.clone(),
        }
    }
}

impl RecordHandle {
    /// Creates a monitor for one record and synchronously loads it.
    /// Fails when the record does not exist.
    pub fn observe(
        store: &Rc<Store>,
        collection: &str,
        id: RecordId,
        context: Rc<dyn AffinityContext>,
    ) -> Result<RecordHandle> {
        let handle = Self::prepare(store, collection, id, context)?;
        handle.monitor.borrow_mut().load()?;
        Ok(handle)
    }

    /// Creates a monitor in `Loading` state and schedules the load on
    /// the affinity context; the completion fires exactly once with
    /// the outcome, even if the handle was dropped meanwhile.
    pub fn observe_deferred<F>(
        store: &Rc<Store>,
        collection: &str,
        id: RecordId,
        context: Rc<dyn AffinityContext>,
        completion: F,
    ) -> Result<RecordHandle>
    where
        F: FnOnce(Result<RecordHandle>) + 'static,
    {
        let handle = Self::prepare(store, collection, id, context.clone())?;
        let completion = Completion::new(completion);

        let task_handle = handle.clone();
        context.schedule(Box::new(move || {
            let outcome = {
                let mut monitor = task_handle.monitor.borrow_mut();
                match monitor.state {
                    MonitorState::Invalidated => Err(Error::Invalidated),
                    MonitorState::Live => Ok(()),
                    _ => monitor.load(),
                }
            };
            match outcome {
                Ok(()) => {
                    completion.fire(Ok(task_handle.clone()));
                }
                Err(error) => {
                    completion.fire(Err(error));
                }
            }
        }));

        Ok(handle)
    }

    fn prepare(
        store: &Rc<Store>,
        collection: &str,
        id: RecordId,
        context: Rc<dyn AffinityContext>,
    ) -> Result<RecordHandle> {
        // Surface a bad collection synchronously.
        store.schema(collection)?;

        let monitor = RecordMonitor {
            store: store.clone(),
            context,
            collection: String::from(collection),
            id,
            current: None,
            state: MonitorState::Loading,
            subscription: None,
        };
        let handle = RecordHandle {
            monitor: Rc::new(RefCell::new(monitor)),
            observers: Rc::new(ObserverRegistry::new()),
        };
        handle.attach_feed();
        Ok(handle)
    }

    fn attach_feed(&self) {
        let weak = Rc::downgrade(&self.monitor);
        let observers = self.observers.clone();
        let (store, context, collection, id) = {
            let monitor = self.monitor.borrow();
            (
                monitor.store.clone(),
                monitor.context.clone(),
                monitor.collection.clone(),
                monitor.id,
            )
        };

        let subscription = store.subscribe(move |event| {
            let relevant = match event {
                StoreEvent::Committed(batch) => batch
                    .delta_for(&collection)
                    .map(|delta| {
                        delta.deleted.contains(&id)
                            || delta.updated.iter().any(|u| u.id == id)
                    })
                    .unwrap_or(false),
                StoreEvent::Invalidated { collection: name } => *name == collection,
            };
            if !relevant {
                return;
            }

            let weak = weak.clone();
            let observers = observers.clone();
            let event = event.clone();
            let task = Box::new(move || Self::deliver(&weak, &observers, &event));
            if context.is_current() {
                task();
            } else {
                context.schedule(task);
            }
        });
        self.monitor.borrow_mut().subscription = Some(subscription);
    }

    fn deliver(
        weak: &alloc::rc::Weak<RefCell<RecordMonitor>>,
        observers: &Rc<ObserverRegistry<dyn RecordObserver>>,
        event: &StoreEvent,
    ) {
        let Some(monitor) = weak.upgrade() else {
            return;
        };

        match event {
            StoreEvent::Committed(batch) => {
                let change = {
                    let mut m = monitor.borrow_mut();
                    if m.state != MonitorState::Live {
                        return;
                    }
                    let Some(delta) = batch.delta_for(&m.collection) else {
                        return;
                    };
                    if delta.deleted.contains(&m.id) {
                        m.current = None;
                        Some(RecordChange::Deleted)
                    } else if let Some(updated) = delta.updated.iter().find(|u| u.id == m.id) {
                        match m.store.get(&m.collection, m.id) {
                            Ok(Some(record)) => {
                                m.current = Some(record.clone());
                                Some(RecordChange::Updated {
                                    record,
                                    changed_fields: updated.changed_fields.clone(),
                                })
                            }
                            // Keep the last-good record on store failure.
                            Ok(None) | Err(_) => None,
                        }
                    } else {
                        None
                    }
                };
                if let Some(change) = change {
                    observers.notify(|observer| observer.did_change(&change));
                }
            }
            StoreEvent::Invalidated { .. } => {
                {
                    let mut m = monitor.borrow_mut();
                    if m.state == MonitorState::Invalidated {
                        return;
                    }
                    m.invalidate();
                }
                observers.notify(|observer| observer.was_invalidated());
            }
        }
    }

    /// Forces an immediate synchronous reload. Returns the change the
    /// reload revealed, if any, after delivering it to observers. A
    /// store failure leaves state and record untouched.
    pub fn refetch(&self) -> Result<Option<RecordChange>> {
        let change = {
            let mut monitor = self.monitor.borrow_mut();
            monitor.guard_context("refetch")?;
            if monitor.state == MonitorState::Invalidated {
                return Err(Error::Invalidated);
            }

            let fresh = monitor.store.get(&monitor.collection, monitor.id)?;
            monitor.state = MonitorState::Live;
            match (monitor.current.take(), fresh) {
                (Some(_), None) => {
                    monitor.current = None;
                    Some(RecordChange::Deleted)
                }
                (old, Some(record)) => {
                    let changed_fields: Vec<usize> = match &old {
                        Some(old) => old
                            .values()
                            .iter()
                            .zip(record.values())
                            .enumerate()
                            .filter(|(_, (before, after))| before != after)
                            .map(|(index, _)| index)
                            .collect(),
                        None => (0..record.len()).collect(),
                    };
                    monitor.current = Some(record.clone());
                    if old.is_some() && changed_fields.is_empty() {
                        None
                    } else if old.is_none() {
                        None
                    } else {
                        Some(RecordChange::Updated {
                            record,
                            changed_fields,
                        })
                    }
                }
                (None, None) => None,
            }
        };

        if let Some(change) = &change {
            self.observers.notify(|observer| observer.did_change(change));
        }
        Ok(change)
    }

    /// Returns the monitor state.
    pub fn state(&self) -> MonitorState {
        self.monitor.borrow().state
    }

    /// Returns the watched identity.
    pub fn id(&self) -> RecordId {
        self.monitor.borrow().id
    }

    /// Returns the current record, or None once it has been deleted.
    pub fn record(&self) -> Option<Rc<Record>> {
        self.monitor.borrow().current.clone()
    }

    /// Registers an observer. The registry holds a weak handle only.
    pub fn add_observer<O>(&self, observer: &Rc<O>) -> ObserverId
    where
        O: RecordObserver + 'static,
    {
        let as_dyn: Rc<dyn RecordObserver> = observer.clone();
        self.observers.add(&as_dyn)
    }

    /// Removes an observer registration. Safe to call during delivery.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Returns the number of live observer registrations.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
