//! List monitors.
//!
//! A `ListMonitor` keeps an ordered, optionally sectioned view of one
//! collection in sync with the store and fans out minimal diffs to
//! registered observers. All monitor state lives on the affinity
//! context; store events are marshalled onto it before they touch
//! anything.
//!
//! The public surface is `ListHandle`, a cheap-to-clone handle wrapping
//! the monitor. Diff computation runs under the monitor's mutable
//! borrow; fan-out runs after it is released, so observers are free to
//! read the snapshot and add or remove observers during delivery.

use crate::context::{AffinityContext, Completion};
use crate::observer::{ListObserver, ObserverId, ObserverRegistry};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::cmp::Ordering;
use hashbrown::HashSet;
use vista_core::{Error, Record, RecordId, Result};
use vista_diff::{ListDiff, Snapshot, SnapshotBuilder, SnapshotCache, SnapshotEntry};
use vista_query::{BoundQuery, FetchRequest, QuerySpec};
use vista_store::{CollectionDelta, Store, StoreEvent, SubscriberId};

/// Lifecycle of a monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorState {
    /// Created but not yet loading.
    Uninitialized,
    /// Initial fetch pending or failed; `refetch` completes it.
    Loading,
    /// Snapshot materialized and tracking the change feed.
    Live,
    /// Torn down by a store configuration change. Terminal.
    Invalidated,
}

/// The context-affine state of one list monitor.
pub struct ListMonitor {
    store: Rc<Store>,
    context: Rc<dyn AffinityContext>,
    request: FetchRequest,
    bound: BoundQuery,
    /// Matching records in query order; the source the snapshot is
    /// materialized from.
    rows: Vec<Rc<Record>>,
    cache: SnapshotCache,
    state: MonitorState,
    subscription: Option<SubscriberId>,
}

impl ListMonitor {
    fn new(
        store: Rc<Store>,
        context: Rc<dyn AffinityContext>,
        request: FetchRequest,
        bound: BoundQuery,
    ) -> Self {
        Self {
            store,
            context,
            request,
            bound,
            rows: Vec::new(),
            cache: SnapshotCache::new(),
            state: MonitorState::Uninitialized,
            subscription: None,
        }
    }

    /// Runs the initial fetch and goes live. On failure the monitor
    /// stays in `Loading` with an empty snapshot.
    fn load(&mut self) -> Result<()> {
        let records = self.store.fetch(&self.request)?;
        self.rows = records;
        let snapshot = self.materialize();
        self.cache.replace(snapshot);
        self.state = MonitorState::Live;
        Ok(())
    }

    /// Builds the snapshot for the current row set.
    fn materialize(&self) -> Snapshot {
        let mut builder = SnapshotBuilder::new();
        for record in &self.rows {
            builder.push(
                self.bound.section_key(record),
                SnapshotEntry::new(record.id(), record.version()),
            );
        }
        builder.finish()
    }

    /// Applies one collection delta to the row set and returns the
    /// snapshot diff. Comparison work is bounded by the delta size
    /// against the view; the store is never re-scanned unless the
    /// query carries a row limit, where rows outside the view can
    /// become visible.
    fn ingest(&mut self, delta: &CollectionDelta) -> Result<ListDiff> {
        if self.bound.limit().is_some() {
            self.rows = self.store.fetch(&self.request)?;
        } else {
            // Pull every record the delta may add before touching the
            // row set, so a store failure leaves the view intact.
            let mut incoming: Vec<Rc<Record>> = Vec::new();
            for &id in &delta.inserted {
                if let Some(record) = self.store.get(self.request.entity(), id)? {
                    incoming.push(record);
                }
            }
            for updated in &delta.updated {
                if let Some(record) = self.store.get(self.request.entity(), updated.id)? {
                    incoming.push(record);
                }
            }

            let mut gone: HashSet<RecordId> = delta.deleted.iter().copied().collect();
            gone.extend(delta.updated.iter().map(|u| u.id));
            if !gone.is_empty() {
                self.rows.retain(|r| !gone.contains(&r.id()));
            }

            for record in incoming {
                if self.bound.matches(&record) {
                    let at = self
                        .rows
                        .partition_point(|r| self.bound.compare(r, &record) == Ordering::Less);
                    self.rows.insert(at, record);
                }
            }
        }

        let snapshot = self.materialize();
        Ok(self.cache.replace(snapshot))
    }

    /// Tears the monitor down. Terminal.
    fn invalidate(&mut self) {
        self.state = MonitorState::Invalidated;
        self.rows.clear();
        self.cache.reset();
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

impl Drop for ListMonitor {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.store.unsubscribe(id);
        }
    }
}

/// Handle to a list monitor. Clones share the same monitor; dropping
/// the last clone tears the monitor down and detaches it from the
/// store feed.
pub struct ListHandle {
    monitor: Rc<RefCell<ListMonitor>>,
    observers: Rc<ObserverRegistry<dyn ListObserver>>,
}

impl Clone for ListHandle {
    fn clone(&self) -> Self {
        Self {
            monitor: self.monitor.clone(),
            observers: self.observers.clone(),
        }
    }
}

impl core::fmt::Debug for ListHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListHandle").finish_non_exhaustive()
    }
}

impl ListHandle {
    /// Creates a monitor and synchronously materializes its first
    /// snapshot. The calling context becomes the affinity context.
    ///
    /// Fails with a configuration error when the spec has no ordering
    /// rule or names unknown fields, and with a store access error
    /// when the initial fetch cannot run.
    pub fn observe(
        store: &Rc<Store>,
        spec: &QuerySpec,
        context: Rc<dyn AffinityContext>,
    ) -> Result<ListHandle> {
        let handle = Self::prepare(store, spec, context)?;
        handle.monitor.borrow_mut().load()?;
        handle.notify_started();
        Ok(handle)
    }

    /// Creates a monitor in `Loading` state and schedules the initial
    /// fetch on the affinity context. The completion callback fires
    /// exactly once with the outcome, even when every returned handle
    /// has been dropped in the meantime (the scheduled work keeps the
    /// monitor alive until then; with no observers registered, nothing
    /// is delivered).
    pub fn observe_deferred<F>(
        store: &Rc<Store>,
        spec: &QuerySpec,
        context: Rc<dyn AffinityContext>,
        completion: F,
    ) -> Result<ListHandle>
    where
        F: FnOnce(Result<ListHandle>) + 'static,
    {
        let handle = Self::prepare(store, spec, context.clone())?;
        let completion = Completion::new(completion);

        let task_handle = handle.clone();
        context.schedule(Box::new(move || {
            let outcome = {
                let mut monitor = task_handle.monitor.borrow_mut();
                match monitor.state {
                    MonitorState::Invalidated => Err(Error::Invalidated),
                    // An earlier refetch already went live and
                    // announced itself.
                    MonitorState::Live => Ok(false),
                    _ => monitor.load().map(|()| true),
                }
            };
            match outcome {
                Ok(announce) => {
                    if announce {
                        task_handle.notify_started();
                    }
                    completion.fire(Ok(task_handle.clone()));
                }
                Err(error) => {
                    completion.fire(Err(error));
                }
            }
        }));

        Ok(handle)
    }

    /// Validates the spec, binds it, and attaches the store feed. The
    /// monitor comes back in `Loading` state.
    fn prepare(
        store: &Rc<Store>,
        spec: &QuerySpec,
        context: Rc<dyn AffinityContext>,
    ) -> Result<ListHandle> {
        let request = spec.resolve();
        let schema = store.schema(request.entity())?;
        let bound = request.bind(&schema)?;
        if !bound.has_order() {
            return Err(Error::missing_sort_order(request.entity()));
        }

        let mut monitor = ListMonitor::new(store.clone(), context, request, bound);
        monitor.state = MonitorState::Loading;

        let handle = ListHandle {
            monitor: Rc::new(RefCell::new(monitor)),
            observers: Rc::new(ObserverRegistry::new()),
        };
        handle.attach_feed();
        Ok(handle)
    }

    /// Subscribes the monitor to the store feed. Irrelevant events are
    /// filtered before the context hop; relevant ones are marshalled
    /// onto the affinity context.
    fn attach_feed(&self) {
        let weak = Rc::downgrade(&self.monitor);
        let observers = self.observers.clone();
        let (store, context, entity) = {
            let monitor = self.monitor.borrow();
            (
                monitor.store.clone(),
                monitor.context.clone(),
                String::from(monitor.request.entity()),
            )
        };

        let id = store.subscribe(move |event| {
            let relevant = match event {
                StoreEvent::Committed(batch) => batch.delta_for(&entity).is_some(),
                StoreEvent::Invalidated { collection } => *collection == entity,
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
        self.monitor.borrow_mut().subscription = Some(id);
    }

    /// Runs on the affinity context for every relevant store event.
    fn deliver(
        weak: &alloc::rc::Weak<RefCell<ListMonitor>>,
        observers: &Rc<ObserverRegistry<dyn ListObserver>>,
        event: &StoreEvent,
    ) {
        let Some(monitor) = weak.upgrade() else {
            return;
        };

        match event {
            StoreEvent::Committed(batch) => {
                let diff = {
                    let mut m = monitor.borrow_mut();
                    if m.state != MonitorState::Live {
                        return;
                    }
                    let Some(delta) = batch.delta_for(m.request.entity()) else {
                        return;
                    };
                    // A failing ingest keeps the last-good snapshot and
                    // delivers nothing; the next event or refetch
                    // catches the view up.
                    match m.ingest(delta) {
                        Ok(diff) => diff,
                        Err(_) => return,
                    }
                };
                if !diff.is_empty() {
                    let m = monitor.borrow();
                    observers.notify(|observer| observer.did_change(&diff, m.cache.current()));
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

    fn notify_started(&self) {
        let monitor = self.monitor.borrow();
        self.observers
            .notify(|observer| observer.did_start(monitor.cache.current()));
    }

    /// Forces an immediate synchronous recompute against the store and
    /// returns the resulting diff (empty when nothing changed). A
    /// store failure leaves state and snapshot untouched. From
    /// `Loading`, a successful refetch completes initialization.
    pub fn refetch(&self) -> Result<ListDiff> {
        let (went_live, diff) = {
            let mut monitor = self.monitor.borrow_mut();
            monitor.guard_context("refetch")?;
            if monitor.state == MonitorState::Invalidated {
                return Err(Error::Invalidated);
            }
            let went_live = monitor.state != MonitorState::Live;

            let records = monitor.store.fetch(&monitor.request)?;
            monitor.rows = records;
            let snapshot = monitor.materialize();
            let diff = monitor.cache.replace(snapshot);
            monitor.state = MonitorState::Live;
            (went_live, diff)
        };

        if went_live {
            self.notify_started();
        } else if !diff.is_empty() {
            let monitor = self.monitor.borrow();
            self.observers
                .notify(|observer| observer.did_change(&diff, monitor.cache.current()));
        }
        Ok(diff)
    }

    /// Returns the monitor state.
    pub fn state(&self) -> MonitorState {
        self.monitor.borrow().state
    }

    /// Returns the entity (collection) the monitor watches.
    pub fn entity(&self) -> String {
        String::from(self.monitor.borrow().request.entity())
    }

    /// Returns a clone of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.monitor.borrow().cache.current().clone()
    }

    /// Registers an observer. The registry holds a weak handle only;
    /// the caller keeps the observer alive.
    pub fn add_observer<O>(&self, observer: &Rc<O>) -> ObserverId
    where
        O: ListObserver + 'static,
    {
        let as_dyn: Rc<dyn ListObserver> = observer.clone();
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
