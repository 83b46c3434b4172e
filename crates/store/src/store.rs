//! The store: collections, fetches, and the commit feed.
//!
//! The store is context-affine: it is owned and touched by one thread,
//! so interior mutability is plain `RefCell`/`Cell`. No internal borrow
//! is ever held across a subscriber callback, which means subscribers
//! are free to fetch, subscribe, and unsubscribe during delivery.

use crate::change::{ChangeBatch, CollectionDelta, StoreEvent, UpdatedRecord};
use crate::collection::CollectionStore;
use crate::transaction::StagedDelta;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use vista_core::{Error, Record, RecordId, Result, Value};
use vista_core::schema::Schema;
use vista_query::FetchRequest;

/// Identifier of one feed subscription.
pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    callback: Rc<dyn Fn(&StoreEvent)>,
}

/// An in-memory record store with a commit-ordered change feed.
pub struct Store {
    collections: RefCell<HashMap<String, CollectionStore>>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_subscriber: Cell<SubscriberId>,
    commit_seq: Cell<u64>,
    offline: Cell<bool>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: RefCell::new(HashMap::new()),
            subscribers: RefCell::new(Vec::new()),
            next_subscriber: Cell::new(1),
            commit_seq: Cell::new(0),
            offline: Cell::new(false),
        }
    }

    /// Simulates the store becoming unreachable (or reachable again).
    /// While offline, fetches and commits fail with `StoreUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Returns true if the store is simulating unreachability.
    pub fn is_offline(&self) -> bool {
        self.offline.get()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.get() {
            return Err(Error::store_unavailable("store is offline"));
        }
        Ok(())
    }

    // ----- collections ---------------------------------------------------

    /// Creates a collection from a schema.
    pub fn create_collection(&self, schema: Schema) -> Result<()> {
        let mut collections = self.collections.borrow_mut();
        let name = String::from(schema.collection());
        if collections.contains_key(&name) {
            return Err(Error::CollectionExists { name });
        }
        collections.insert(name, CollectionStore::new(schema));
        Ok(())
    }

    /// Drops a collection. Monitors on it are invalidated.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.borrow_mut().remove(name);
        if removed.is_none() {
            return Err(Error::collection_not_found(name));
        }
        self.emit(&StoreEvent::Invalidated {
            collection: String::from(name),
        });
        Ok(())
    }

    /// Replaces a collection's schema, discarding its records. Monitors
    /// on it are invalidated.
    pub fn migrate_collection(&self, schema: Schema) -> Result<()> {
        let name = String::from(schema.collection());
        {
            let mut collections = self.collections.borrow_mut();
            if !collections.contains_key(&name) {
                return Err(Error::collection_not_found(name));
            }
            collections.insert(name.clone(), CollectionStore::new(schema));
        }
        self.emit(&StoreEvent::Invalidated { collection: name });
        Ok(())
    }

    /// Returns a collection's schema.
    pub fn schema(&self, collection: &str) -> Result<Schema> {
        let collections = self.collections.borrow();
        collections
            .get(collection)
            .map(|c| c.schema().clone())
            .ok_or_else(|| Error::collection_not_found(collection))
    }

    /// Returns the number of records in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.borrow();
        collections
            .get(collection)
            .map(|c| c.len())
            .ok_or_else(|| Error::collection_not_found(collection))
    }

    // ----- reads ---------------------------------------------------------

    /// Returns the record with the given identity.
    pub fn get(&self, collection: &str, id: RecordId) -> Result<Option<Rc<Record>>> {
        self.check_online()?;
        let collections = self.collections.borrow();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?;
        Ok(coll.get(id).cloned())
    }

    /// Returns true if a record with the identity exists.
    pub fn contains(&self, collection: &str, id: RecordId) -> Result<bool> {
        let collections = self.collections.borrow();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?;
        Ok(coll.contains(id))
    }

    /// Fetches all records matching a request, ordered by its sort
    /// rules (identity as the final tiebreak) and truncated to its
    /// limit.
    pub fn fetch(&self, request: &FetchRequest) -> Result<Vec<Rc<Record>>> {
        self.check_online()?;
        let collections = self.collections.borrow();
        let coll = collections
            .get(request.entity())
            .ok_or_else(|| Error::collection_not_found(request.entity()))?;
        let bound = request.bind(coll.schema())?;

        let mut rows: Vec<Rc<Record>> = coll.iter().filter(|r| bound.matches(r)).cloned().collect();
        rows.sort_by(|a, b| bound.compare(a, b));
        if let Some(limit) = bound.limit() {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    /// Checks candidate values against a collection's schema.
    pub fn check_values(&self, collection: &str, values: &[Value]) -> Result<()> {
        let collections = self.collections.borrow();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?;
        coll.check_values(values)
    }

    // ----- commits -------------------------------------------------------

    /// Applies staged transaction deltas and publishes one change
    /// batch. Called by `Transaction::commit`.
    pub(crate) fn apply(&self, staged: BTreeMap<String, StagedDelta>) -> Result<u64> {
        self.check_online()?;

        let sequence = self.commit_seq.get() + 1;
        let mut batch = ChangeBatch {
            sequence,
            collections: Vec::new(),
        };

        {
            let mut collections = self.collections.borrow_mut();

            // Validate every target first so a commit is all-or-nothing.
            for name in staged.keys() {
                if !collections.contains_key(name.as_str()) {
                    return Err(Error::collection_not_found(name.clone()));
                }
            }

            for (name, delta) in staged {
                let Some(coll) = collections.get_mut(name.as_str()) else {
                    continue;
                };
                let mut out = CollectionDelta {
                    collection: name,
                    ..CollectionDelta::default()
                };

                for id in delta.deleted {
                    if coll.remove(id).is_some() {
                        out.deleted.push(id);
                    }
                }

                for (id, values) in delta.modified {
                    let old = match coll.get(id) {
                        Some(old) => old.clone(),
                        // Deleted by a later staged write or never
                        // existed at commit time.
                        None => continue,
                    };
                    let changed_fields: Vec<usize> = old
                        .values()
                        .iter()
                        .zip(&values)
                        .enumerate()
                        .filter(|(_, (before, after))| before != after)
                        .map(|(index, _)| index)
                        .collect();
                    if changed_fields.is_empty() {
                        continue;
                    }
                    let mut record = Record::new(id, values);
                    record.set_version(old.version().wrapping_add(1));
                    coll.replace(record);
                    out.updated.push(UpdatedRecord { id, changed_fields });
                }

                for (id, record) in delta.added {
                    coll.insert(record);
                    out.inserted.push(id);
                }

                if !out.is_empty() {
                    batch.collections.push(out);
                }
            }
        }

        self.commit_seq.set(sequence);
        if !batch.is_empty() {
            self.emit(&StoreEvent::Committed(batch));
        }
        Ok(sequence)
    }

    // ----- subscriptions -------------------------------------------------

    /// Subscribes to the change feed. Events are delivered in
    /// registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&StoreEvent) + 'static,
    {
        let id = self.next_subscriber.get();
        self.next_subscriber.set(id + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            callback: Rc::new(callback),
        });
        id
    }

    /// Removes a subscription. Returns true if it existed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() < before
    }

    /// Returns the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Delivers an event over a stable snapshot of the subscriber list,
    /// skipping subscribers removed mid-delivery.
    fn emit(&self, event: &StoreEvent) {
        let snapshot: Vec<(SubscriberId, Rc<dyn Fn(&StoreEvent)>)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|s| (s.id, s.callback.clone()))
            .collect();

        for (id, callback) in snapshot {
            let live = self.subscribers.borrow().iter().any(|s| s.id == id);
            if live {
                callback(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use alloc::vec;
    use vista_core::schema::SchemaBuilder;
    use vista_core::DataType;
    use vista_query::{Predicate, QuerySpec};

    fn orders_store() -> Store {
        let store = Store::new();
        store
            .create_collection(
                SchemaBuilder::new("orders")
                    .unwrap()
                    .field("qty", DataType::Int)
                    .unwrap()
                    .field("tag", DataType::Text)
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        store
    }

    fn insert(store: &Store, qty: i64, tag: &str) -> RecordId {
        let mut tx = Transaction::begin();
        let id = tx
            .insert(store, "orders", vec![Value::Int(qty), Value::Text(tag.into())])
            .unwrap();
        tx.commit(store).unwrap();
        id
    }

    #[test]
    fn test_create_collection_twice_fails() {
        let store = orders_store();
        let schema = SchemaBuilder::new("orders")
            .unwrap()
            .field("qty", DataType::Int)
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            store.create_collection(schema),
            Err(Error::CollectionExists { .. })
        ));
    }

    #[test]
    fn test_fetch_filters_and_orders() {
        let store = orders_store();
        let a = insert(&store, 5, "x");
        let b = insert(&store, 3, "x");
        let c = insert(&store, 9, "y");
        insert(&store, 1, "skip");

        let request = QuerySpec::new("orders")
            .filter(Predicate::gt("qty", 2i64))
            .order_by_asc("qty")
            .resolve();
        let rows = store.fetch(&request).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id()).collect();
        assert_eq!(ids, [b, a, c]);
    }

    #[test]
    fn test_fetch_limit() {
        let store = orders_store();
        insert(&store, 3, "x");
        insert(&store, 1, "x");
        insert(&store, 2, "x");

        let request = QuerySpec::new("orders").order_by_asc("qty").limit(2).resolve();
        let rows = store.fetch(&request).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some(&Value::Int(1)));
    }

    #[test]
    fn test_commit_publishes_one_batch() {
        let store = orders_store();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let mut tx = Transaction::begin();
        let a = tx.insert(&store, "orders", vec![Value::Int(1), Value::Null]).unwrap();
        let b = tx.insert(&store, "orders", vec![Value::Int(2), Value::Null]).unwrap();
        tx.commit(&store).unwrap();

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StoreEvent::Committed(batch) => {
                let delta = batch.delta_for("orders").unwrap();
                assert_eq!(delta.inserted, [a, b]);
                assert!(delta.updated.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_update_reports_changed_fields() {
        let store = orders_store();
        let id = insert(&store, 5, "x");

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let mut tx = Transaction::begin();
        tx.update(&store, "orders", id, vec![Value::Int(5), Value::Text("y".into())])
            .unwrap();
        tx.commit(&store).unwrap();

        let events = events.borrow();
        match &events[0] {
            StoreEvent::Committed(batch) => {
                let updated = &batch.delta_for("orders").unwrap().updated;
                assert_eq!(updated.len(), 1);
                assert_eq!(updated[0].id, id);
                // Only the tag field (index 1) changed.
                assert_eq!(updated[0].changed_fields, [1]);
            }
            other => panic!("unexpected event {:?}", other),
        }

        // The record version was bumped.
        assert_eq!(store.get("orders", id).unwrap().unwrap().version(), 2);
    }

    #[test]
    fn test_noop_update_publishes_nothing() {
        let store = orders_store();
        let id = insert(&store, 5, "x");

        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        store.subscribe(move |_| sink.set(sink.get() + 1));

        let mut tx = Transaction::begin();
        tx.update(&store, "orders", id, vec![Value::Int(5), Value::Text("x".into())])
            .unwrap();
        tx.commit(&store).unwrap();

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_commit_sequence_is_monotonic() {
        let store = orders_store();
        let first = insert(&store, 1, "a");
        let _ = first;

        let sequences = Rc::new(RefCell::new(Vec::new()));
        let sink = sequences.clone();
        store.subscribe(move |event| {
            if let StoreEvent::Committed(batch) = event {
                sink.borrow_mut().push(batch.sequence);
            }
        });

        insert(&store, 2, "a");
        insert(&store, 3, "a");

        let sequences = sequences.borrow();
        assert_eq!(sequences.len(), 2);
        assert!(sequences[0] < sequences[1]);
    }

    #[test]
    fn test_subscriber_removed_mid_delivery_is_skipped() {
        let store = Rc::new(orders_store());

        let second_ran = Rc::new(Cell::new(false));
        let third_count = Rc::new(Cell::new(0));
        let victim_id = Rc::new(Cell::new(0u64));

        // First subscriber removes the second before its turn.
        {
            let store_ref = store.clone();
            let victim_id = victim_id.clone();
            store.subscribe(move |_| {
                store_ref.unsubscribe(victim_id.get());
            });
        }
        {
            let ran = second_ran.clone();
            victim_id.set(store.subscribe(move |_| ran.set(true)));
        }
        {
            let count = third_count.clone();
            store.subscribe(move |_| count.set(count.get() + 1));
        }

        insert(&store, 1, "a");

        // The second subscriber missed the delivery in progress; the
        // third still received exactly one event.
        assert!(!second_ran.get());
        assert_eq!(third_count.get(), 1);
        assert_eq!(store.subscriber_count(), 2);
    }

    #[test]
    fn test_offline_fetch_fails_and_recovers() {
        let store = orders_store();
        insert(&store, 1, "a");

        store.set_offline(true);
        let request = QuerySpec::new("orders").order_by_asc("qty").resolve();
        assert!(matches!(
            store.fetch(&request),
            Err(Error::StoreUnavailable { .. })
        ));
        assert!(store.get("orders", 1).is_err());

        store.set_offline(false);
        assert!(store.fetch(&request).is_ok());
    }

    #[test]
    fn test_offline_commit_fails() {
        let store = orders_store();
        let mut tx = Transaction::begin();
        tx.insert(&store, "orders", vec![Value::Int(1), Value::Null]).unwrap();

        store.set_offline(true);
        assert!(matches!(
            tx.commit(&store),
            Err(Error::StoreUnavailable { .. })
        ));
    }

    #[test]
    fn test_migrate_emits_invalidation() {
        let store = orders_store();
        insert(&store, 1, "a");

        let invalidated = Rc::new(Cell::new(false));
        let sink = invalidated.clone();
        store.subscribe(move |event| {
            if matches!(event, StoreEvent::Invalidated { .. }) {
                sink.set(true);
            }
        });

        let schema = SchemaBuilder::new("orders")
            .unwrap()
            .field("qty", DataType::Int)
            .unwrap()
            .build()
            .unwrap();
        store.migrate_collection(schema).unwrap();

        assert!(invalidated.get());
        assert_eq!(store.count("orders").unwrap(), 0);
    }

    #[test]
    fn test_drop_collection() {
        let store = orders_store();
        store.drop_collection("orders").unwrap();
        assert!(store.schema("orders").is_err());
        assert!(store.drop_collection("orders").is_err());
    }
}
