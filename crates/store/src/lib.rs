//! Vista Store - In-memory record store and change feed for the Vista
//! live-view engine.
//!
//! This crate provides the engine's change source:
//!
//! - `Store`: collections of records behind a fetch interface
//! - `Transaction`: buffered writes applied atomically at commit
//! - `ChangeBatch` / `StoreEvent`: exactly one commit-ordered batch per
//!   committed transaction, delivered to feed subscribers
//!
//! Monitors only ever observe committed state: staged writes are
//! invisible until `Transaction::commit` publishes them.
//!
//! # Example
//!
//! ```rust
//! use vista_store::{Store, Transaction};
//! use vista_core::schema::SchemaBuilder;
//! use vista_core::{DataType, Value};
//!
//! let store = Store::new();
//! let schema = SchemaBuilder::new("orders")
//!     .unwrap()
//!     .field("qty", DataType::Int)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! store.create_collection(schema).unwrap();
//!
//! let mut tx = Transaction::begin();
//! let id = tx.insert(&store, "orders", vec![Value::Int(5)]).unwrap();
//! tx.commit(&store).unwrap();
//!
//! assert!(store.contains("orders", id).unwrap());
//! ```

#![no_std]

extern crate alloc;

pub mod change;
pub mod collection;
pub mod store;
pub mod transaction;

pub use change::{ChangeBatch, CollectionDelta, StoreEvent, UpdatedRecord};
pub use collection::CollectionStore;
pub use store::{Store, SubscriberId};
pub use transaction::{Transaction, TransactionState};
