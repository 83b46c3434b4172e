//! Vista Monitor - Live monitors for the Vista view engine.
//!
//! Monitors keep materialized views in sync with a store and fan
//! minimal diffs out to registered observers:
//!
//! - `ListHandle`: an ordered, optionally sectioned view of one
//!   collection, driven by the store's commit feed
//! - `RecordHandle`: the object-level degenerate case, watching one
//!   identity
//! - `ObserverRegistry`: weak, ordered registrations with stable
//!   fan-out
//! - `AffinityContext`: the single context a monitor's state lives on;
//!   `DirectContext` runs inline, `TaskQueue` models a drained run loop
//!
//! # Example
//!
//! ```ignore
//! use vista_monitor::{DirectContext, ListHandle};
//! use vista_query::QuerySpec;
//!
//! let spec = QuerySpec::new("orders").order_by_asc("qty");
//! let handle = ListHandle::observe(&store, &spec, Rc::new(DirectContext::new()))?;
//!
//! handle.add_observer(&observer);
//! // Committed transactions now arrive as structural diffs.
//! ```

#![no_std]

extern crate alloc;

pub mod context;
pub mod list;
pub mod observer;
pub mod record;

pub use context::{AffinityContext, Completion, DirectContext, Task, TaskQueue};
pub use list::{ListHandle, ListMonitor, MonitorState};
pub use observer::{ListObserver, ObserverId, ObserverRegistry};
pub use record::{RecordChange, RecordHandle, RecordMonitor, RecordObserver};

// Re-export the diff vocabulary observers receive.
pub use vista_diff::{ListDiff, RowPath, Snapshot};
