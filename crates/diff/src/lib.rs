//! Vista Diff - Snapshots and structural diffing for the Vista
//! live-view engine.
//!
//! This crate provides:
//!
//! - `Snapshot`: the ordered, optionally sectioned view of matching
//!   records at one point in time (identities and versions only)
//! - `ListDiff`: the minimal section/row operations between two
//!   snapshots (inserts, deletes, moves, in-place updates)
//! - `engine::diff`: identity-based matching with a patience-LIS pass,
//!   O(n log n) per update cycle
//! - `SnapshotCache`: owns a monitor's current snapshot and produces
//!   the diff on replacement
//!
//! # Example
//!
//! ```rust
//! use vista_diff::{SnapshotBuilder, SnapshotCache, SnapshotEntry};
//! use vista_core::Value;
//!
//! let mut builder = SnapshotBuilder::new();
//! builder.push(Value::Null, SnapshotEntry::new(1, 1));
//! builder.push(Value::Null, SnapshotEntry::new(2, 1));
//!
//! let mut cache = SnapshotCache::new();
//! let diff = cache.replace(builder.finish());
//!
//! // The first snapshot arrives as one section insertion.
//! assert_eq!(diff.section_inserts.len(), 1);
//! assert_eq!(cache.current().row_count(), 2);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod diff;
pub mod engine;
pub mod snapshot;

pub use cache::SnapshotCache;
pub use diff::{ListDiff, RowDelete, RowInsert, RowMove, RowUpdate, SectionDelete, SectionInsert};
pub use snapshot::{RowPath, Section, Snapshot, SnapshotBuilder, SnapshotEntry};
