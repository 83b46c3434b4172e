//! Vista Query - Query specifications for the Vista live-view engine.
//!
//! A query is described declaratively and applied in two steps:
//!
//! - `QuerySpec` holds an entity name and an ordered list of
//!   `FetchClause` objects (`Filter`, `OrderBy`, `SectionBy`, `Limit`),
//!   each of which applies itself to a shared `FetchRequest`.
//! - `FetchRequest::bind` resolves the request against a collection
//!   `Schema`, producing a `BoundQuery` that can match, order, and
//!   section records with no name lookups on the hot path.
//!
//! # Example
//!
//! ```ignore
//! use vista_query::{Predicate, QuerySpec};
//!
//! let spec = QuerySpec::new("orders")
//!     .filter(Predicate::gt("qty", 2))
//!     .order_by_asc("qty")
//!     .section_by("tag");
//!
//! let bound = spec.resolve().bind(&schema)?;
//! assert!(bound.has_order());
//! ```

#![no_std]

extern crate alloc;

pub mod clause;
pub mod predicate;
pub mod request;
pub mod spec;

pub use clause::{FetchClause, Filter, Limit, OrderBy, SectionBy};
pub use predicate::{CompareOp, Predicate};
pub use request::{BoundQuery, FetchRequest, SortDirection, SortKey};
pub use spec::QuerySpec;
