//! Vista Core - Core types for the Vista live-view engine.
//!
//! This crate provides the foundational types shared by the rest of the
//! workspace:
//!
//! - `Value`: runtime field values with a total order
//! - `Record`: one persisted entity instance (identity, version, values)
//! - `DataType` and `schema`: collection field declarations
//! - `Error`: error types grouped by recovery class
//!
//! # Example
//!
//! ```rust
//! use vista_core::{DataType, Record, Value};
//! use vista_core::schema::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new("orders")
//!     .unwrap()
//!     .field("qty", DataType::Int)
//!     .unwrap()
//!     .field("tag", DataType::Text)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new(1, vec![Value::Int(5), Value::Text("rush".into())]);
//!
//! assert_eq!(schema.field_index("tag"), Some(1));
//! assert_eq!(record.get(0), Some(&Value::Int(5)));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod record;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use record::{next_record_id, set_next_record_id, Record, RecordId};
pub use types::DataType;
pub use value::Value;
