//! Error types for the Vista engine.
//!
//! Variants fall into four classes: configuration errors (fatal at
//! monitor construction), store access errors (recoverable, last-good
//! state retained), `Invalidated` (terminal for a monitor instance),
//! and `OffContext` (programmer error, asserted in debug builds).

use crate::record::RecordId;
use alloc::string::String;
use core::fmt;

/// Result type alias for Vista operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for Vista operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A list query was declared without any ordering rule.
    MissingSortOrder {
        entity: String,
    },
    /// A query names a field the collection schema does not declare.
    UnknownField {
        entity: String,
        field: String,
    },
    /// A query or schema definition is malformed.
    InvalidSpec {
        message: String,
    },
    /// The named collection does not exist.
    CollectionNotFound {
        name: String,
    },
    /// A collection with the same name already exists.
    CollectionExists {
        name: String,
    },
    /// No record with the given identity exists in the collection.
    RecordNotFound {
        collection: String,
        id: RecordId,
    },
    /// The store cannot currently be reached.
    StoreUnavailable {
        reason: String,
    },
    /// Record values do not fit the collection schema.
    SchemaMismatch {
        collection: String,
        message: String,
    },
    /// The monitor was invalidated and cannot be used again.
    Invalidated,
    /// A context-affine operation was called off its affinity context.
    OffContext {
        operation: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingSortOrder { entity } => {
                write!(f, "list query on {} has no ordering rule", entity)
            }
            Error::UnknownField { entity, field } => {
                write!(f, "unknown field {} on {}", field, entity)
            }
            Error::InvalidSpec { message } => {
                write!(f, "invalid specification: {}", message)
            }
            Error::CollectionNotFound { name } => {
                write!(f, "collection not found: {}", name)
            }
            Error::CollectionExists { name } => {
                write!(f, "collection already exists: {}", name)
            }
            Error::RecordNotFound { collection, id } => {
                write!(f, "record {} not found in {}", id, collection)
            }
            Error::StoreUnavailable { reason } => {
                write!(f, "store unavailable: {}", reason)
            }
            Error::SchemaMismatch { collection, message } => {
                write!(f, "schema mismatch in {}: {}", collection, message)
            }
            Error::Invalidated => write!(f, "monitor has been invalidated"),
            Error::OffContext { operation } => {
                write!(f, "{} called off the affinity context", operation)
            }
        }
    }
}

impl Error {
    /// Creates a missing sort order error.
    pub fn missing_sort_order(entity: impl Into<String>) -> Self {
        Error::MissingSortOrder {
            entity: entity.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Error::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid specification error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Error::InvalidSpec {
            message: message.into(),
        }
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Error::CollectionNotFound { name: name.into() }
    }

    /// Creates a record not found error.
    pub fn record_not_found(collection: impl Into<String>, id: RecordId) -> Self {
        Error::RecordNotFound {
            collection: collection.into(),
            id,
        }
    }

    /// Creates a store unavailable error.
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Error::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a schema mismatch error.
    pub fn schema_mismatch(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Returns true for configuration errors, which are fatal at
    /// monitor construction.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingSortOrder { .. } | Error::UnknownField { .. } | Error::InvalidSpec { .. }
        )
    }

    /// Returns true for store access errors, which leave a live monitor
    /// on its last-good snapshot.
    pub fn is_store_access(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable { .. }
                | Error::CollectionNotFound { .. }
                | Error::RecordNotFound { .. }
                | Error::SchemaMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::missing_sort_order("orders");
        assert!(err.to_string().contains("orders"));

        let err = Error::unknown_field("orders", "qty");
        assert!(err.to_string().contains("qty"));

        let err = Error::record_not_found("orders", 9);
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::missing_sort_order("orders").is_configuration());
        assert!(Error::invalid_spec("bad").is_configuration());
        assert!(Error::store_unavailable("offline").is_store_access());
        assert!(!Error::Invalidated.is_configuration());
        assert!(!Error::Invalidated.is_store_access());
    }
}
