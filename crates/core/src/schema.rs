//! Collection schemas.
//!
//! A `Schema` names and types the fields of one collection. Field order
//! is significant: record values are stored by field position, and all
//! field lookups by name resolve to an index exactly once, when a query
//! is bound.

use crate::error::{Error, Result};
use crate::types::DataType;
use alloc::string::String;
use alloc::vec::Vec;

/// One named, typed field of a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    data_type: DataType,
}

impl FieldDef {
    /// Returns the field name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// The schema of one collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    collection: String,
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Returns the collection name.
    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the fields in declaration order.
    #[inline]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema declares no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolves a field name to its index.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolves a field name to its index, or an `UnknownField` error.
    pub fn require_field(&self, name: &str) -> Result<usize> {
        self.field_index(name)
            .ok_or_else(|| Error::unknown_field(&self.collection, name))
    }
}

/// Builder for `Schema`.
pub struct SchemaBuilder {
    collection: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Starts a schema for the named collection.
    pub fn new(collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        if collection.is_empty() {
            return Err(Error::invalid_spec("collection name must not be empty"));
        }
        Ok(Self {
            collection,
            fields: Vec::new(),
        })
    }

    /// Adds a field. Names must be unique and non-empty.
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_spec("field name must not be empty"));
        }
        if self.fields.iter().any(|f| f.name == name) {
            return Err(Error::invalid_spec("duplicate field name"));
        }
        self.fields.push(FieldDef { name, data_type });
        Ok(self)
    }

    /// Finishes the schema. At least one field is required.
    pub fn build(self) -> Result<Schema> {
        if self.fields.is_empty() {
            return Err(Error::invalid_spec("schema must declare at least one field"));
        }
        Ok(Schema {
            collection: self.collection,
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_schema() -> Schema {
        SchemaBuilder::new("orders")
            .unwrap()
            .field("qty", DataType::Int)
            .unwrap()
            .field("tag", DataType::Text)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_build() {
        let s = orders_schema();
        assert_eq!(s.collection(), "orders");
        assert_eq!(s.len(), 2);
        assert_eq!(s.fields()[1].name(), "tag");
        assert_eq!(s.fields()[1].data_type(), DataType::Text);
    }

    #[test]
    fn test_schema_field_index() {
        let s = orders_schema();
        assert_eq!(s.field_index("qty"), Some(0));
        assert_eq!(s.field_index("missing"), None);
        assert!(s.require_field("tag").is_ok());
        assert!(matches!(
            s.require_field("missing"),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = SchemaBuilder::new("orders")
            .unwrap()
            .field("qty", DataType::Int)
            .unwrap()
            .field("qty", DataType::Int);
        assert!(err.is_err());
    }

    #[test]
    fn test_schema_rejects_empty() {
        assert!(SchemaBuilder::new("").is_err());
        assert!(SchemaBuilder::new("orders").unwrap().build().is_err());
    }
}
