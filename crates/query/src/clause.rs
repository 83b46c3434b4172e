//! Fetch clauses.
//!
//! A query specification is an ordered list of independent clause
//! objects, each of which knows how to apply itself to a shared
//! `FetchRequest`. Clauses are deliberately opaque to the rest of the
//! engine: monitors replay them onto a fresh request and only ever see
//! the resulting descriptor.

use crate::predicate::Predicate;
use crate::request::{FetchRequest, SortDirection, SortKey};
use alloc::string::String;

/// A single transformation of a fetch request.
pub trait FetchClause {
    /// Applies this clause to the request.
    fn apply_to(&self, request: &mut FetchRequest);
}

/// Narrows the result set with a predicate.
pub struct Filter {
    predicate: Predicate,
}

impl Filter {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

impl FetchClause for Filter {
    fn apply_to(&self, request: &mut FetchRequest) {
        request.add_filter(self.predicate.clone());
    }
}

/// Appends an ordering rule.
pub struct OrderBy {
    field: String,
    direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl FetchClause for OrderBy {
    fn apply_to(&self, request: &mut FetchRequest) {
        request.add_order(SortKey {
            field: self.field.clone(),
            direction: self.direction,
        });
    }
}

/// Groups rows into sections by a field's value.
pub struct SectionBy {
    field: String,
}

impl SectionBy {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl FetchClause for SectionBy {
    fn apply_to(&self, request: &mut FetchRequest) {
        request.set_section_field(self.field.clone());
    }
}

/// Caps the number of rows fetched.
pub struct Limit {
    limit: usize,
}

impl Limit {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl FetchClause for Limit {
    fn apply_to(&self, request: &mut FetchRequest) {
        request.set_limit(self.limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clauses_apply_in_order() {
        let mut request = FetchRequest::new("orders");
        Filter::new(Predicate::gt("qty", 1i64)).apply_to(&mut request);
        OrderBy::asc("qty").apply_to(&mut request);
        OrderBy::desc("tag").apply_to(&mut request);
        SectionBy::new("tag").apply_to(&mut request);
        Limit::new(50).apply_to(&mut request);

        assert!(request.predicate().is_some());
        assert_eq!(request.order().len(), 2);
        assert_eq!(request.order()[0].field, "qty");
        assert_eq!(request.section_field(), Some("tag"));
        assert_eq!(request.limit(), Some(50));
    }

    #[test]
    fn test_last_section_clause_wins() {
        let mut request = FetchRequest::new("orders");
        SectionBy::new("tag").apply_to(&mut request);
        SectionBy::new("qty").apply_to(&mut request);
        assert_eq!(request.section_field(), Some("qty"));
    }
}
