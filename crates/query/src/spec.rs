//! Query specifications.
//!
//! A `QuerySpec` names an entity and carries an ordered list of fetch
//! clauses. It is immutable once a monitor has been created from it;
//! `resolve()` replays the clauses onto a fresh request each time, so a
//! spec can be resolved repeatedly without accumulating state.

use crate::clause::{FetchClause, Filter, Limit, OrderBy, SectionBy};
use crate::predicate::Predicate;
use crate::request::FetchRequest;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// A complete query specification: entity plus ordered clauses.
pub struct QuerySpec {
    entity: String,
    clauses: Vec<Box<dyn FetchClause>>,
}

impl QuerySpec {
    /// Starts a specification for the named entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            clauses: Vec::new(),
        }
    }

    /// Returns the entity (collection) name.
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the number of clauses.
    #[inline]
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// Appends an arbitrary clause.
    pub fn clause(mut self, clause: Box<dyn FetchClause>) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Appends a filter clause.
    pub fn filter(self, predicate: Predicate) -> Self {
        self.clause(Box::new(Filter::new(predicate)))
    }

    /// Appends an ascending ordering clause.
    pub fn order_by_asc(self, field: impl Into<String>) -> Self {
        self.clause(Box::new(OrderBy::asc(field)))
    }

    /// Appends a descending ordering clause.
    pub fn order_by_desc(self, field: impl Into<String>) -> Self {
        self.clause(Box::new(OrderBy::desc(field)))
    }

    /// Appends a section grouping clause.
    pub fn section_by(self, field: impl Into<String>) -> Self {
        self.clause(Box::new(SectionBy::new(field)))
    }

    /// Appends a row limit clause.
    pub fn limit(self, limit: usize) -> Self {
        self.clause(Box::new(Limit::new(limit)))
    }

    /// Replays the clauses onto a fresh request.
    pub fn resolve(&self) -> FetchRequest {
        let mut request = FetchRequest::new(self.entity.clone());
        for clause in &self.clauses {
            clause.apply_to(&mut request);
        }
        request
    }
}
