//! Fetch requests and bound queries.
//!
//! A `FetchRequest` is the shared mutable descriptor that fetch clauses
//! are applied to, in order. Binding a request against a schema
//! resolves every field name to an index once, producing a `BoundQuery`
//! that can match, order, and section records without further lookups.

use crate::predicate::{CompareOp, Predicate};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use vista_core::schema::Schema;
use vista_core::{Record, Result, Value};

/// Direction of one ordering rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One ordering rule, by field name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates an ascending sort key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending sort key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// The mutable fetch descriptor clauses are applied to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchRequest {
    entity: String,
    predicate: Option<Predicate>,
    order: Vec<SortKey>,
    section_field: Option<String>,
    limit: Option<usize>,
}

impl FetchRequest {
    /// Creates an empty request for the named entity.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    /// Returns the entity (collection) name.
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns the accumulated predicate, if any.
    #[inline]
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Returns the ordering rules in application order.
    #[inline]
    pub fn order(&self) -> &[SortKey] {
        &self.order
    }

    /// Returns the section grouping field, if any.
    #[inline]
    pub fn section_field(&self) -> Option<&str> {
        self.section_field.as_deref()
    }

    /// Returns the row limit, if any.
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Narrows the request with a predicate. Repeated filters are
    /// combined with AND.
    pub fn add_filter(&mut self, predicate: Predicate) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
    }

    /// Appends an ordering rule.
    pub fn add_order(&mut self, key: SortKey) {
        self.order.push(key);
    }

    /// Sets the section grouping field. The last clause wins.
    pub fn set_section_field(&mut self, field: impl Into<String>) {
        self.section_field = Some(field.into());
    }

    /// Sets the row limit. The last clause wins.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = Some(limit);
    }

    /// Resolves every field name against the schema.
    pub fn bind(&self, schema: &Schema) -> Result<BoundQuery> {
        let predicate = match &self.predicate {
            Some(p) => Some(bind_predicate(p, schema)?),
            None => None,
        };

        let mut order = Vec::with_capacity(self.order.len());
        for key in &self.order {
            order.push(BoundSortKey {
                index: schema.require_field(&key.field)?,
                descending: key.direction == SortDirection::Descending,
            });
        }

        let section = match &self.section_field {
            Some(field) => Some(schema.require_field(field)?),
            None => None,
        };

        Ok(BoundQuery {
            entity: self.entity.clone(),
            predicate,
            order,
            section,
            limit: self.limit,
        })
    }
}

/// A predicate with field names resolved to indices.
#[derive(Clone, Debug)]
enum BoundPredicate {
    Compare {
        index: usize,
        op: CompareOp,
        value: Value,
    },
    And(Vec<BoundPredicate>),
    Or(Vec<BoundPredicate>),
    Not(Box<BoundPredicate>),
    All,
}

fn bind_predicate(predicate: &Predicate, schema: &Schema) -> Result<BoundPredicate> {
    Ok(match predicate {
        Predicate::All => BoundPredicate::All,
        Predicate::Compare { field, op, value } => BoundPredicate::Compare {
            index: schema.require_field(field)?,
            op: *op,
            value: value.clone(),
        },
        Predicate::And(children) => {
            let mut bound = Vec::with_capacity(children.len());
            for child in children {
                bound.push(bind_predicate(child, schema)?);
            }
            BoundPredicate::And(bound)
        }
        Predicate::Or(children) => {
            let mut bound = Vec::with_capacity(children.len());
            for child in children {
                bound.push(bind_predicate(child, schema)?);
            }
            BoundPredicate::Or(bound)
        }
        Predicate::Not(child) => BoundPredicate::Not(Box::new(bind_predicate(child, schema)?)),
    })
}

impl BoundPredicate {
    fn matches(&self, record: &Record) -> bool {
        match self {
            BoundPredicate::All => true,
            BoundPredicate::Compare { index, op, value } => {
                let field = record.get(*index).unwrap_or(&Value::Null);
                op.holds(field.cmp(value))
            }
            BoundPredicate::And(children) => children.iter().all(|c| c.matches(record)),
            BoundPredicate::Or(children) => children.iter().any(|c| c.matches(record)),
            BoundPredicate::Not(child) => !child.matches(record),
        }
    }
}

/// One ordering rule with its field index resolved.
#[derive(Clone, Copy, Debug)]
struct BoundSortKey {
    index: usize,
    descending: bool,
}

/// A query resolved against a concrete schema.
///
/// The ordering defined by `compare` is total: after all sort keys the
/// record identity breaks any remaining tie, so a snapshot order is
/// never ambiguous.
#[derive(Clone, Debug)]
pub struct BoundQuery {
    entity: String,
    predicate: Option<BoundPredicate>,
    order: Vec<BoundSortKey>,
    section: Option<usize>,
    limit: Option<usize>,
}

impl BoundQuery {
    /// Returns the entity (collection) name.
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns true if the query declares at least one ordering rule.
    #[inline]
    pub fn has_order(&self) -> bool {
        !self.order.is_empty()
    }

    /// Returns true if the query groups records into sections.
    #[inline]
    pub fn is_sectioned(&self) -> bool {
        self.section.is_some()
    }

    /// Returns the row limit, if any.
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns true if the record satisfies the predicate.
    pub fn matches(&self, record: &Record) -> bool {
        match &self.predicate {
            Some(p) => p.matches(record),
            None => true,
        }
    }

    /// Compares two records under the query's ordering rules.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.order {
            let left = a.get(key.index).unwrap_or(&Value::Null);
            let right = b.get(key.index).unwrap_or(&Value::Null);
            let ordering = if key.descending {
                right.cmp(left)
            } else {
                left.cmp(right)
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id().cmp(&b.id())
    }

    /// Returns the record's section key, or `Value::Null` for
    /// unsectioned queries.
    pub fn section_key(&self, record: &Record) -> Value {
        match self.section {
            Some(index) => record.get(index).cloned().unwrap_or(Value::Null),
            None => Value::Null,
        }
    }
}
