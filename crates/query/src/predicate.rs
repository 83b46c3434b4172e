//! Predicate trees for record filtering.
//!
//! Predicates reference fields by name. They are evaluated only through
//! a `BoundQuery`, which resolves every name to a field index against a
//! concrete schema before any record is examined.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use vista_core::Value;

/// Comparison operator for field predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Evaluates the operator against an ordering between field value
    /// and operand.
    pub fn holds(&self, ordering: core::cmp::Ordering) -> bool {
        use core::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
        }
    }
}

/// A filter over records, by field name.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// Compares one field against a constant.
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Matches when every child matches.
    And(Vec<Predicate>),
    /// Matches when any child matches.
    Or(Vec<Predicate>),
    /// Matches when the child does not.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Builds a field comparison.
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality comparison.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// Shorthand for a less-than comparison.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    /// Shorthand for a greater-than comparison.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    /// Conjunction with another predicate.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            first => Predicate::And(alloc::vec![first, other]),
        }
    }

    /// Disjunction with another predicate.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut children) => {
                children.push(other);
                Predicate::Or(children)
            }
            first => Predicate::Or(alloc::vec![first, other]),
        }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Visits every field name referenced by this predicate.
    pub fn for_each_field(&self, f: &mut impl FnMut(&str)) {
        match self {
            Predicate::All => {}
            Predicate::Compare { field, .. } => f(field),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.for_each_field(f);
                }
            }
            Predicate::Not(child) => child.for_each_field(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cmp::Ordering;

    #[test]
    fn test_compare_op_holds() {
        assert!(CompareOp::Eq.holds(Ordering::Equal));
        assert!(!CompareOp::Eq.holds(Ordering::Less));
        assert!(CompareOp::Le.holds(Ordering::Equal));
        assert!(CompareOp::Le.holds(Ordering::Less));
        assert!(CompareOp::Ne.holds(Ordering::Greater));
        assert!(CompareOp::Ge.holds(Ordering::Greater));
        assert!(!CompareOp::Gt.holds(Ordering::Equal));
    }

    #[test]
    fn test_predicate_combinators() {
        let p = Predicate::gt("qty", 3i64)
            .and(Predicate::eq("tag", "rush"))
            .and(Predicate::lt("qty", 10i64));
        match &p {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_predicate_field_visit() {
        let p = Predicate::gt("qty", 3i64)
            .or(Predicate::eq("tag", "rush").not());
        let mut fields = alloc::vec::Vec::new();
        p.for_each_field(&mut |name| fields.push(alloc::string::String::from(name)));
        assert_eq!(fields, ["qty", "tag"]);
    }
}
