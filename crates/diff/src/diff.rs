//! Structural list diffs.
//!
//! A `ListDiff` describes the minimal set of section and row operations
//! transforming one snapshot into the next. Diffs are transient: they
//! are handed to observers and discarded.
//!
//! Rows belonging to an inserted or deleted section are covered by the
//! section operation and never appear as row-level entries.

use crate::snapshot::RowPath;
use alloc::vec::Vec;
use vista_core::{RecordId, Value};

/// A section that appears in the new snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionInsert {
    /// Index of the section in the new snapshot.
    pub index: usize,
    pub key: Value,
}

/// A section that disappears from the old snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionDelete {
    /// Index of the section in the old snapshot.
    pub index: usize,
    pub key: Value,
}

/// A row that appears in the new snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowInsert {
    /// Position in the new snapshot.
    pub at: RowPath,
    pub id: RecordId,
}

/// A row that disappears from the old snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowDelete {
    /// Position in the old snapshot.
    pub from: RowPath,
    pub id: RecordId,
}

/// A row present in both snapshots at different positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowMove {
    /// Position in the old snapshot.
    pub from: RowPath,
    /// Position in the new snapshot.
    pub to: RowPath,
    pub id: RecordId,
}

/// A row whose position is unchanged but whose record changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowUpdate {
    /// Position in the new snapshot.
    pub at: RowPath,
    pub id: RecordId,
}

/// The full set of operations from one snapshot to the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListDiff {
    pub section_inserts: Vec<SectionInsert>,
    pub section_deletes: Vec<SectionDelete>,
    pub row_inserts: Vec<RowInsert>,
    pub row_deletes: Vec<RowDelete>,
    pub row_moves: Vec<RowMove>,
    pub row_updates: Vec<RowUpdate>,
}

impl ListDiff {
    /// Creates an empty diff.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the diff contains no operations.
    pub fn is_empty(&self) -> bool {
        self.section_inserts.is_empty()
            && self.section_deletes.is_empty()
            && self.row_inserts.is_empty()
            && self.row_deletes.is_empty()
            && self.row_moves.is_empty()
            && self.row_updates.is_empty()
    }

    /// Returns the total number of operations.
    pub fn len(&self) -> usize {
        self.section_inserts.len()
            + self.section_deletes.len()
            + self.row_inserts.len()
            + self.row_deletes.len()
            + self.row_moves.len()
            + self.row_updates.len()
    }

    /// Sorts every operation list into path order, so equal diffs
    /// compare equal regardless of discovery order.
    pub(crate) fn normalize(&mut self) {
        self.section_inserts.sort_by_key(|op| op.index);
        self.section_deletes.sort_by_key(|op| op.index);
        self.row_inserts.sort_by_key(|op| op.at);
        self.row_deletes.sort_by_key(|op| op.from);
        self.row_moves.sort_by_key(|op| op.to);
        self.row_updates.sort_by_key(|op| op.at);
    }
}
