//! The diff engine.
//!
//! Compares two already-ordered snapshots and produces the minimal
//! `ListDiff` between them. Sections are matched by key; rows are
//! matched by record identity, with a longest-increasing-subsequence
//! pass separating rows that kept their relative order from rows that
//! genuinely moved. Overall cost is O(n log n) in the snapshot size:
//! hash joins on identity plus patience LIS, never a quadratic scan.

use crate::diff::{ListDiff, RowDelete, RowInsert, RowMove, RowUpdate, SectionDelete, SectionInsert};
use crate::snapshot::{RowPath, Snapshot};
use alloc::vec::Vec;
use hashbrown::HashMap;
use vista_core::{RecordId, Value};

/// Computes the diff from `old` to `new`.
pub fn diff(old: &Snapshot, new: &Snapshot) -> ListDiff {
    let mut out = ListDiff::new();

    // Match sections by key. Duplicate keys (possible when the sort
    // order does not cluster the section field) are disambiguated by
    // occurrence, so the n-th "a" section matches the n-th "a" section.
    let mut old_by_key: HashMap<(&Value, usize), usize> = HashMap::new();
    {
        let mut seen: HashMap<&Value, usize> = HashMap::new();
        for (index, section) in old.sections().iter().enumerate() {
            let occurrence = seen.entry(section.key()).or_insert(0);
            old_by_key.insert((section.key(), *occurrence), index);
            *occurrence += 1;
        }
    }

    let mut matched: Vec<(usize, usize)> = Vec::new();
    {
        let mut seen: HashMap<&Value, usize> = HashMap::new();
        for (new_index, section) in new.sections().iter().enumerate() {
            let occurrence = seen.entry(section.key()).or_insert(0);
            match old_by_key.remove(&(section.key(), *occurrence)) {
                Some(old_index) => matched.push((old_index, new_index)),
                None => out.section_inserts.push(SectionInsert {
                    index: new_index,
                    key: section.key().clone(),
                }),
            }
            *occurrence += 1;
        }
    }
    for (_, old_index) in old_by_key.drain() {
        out.section_deletes.push(SectionDelete {
            index: old_index,
            key: old.sections()[old_index].key().clone(),
        });
    }

    // A matched section that changed ordinal position is expressed as
    // delete + insert of the whole section; only sections on the LIS of
    // old positions keep row-level diffing.
    let old_positions: Vec<usize> = matched.iter().map(|&(o, _)| o).collect();
    let stable = longest_increasing_run(&old_positions);
    let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(matched.len());
    for (i, &(old_index, new_index)) in matched.iter().enumerate() {
        if stable[i] {
            pairs.push((old_index, new_index));
        } else {
            out.section_deletes.push(SectionDelete {
                index: old_index,
                key: old.sections()[old_index].key().clone(),
            });
            out.section_inserts.push(SectionInsert {
                index: new_index,
                key: new.sections()[new_index].key().clone(),
            });
        }
    }

    // Global identity positions across row-diffed sections, for
    // cross-section move detection.
    let mut old_pos: HashMap<RecordId, RowPath> = HashMap::new();
    let mut new_pos: HashMap<RecordId, RowPath> = HashMap::new();
    for &(old_index, new_index) in &pairs {
        for (row, entry) in old.sections()[old_index].rows().iter().enumerate() {
            old_pos.insert(entry.id, RowPath::new(old_index, row));
        }
        for (row, entry) in new.sections()[new_index].rows().iter().enumerate() {
            new_pos.insert(entry.id, RowPath::new(new_index, row));
        }
    }

    for &(old_index, new_index) in &pairs {
        diff_section_rows(old, new, old_index, new_index, &old_pos, &new_pos, &mut out);
    }

    out.normalize();
    out
}

/// Row-level diff of one matched, position-stable section pair.
#[allow(clippy::too_many_arguments)]
fn diff_section_rows(
    old: &Snapshot,
    new: &Snapshot,
    old_index: usize,
    new_index: usize,
    old_pos: &HashMap<RecordId, RowPath>,
    new_pos: &HashMap<RecordId, RowPath>,
    out: &mut ListDiff,
) {
    let old_rows = old.sections()[old_index].rows();
    let new_rows = new.sections()[new_index].rows();

    let mut old_row_of: HashMap<RecordId, usize> = HashMap::with_capacity(old_rows.len());
    for (row, entry) in old_rows.iter().enumerate() {
        old_row_of.insert(entry.id, row);
    }

    // Rows present in this section in both snapshots, in new order.
    let mut shared_old_rows: Vec<usize> = Vec::new();
    let mut shared_new_rows: Vec<usize> = Vec::new();
    for (new_row, entry) in new_rows.iter().enumerate() {
        if let Some(&old_row) = old_row_of.get(&entry.id) {
            shared_old_rows.push(old_row);
            shared_new_rows.push(new_row);
        }
    }

    let stable = longest_increasing_run(&shared_old_rows);
    for (i, (&old_row, &new_row)) in shared_old_rows.iter().zip(&shared_new_rows).enumerate() {
        let entry = &new_rows[new_row];
        if stable[i] {
            if old_rows[old_row].version != entry.version {
                out.row_updates.push(RowUpdate {
                    at: RowPath::new(new_index, new_row),
                    id: entry.id,
                });
            }
        } else {
            out.row_moves.push(RowMove {
                from: RowPath::new(old_index, old_row),
                to: RowPath::new(new_index, new_row),
                id: entry.id,
            });
        }
    }

    // Arrivals: rows new to this section.
    for (new_row, entry) in new_rows.iter().enumerate() {
        if old_row_of.contains_key(&entry.id) {
            continue;
        }
        match old_pos.get(&entry.id) {
            // Same identity elsewhere in the old snapshot: one
            // cross-section move, not delete + insert.
            Some(&from) => out.row_moves.push(RowMove {
                from,
                to: RowPath::new(new_index, new_row),
                id: entry.id,
            }),
            None => out.row_inserts.push(RowInsert {
                at: RowPath::new(new_index, new_row),
                id: entry.id,
            }),
        }
    }

    // Departures: rows gone from this section. A row still present
    // anywhere in a row-diffed new section either stayed here or was
    // already emitted as a move from the arrival side.
    for (old_row, entry) in old_rows.iter().enumerate() {
        if new_pos.contains_key(&entry.id) {
            continue;
        }
        out.row_deletes.push(RowDelete {
            from: RowPath::new(old_index, old_row),
            id: entry.id,
        });
    }
}

/// Marks the elements of `seq` that belong to one longest strictly
/// increasing subsequence. Patience sorting: O(n log n).
fn longest_increasing_run(seq: &[usize]) -> Vec<bool> {
    // tails[k] holds the index in seq of the smallest tail among
    // increasing subsequences of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = Vec::with_capacity(seq.len());

    for (i, &value) in seq.iter().enumerate() {
        let slot = tails.partition_point(|&j| seq[j] < value);
        parent.push(if slot > 0 { Some(tails[slot - 1]) } else { None });
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut on_run = alloc::vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        on_run[i] = true;
        cursor = parent[i];
    }
    on_run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{SnapshotBuilder, SnapshotEntry};
    use alloc::vec::Vec;

    /// Builds a snapshot from (section key, [(id, version)]) pairs.
    fn snap(sections: &[(&str, &[(u64, u64)])]) -> Snapshot {
        let mut builder = SnapshotBuilder::new();
        for (key, rows) in sections {
            for &(id, version) in *rows {
                builder.push(Value::Text((*key).into()), SnapshotEntry::new(id, version));
            }
        }
        builder.finish()
    }

    /// Builds an unsectioned snapshot from (id, version) pairs.
    fn flat(rows: &[(u64, u64)]) -> Snapshot {
        let mut builder = SnapshotBuilder::new();
        for &(id, version) in rows {
            builder.push(Value::Null, SnapshotEntry::new(id, version));
        }
        builder.finish()
    }

    #[test]
    fn test_identical_snapshots_empty_diff() {
        let a = snap(&[("x", &[(1, 1), (2, 1)]), ("y", &[(3, 1)])]);
        let b = a.clone();
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_empty_to_empty() {
        assert!(diff(&Snapshot::empty(), &Snapshot::empty()).is_empty());
    }

    #[test]
    fn test_empty_to_nonempty_is_section_inserts() {
        let new = snap(&[("x", &[(1, 1), (2, 1)])]);
        let d = diff(&Snapshot::empty(), &new);
        assert_eq!(d.section_inserts.len(), 1);
        // Rows are covered by the section insert.
        assert!(d.row_inserts.is_empty());
        assert!(d.row_deletes.is_empty());
    }

    #[test]
    fn test_nonempty_to_empty_is_section_deletes() {
        let old = snap(&[("x", &[(1, 1)]), ("y", &[(2, 1)])]);
        let d = diff(&old, &Snapshot::empty());
        assert_eq!(d.section_deletes.len(), 2);
        assert!(d.row_deletes.is_empty());
    }

    #[test]
    fn test_single_insertion_position() {
        // {A=5 (id 1), B=3 (id 2)} sorted ascending, insert C=4 (id 3):
        // order becomes [B, C, A] and C lands at row 1.
        let old = flat(&[(2, 1), (1, 1)]);
        let new = flat(&[(2, 1), (3, 1), (1, 1)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_inserts.len(), 1);
        assert_eq!(d.row_inserts[0].at, RowPath::new(0, 1));
        assert_eq!(d.row_inserts[0].id, 3);
        assert!(d.row_deletes.is_empty());
        assert!(d.row_moves.is_empty());
        assert!(d.section_inserts.is_empty());
    }

    #[test]
    fn test_single_move_is_minimal() {
        // One row relocates: exactly one move, nothing else.
        let old = flat(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
        let new = flat(&[(2, 1), (3, 1), (4, 1), (1, 1)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_moves.len(), 1);
        assert_eq!(d.row_moves[0].id, 1);
        assert_eq!(d.row_moves[0].from, RowPath::new(0, 0));
        assert_eq!(d.row_moves[0].to, RowPath::new(0, 3));
        assert!(d.row_inserts.is_empty());
        assert!(d.row_deletes.is_empty());
        assert!(d.row_updates.is_empty());
    }

    #[test]
    fn test_update_in_place_is_not_a_move() {
        let old = flat(&[(1, 1), (2, 1)]);
        let new = flat(&[(1, 2), (2, 1)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_updates.len(), 1);
        assert_eq!(d.row_updates[0].at, RowPath::new(0, 0));
        assert!(d.row_moves.is_empty());
    }

    #[test]
    fn test_moved_row_is_not_also_an_update() {
        // Relocated and re-versioned: the move alone describes it.
        let old = flat(&[(1, 1), (2, 1), (3, 1)]);
        let new = flat(&[(2, 1), (3, 1), (1, 5)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_moves.len(), 1);
        assert!(d.row_updates.is_empty());
    }

    #[test]
    fn test_shifted_rows_are_not_moves() {
        // Deleting the head shifts every index; no moves reported.
        let old = flat(&[(1, 1), (2, 1), (3, 1)]);
        let new = flat(&[(2, 1), (3, 1)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_deletes.len(), 1);
        assert_eq!(d.row_deletes[0].from, RowPath::new(0, 0));
        assert!(d.row_moves.is_empty());
    }

    #[test]
    fn test_section_emptied_is_full_section_delete() {
        // {"even": [2, 4], "odd": [1, 3]}, delete 2 and 4: one section
        // deletion, zero row-level deletions for that section.
        let old = snap(&[("even", &[(2, 1), (4, 1)]), ("odd", &[(1, 1), (3, 1)])]);
        let new = snap(&[("odd", &[(1, 1), (3, 1)])]);

        let d = diff(&old, &new);
        assert_eq!(d.section_deletes.len(), 1);
        assert_eq!(d.section_deletes[0].index, 0);
        assert!(d.row_deletes.is_empty());
        assert!(d.section_inserts.is_empty());
    }

    #[test]
    fn test_new_section_covers_its_rows() {
        let old = snap(&[("a", &[(1, 1)])]);
        let new = snap(&[("a", &[(1, 1)]), ("b", &[(2, 1), (3, 1)])]);

        let d = diff(&old, &new);
        assert_eq!(d.section_inserts.len(), 1);
        assert_eq!(d.section_inserts[0].index, 1);
        assert!(d.row_inserts.is_empty());
    }

    #[test]
    fn test_section_relocation_is_delete_plus_insert() {
        let old = snap(&[("a", &[(1, 1)]), ("b", &[(2, 1)]), ("c", &[(3, 1)])]);
        let new = snap(&[("b", &[(2, 1)]), ("c", &[(3, 1)]), ("a", &[(1, 1)])]);

        let d = diff(&old, &new);
        assert_eq!(d.section_deletes.len(), 1);
        assert_eq!(d.section_deletes[0].key, Value::Text("a".into()));
        assert_eq!(d.section_inserts.len(), 1);
        assert_eq!(d.section_inserts[0].index, 2);
        // Rows of the relocated section produce no row-level entries.
        assert!(d.row_moves.is_empty());
        assert!(d.row_inserts.is_empty());
        assert!(d.row_deletes.is_empty());
    }

    #[test]
    fn test_cross_section_move() {
        let old = snap(&[("a", &[(1, 1), (2, 1)]), ("b", &[(3, 1)])]);
        let new = snap(&[("a", &[(1, 1)]), ("b", &[(2, 2), (3, 1)])]);

        let d = diff(&old, &new);
        assert_eq!(d.row_moves.len(), 1);
        assert_eq!(d.row_moves[0].id, 2);
        assert_eq!(d.row_moves[0].from, RowPath::new(0, 1));
        assert_eq!(d.row_moves[0].to, RowPath::new(1, 0));
        assert!(d.row_inserts.is_empty());
        assert!(d.row_deletes.is_empty());
    }

    #[test]
    fn test_mixed_batch() {
        let old = flat(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
        // Delete 2, insert 9 at the front, update 3 in place.
        let new = flat(&[(9, 1), (1, 1), (3, 2), (4, 1)]);

        let d = diff(&old, &new);
        assert_eq!(d.row_inserts.len(), 1);
        assert_eq!(d.row_inserts[0].id, 9);
        assert_eq!(d.row_deletes.len(), 1);
        assert_eq!(d.row_deletes[0].id, 2);
        assert_eq!(d.row_updates.len(), 1);
        assert_eq!(d.row_updates[0].id, 3);
        assert!(d.row_moves.is_empty());
    }

    #[test]
    fn test_lis_marks_longest_run() {
        let on = longest_increasing_run(&[1, 0, 2]);
        assert_eq!(on.iter().filter(|&&b| b).count(), 2);

        let on = longest_increasing_run(&[5, 0, 1, 2]);
        assert_eq!(on, [false, true, true, true]);

        let on: Vec<bool> = longest_increasing_run(&[]);
        assert!(on.is_empty());
    }
}
