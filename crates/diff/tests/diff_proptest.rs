//! Property-based tests for the diff engine using proptest.
//!
//! The central property: applying a computed diff to the old snapshot
//! reproduces the new snapshot exactly, for arbitrary snapshot pairs.

use proptest::prelude::*;
use vista_core::{RecordId, Value};
use vista_diff::{engine, ListDiff, RowPath, Section, Snapshot, SnapshotEntry};

const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];

/// Replays a diff on top of `old`. Section insertions and row
/// insertions take their content from `new`, which is exactly what an
/// observer holding the new snapshot would do.
fn apply(old: &Snapshot, new: &Snapshot, diff: &ListDiff) -> Snapshot {
    let mut sections: Vec<(Value, Vec<Option<SnapshotEntry>>)> = old
        .sections()
        .iter()
        .map(|s| {
            (
                s.key().clone(),
                s.rows().iter().copied().map(Some).collect(),
            )
        })
        .collect();

    // Remove departing rows in old coordinates (moves depart too).
    let mut departures: Vec<RowPath> = diff.row_deletes.iter().map(|d| d.from).collect();
    departures.extend(diff.row_moves.iter().map(|m| m.from));
    for path in departures {
        sections[path.section].1[path.row] = None;
    }
    for (_, rows) in &mut sections {
        rows.retain(|r| r.is_some());
    }

    // Remove deleted sections, highest old index first.
    let mut deletes: Vec<usize> = diff.section_deletes.iter().map(|d| d.index).collect();
    deletes.sort_unstable_by(|a, b| b.cmp(a));
    for index in deletes {
        sections.remove(index);
    }

    // Insert new sections with their rows, ascending new index.
    let mut inserts: Vec<usize> = diff.section_inserts.iter().map(|i| i.index).collect();
    inserts.sort_unstable();
    for index in inserts {
        let section = &new.sections()[index];
        sections.insert(
            index,
            (
                section.key().clone(),
                section.rows().iter().copied().map(Some).collect(),
            ),
        );
    }

    // Place arriving rows (inserts and move targets), ascending new path.
    let mut arrivals: Vec<RowPath> = diff.row_inserts.iter().map(|i| i.at).collect();
    arrivals.extend(diff.row_moves.iter().map(|m| m.to));
    arrivals.sort_unstable();
    for path in arrivals {
        let entry = *new.entry(path).unwrap();
        sections[path.section].1.insert(path.row, Some(entry));
    }

    // Refresh updated rows in place.
    for update in &diff.row_updates {
        let entry = *new.entry(update.at).unwrap();
        sections[update.at.section].1[update.at.row] = Some(entry);
    }

    Snapshot::from_sections(
        sections
            .into_iter()
            .map(|(key, rows)| Section::new(key, rows.into_iter().flatten().collect()))
            .collect(),
    )
}

/// Generates a snapshot over ids drawn from a shared pool, so pairs of
/// generated snapshots overlap and exercise moves and updates.
fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
    let keys = proptest::sample::subsequence(KEYS.to_vec(), 1..=4);
    let ids = proptest::sample::subsequence((1u64..40).collect::<Vec<RecordId>>(), 0..=24)
        .prop_shuffle();
    let versions = prop::collection::vec(1u64..4, 24);

    (keys, ids, versions).prop_map(|(keys, ids, versions)| {
        let mut rows_per_key: Vec<Vec<SnapshotEntry>> = vec![Vec::new(); keys.len()];
        for (i, id) in ids.iter().enumerate() {
            let version = versions[i % versions.len()];
            rows_per_key[i % keys.len()].push(SnapshotEntry::new(*id, version));
        }
        Snapshot::from_sections(
            keys.iter()
                .zip(rows_per_key)
                .filter(|(_, rows)| !rows.is_empty())
                .map(|(key, rows)| Section::new(Value::Text((*key).into()), rows))
                .collect(),
        )
    })
}

proptest! {
    /// Applying the diff to the old snapshot reproduces the new one.
    #[test]
    fn diff_applies_cleanly(old in arb_snapshot(), new in arb_snapshot()) {
        let diff = engine::diff(&old, &new);
        let replayed = apply(&old, &new, &diff);
        prop_assert_eq!(replayed, new);
    }

    /// Diffing a snapshot against itself yields no operations.
    #[test]
    fn self_diff_is_empty(snapshot in arb_snapshot()) {
        let diff = engine::diff(&snapshot, &snapshot);
        prop_assert!(diff.is_empty());
    }

    /// Diffing against empty yields only section-level operations.
    #[test]
    fn diff_to_empty_is_section_level(snapshot in arb_snapshot()) {
        let gone = engine::diff(&snapshot, &Snapshot::empty());
        prop_assert_eq!(gone.section_deletes.len(), snapshot.section_count());
        prop_assert!(gone.row_deletes.is_empty());
        prop_assert!(gone.row_moves.is_empty());

        let born = engine::diff(&Snapshot::empty(), &snapshot);
        prop_assert_eq!(born.section_inserts.len(), snapshot.section_count());
        prop_assert!(born.row_inserts.is_empty());
    }

    /// Relocating exactly one row inside a section produces exactly one
    /// move and no inserts or deletes.
    #[test]
    fn single_relocation_is_one_move(
        len in 2usize..12,
        from in 0usize..12,
        to in 0usize..12,
    ) {
        let from = from % len;
        let to = to % len;
        prop_assume!(from != to);

        let rows: Vec<SnapshotEntry> =
            (0..len as u64).map(|id| SnapshotEntry::new(id + 1, 1)).collect();
        let mut relocated = rows.clone();
        let entry = relocated.remove(from);
        relocated.insert(to, entry);
        prop_assume!(relocated != rows);

        let old = Snapshot::from_sections(vec![Section::new(Value::Null, rows)]);
        let new = Snapshot::from_sections(vec![Section::new(Value::Null, relocated)]);

        let diff = engine::diff(&old, &new);
        prop_assert_eq!(diff.row_moves.len(), 1);
        prop_assert!(diff.row_inserts.is_empty());
        prop_assert!(diff.row_deletes.is_empty());
        prop_assert!(diff.section_inserts.is_empty());
        prop_assert!(diff.section_deletes.is_empty());
    }
}
