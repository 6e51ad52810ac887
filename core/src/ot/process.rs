//! Processor: linearizes a tree of edits into one text
//!
//! Starting at the root revision, the processor repeatedly picks the winning
//! child of the current revision, applies it, and rebases the losing siblings
//! (and their subtrees) onto it. Every iteration consumes exactly one edit.
//!
//! On entry every edit's operations are normalized and its inserts are
//! anchored to their original offsets, so concurrent inserts pushed onto one
//! position come out in the same order whichever sibling wins.

use super::changeset::ChangeSet;
use super::rebase::rebase;
use crate::edit::{normalize_operations, Edit};
use crate::error::{ReconcileError, Result};
use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processed {
    /// Merged text
    pub text: String,

    /// Revision reached after the last applied edit
    pub revision: String,

    /// Revisions in the order they were applied
    pub applied: Vec<String>,
}

/// Merge `edits` on top of `initial_text` at `root_revision`
///
/// Siblings are ordered by revision id (byte-wise), the smallest applies
/// first. Inserts that end up on the same position are ordered by their
/// original offset, then by revision id. Caller-owned edits are never
/// modified; the pass works on normalized copies.
///
/// # Errors
///
/// [`ReconcileError::InconsistentChangeSet`] when edits remain that cannot be
/// reached from the current revision.
///
/// # Example
///
/// ```rust
/// use textsync_core::edit::{Edit, Operation};
/// use textsync_core::process;
///
/// let edits = vec![
///     Edit::new("s2::1", "root", vec![Operation::insert(5, " world")]),
///     Edit::new("s1::1", "root", vec![Operation::insert(0, "> ")]),
/// ];
///
/// let merged = process("hello", "root", &edits).unwrap();
/// assert_eq!(merged.text, "> hello world");
/// assert_eq!(merged.revision, "s2::1");
/// ```
pub fn process(initial_text: &str, root_revision: &str, edits: &[Edit]) -> Result<Processed> {
    let ordinals: BTreeMap<&str, usize> = edits
        .iter()
        .flat_map(|edit| [edit.revision.as_str(), edit.based_on.as_str()])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(ordinal, revision)| (revision, ordinal))
        .collect();
    let ordinal = |revision: &str| ordinals.get(revision).copied().unwrap_or_default();

    let mut pending = ChangeSet::new();
    for edit in edits {
        if edit.revision == root_revision {
            tracing::debug!(revision = %edit.revision, "edit already part of the root state");
            continue;
        }
        let mut edit = edit.clone();
        edit.operations = normalize_operations(&edit.operations);
        edit.anchor_inserts(ordinal(&edit.based_on), ordinal(&edit.revision));
        pending.insert(edit);
    }

    let mut rope = Rope::from_str(initial_text);
    let mut current = root_revision.to_string();
    let mut applied = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let Some(mut winner) = pending.take_winner(&current) else {
            return Err(ReconcileError::InconsistentChangeSet {
                revision: current,
                pending: pending.revisions().map(String::from).collect(),
            });
        };

        tracing::debug!(
            revision = %winner.revision,
            based_on = %winner.based_on,
            operations = winner.operations.len(),
            "applying edit"
        );
        winner.apply_to(&mut rope);
        current = winner.revision.clone();

        for revision in pending.children_of(&winner.based_on) {
            let Some(mut sibling) = pending.remove(&revision) else {
                continue;
            };
            if let Err(err) = rebase(&mut pending, &mut winner, &mut sibling) {
                tracing::error!(error = %err, "rebase skipped");
            }
            pending.insert(sibling);
        }

        applied.push(winner.revision);
    }

    Ok(Processed {
        text: rope.to_string(),
        revision: current,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::edit::Operation;
    use crate::test_support::init_test_logging;
    use proptest::prelude::*;

    fn edit(revision: &str, based_on: &str, operations: Vec<Operation>) -> Edit {
        Edit::new(revision, based_on, operations)
    }

    #[test]
    fn test_no_edits() {
        let result = process("text", "root", &[]).unwrap();
        assert_eq!(result.text, "text");
        assert_eq!(result.revision, "root");
        assert!(result.applied.is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let edits = vec![
            edit("a::2", "a::1", vec![Operation::insert(3, "!")]),
            edit("a::1", "root", vec![Operation::insert(0, "Hey")]),
        ];

        let result = process("", "root", &edits).unwrap();
        assert_eq!(result.text, "Hey!");
        assert_eq!(result.applied, vec!["a::1", "a::2"]);
        assert_eq!(result.revision, "a::2");
    }

    #[test]
    fn test_noop_edit_advances_revision() {
        let edits = vec![
            edit("a::1", "root", vec![]),
            edit("a::2", "a::1", vec![Operation::insert(0, "x")]),
        ];

        let result = process("abc", "root", &edits).unwrap();
        assert_eq!(result.text, "xabc");
        assert_eq!(result.revision, "a::2");

        let result = process("abc", "root", &edits[..1]).unwrap();
        assert_eq!(result.text, "abc");
        assert_eq!(result.revision, "a::1");
    }

    #[test]
    fn test_inconsistent_change_set() {
        init_test_logging();
        let edits = vec![
            edit("a::1", "root", vec![Operation::insert(0, "x")]),
            edit("b::7", "b::6", vec![Operation::insert(0, "y")]),
        ];

        let err = process("", "root", &edits).unwrap_err();
        match err {
            ReconcileError::InconsistentChangeSet { revision, pending } => {
                assert_eq!(revision, "a::1");
                assert_eq!(pending, vec!["b::7"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_caller_edits_untouched() {
        let edits = vec![
            edit("a::1", "root", vec![Operation::insert(0, "ab")]),
            edit("b::1", "root", vec![Operation::insert(1, "x")]),
        ];
        let snapshot = edits.clone();

        let result = process("012", "root", &edits).unwrap();
        assert_eq!(result.text, "ab0x12");
        assert_eq!(edits, snapshot);
    }

    #[test]
    fn test_root_revision_edit_is_ignored() {
        let edits = vec![
            edit("a::1", "seed", vec![Operation::insert(0, "ignored")]),
            edit("a::2", "a::1", vec![Operation::insert(0, "x")]),
        ];

        let result = process("abc", "a::1", &edits).unwrap();
        assert_eq!(result.text, "xabc");
    }

    #[test]
    fn test_concurrent_delete_and_insert_commute() {
        // A deletes "quick ", B appends at the end
        let a = edit("a::1", "root", vec![Operation::delete(4, 6)]);
        let b = edit("b::1", "root", vec![Operation::insert(19, " today")]);
        let text = "the quick brown fox";

        let ab = process(text, "root", &[a.clone(), b.clone()]).unwrap();
        // swap who wins by renaming
        let a2 = Edit { revision: "z::1".to_string(), ..a };
        let ba = process(text, "root", &[a2, b]).unwrap();

        assert_eq!(ab.text, "the brown fox today");
        assert_eq!(ab.text, ba.text);
        assert_ne!(ab.revision, ba.revision);
    }

    #[test]
    fn test_three_siblings() {
        let text = "0123456789";
        let edits = vec![
            edit("c::1", "root", vec![Operation::insert(10, "C")]),
            edit("a::1", "root", vec![Operation::delete(0, 3)]),
            edit("b::1", "root", vec![Operation::insert(5, "B")]),
        ];

        let result = process(text, "root", &edits).unwrap();
        assert_eq!(result.text, "34B56789C");
        assert_eq!(result.applied, vec!["a::1", "b::1", "c::1"]);
    }

    #[test]
    fn test_two_sessions_with_subtrees() {
        let base = "left|right";
        let s1a = edit("s1::1", "root", diff(base, "LEFT|right"));
        let s1b = edit("s1::2", "s1::1", diff("LEFT|right", "LEFT!|right"));
        let s2a = edit("s2::1", "root", diff(base, "left|rite"));
        let s2b = edit("s2::2", "s2::1", diff("left|rite", "left|rite!!"));

        let result = process(base, "root", &[s2b, s1b, s2a, s1a]).unwrap();
        assert_eq!(result.text, "LEFT!|rite!!");
    }

    #[test]
    fn test_wrapped_insert_survives_processing() {
        let edits = vec![
            edit("a::1", "root", vec![Operation::delete(1, 6)]),
            edit("b::1", "root", vec![Operation::insert(3, "new")]),
            edit("b::2", "b::1", vec![Operation::insert(13, "?")]),
        ];

        let result = process("0123456789", "root", &edits).unwrap();
        assert_eq!(result.text, "0new789?");
    }

    #[test]
    fn test_collapsed_inserts_keep_original_order() {
        let text = "0123456789";
        let named = |delete: &str, y: &str, x: &str| {
            vec![
                edit(delete, "root", vec![Operation::delete(4, 3)]),
                edit(y, "root", vec![Operation::insert(7, "y")]),
                edit(x, "root", vec![Operation::insert(4, "x")]),
            ]
        };

        let first = process(text, "root", &named("a::1", "b::1", "c::1")).unwrap();
        let second = process(text, "root", &named("c::1", "b::1", "a::1")).unwrap();
        assert_eq!(first.text, "0123xy789");
        assert_eq!(second.text, "0123xy789");
    }

    #[test]
    fn test_two_sibling_rewrites_match_merge_model() {
        let base = "cbaa";
        for (left, right) in [("a::1", "b::1"), ("b::1", "a::1")] {
            let edits = vec![
                edit(left, "root", diff(base, "abbbb")),
                edit(right, "root", diff(base, "ac")),
            ];
            let result = process(base, "root", &edits).unwrap();
            assert_eq!(result.text, merge_model(base, &edits));
        }
    }

    #[test]
    fn test_huge_delete_length_is_capped() {
        let edits = vec![
            edit("a::1", "root", vec![Operation::delete(2, usize::MAX)]),
            edit("b::1", "root", vec![Operation::insert(1, "x")]),
        ];

        let result = process("0123456789", "root", &edits).unwrap();
        assert_eq!(result.text, "0x1");
    }

    #[test]
    fn test_overlapping_deletes_in_one_edit() {
        let edits = vec![
            edit("a::1", "root", vec![Operation::delete(0, 3), Operation::delete(1, 6)]),
            edit("b::1", "root", vec![Operation::insert(9, "x"), Operation::delete(8, 1)]),
        ];

        let result = process("0123456789", "root", &edits).unwrap();
        assert_eq!(result.text, "7x9");
    }

    // Sibling merge computed without any rebasing: walk the base text and, at
    // each position, emit the inserts keyed there (by offset, revision, list
    // position) before the char itself unless some edit removed it.
    fn merge_model(base: &str, edits: &[Edit]) -> String {
        let chars: Vec<char> = base.chars().collect();
        let mut removed = vec![false; chars.len()];
        let mut inserts = Vec::new();

        let mut sorted: Vec<&Edit> = edits.iter().collect();
        sorted.sort_by(|a, b| a.revision.cmp(&b.revision));
        for (rank, edit) in sorted.into_iter().enumerate() {
            for (index, op) in normalize_operations(&edit.operations).into_iter().enumerate() {
                match op {
                    Operation::Insert { offset, text } => inserts.push((offset, rank, index, text)),
                    Operation::Delete { offset, length } => {
                        for flag in removed.iter_mut().skip(offset).take(length) {
                            *flag = true;
                        }
                    }
                }
            }
        }
        inserts.sort();

        let mut merged = String::new();
        let mut pending = inserts.into_iter().peekable();
        for position in 0..=chars.len() {
            while let Some((_, _, _, text)) = pending.next_if(|(offset, ..)| *offset <= position) {
                merged.push_str(&text);
            }
            if position < chars.len() && !removed[position] {
                merged.push(chars[position]);
            }
        }
        for (_, _, _, text) in pending {
            merged.push_str(&text);
        }
        merged
    }

    fn insert_offsets(edit: &Edit) -> Vec<usize> {
        normalize_operations(&edit.operations)
            .iter()
            .filter(|op| matches!(op, Operation::Insert { .. }))
            .map(Operation::offset)
            .collect()
    }

    fn arb_half() -> impl Strategy<Value = String> {
        "[a-e ]{0,8}"
    }

    proptest! {
        #[test]
        fn prop_siblings_match_merge_model(
            base in "[a-c]{0,10}",
            targets in prop::collection::vec("[a-c]{0,10}", 1..5),
        ) {
            let edits: Vec<Edit> = targets
                .iter()
                .enumerate()
                .map(|(i, target)| edit(&format!("s{}::1", i), "root", diff(&base, target)))
                .collect();

            let result = process(&base, "root", &edits).unwrap();
            prop_assert_eq!(result.text, merge_model(&base, &edits));
        }

        #[test]
        fn prop_winner_choice_is_irrelevant(
            base in "[a-c]{0,10}",
            targets in prop::collection::vec("[a-c]{0,10}", 2..5),
            shift_names in 1usize..5,
        ) {
            let edits: Vec<Edit> = targets
                .iter()
                .enumerate()
                .map(|(i, target)| edit(&format!("s{}::1", i), "root", diff(&base, target)))
                .collect();

            // Only the order of inserts sharing an original offset may follow
            // the revision names
            let mut offsets: Vec<usize> = edits
                .iter()
                .flat_map(|e| {
                    let mut own = insert_offsets(e);
                    own.dedup();
                    own
                })
                .collect();
            let total = offsets.len();
            offsets.sort_unstable();
            offsets.dedup();
            if offsets.len() != total {
                return Ok(());
            }

            let count = edits.len();
            let renamed: Vec<Edit> = edits
                .iter()
                .enumerate()
                .map(|(i, e)| Edit {
                    revision: format!("s{}::1", (i + shift_names) % count),
                    ..e.clone()
                })
                .collect();

            let original = process(&base, "root", &edits).unwrap();
            let flipped = process(&base, "root", &renamed).unwrap();
            prop_assert_eq!(original.text, flipped.text);
        }

        #[test]
        fn prop_disjoint_subtrees_commute(
            left in arb_half(),
            right in arb_half(),
            left_steps in prop::collection::vec(arb_half(), 1..4),
            right_steps in prop::collection::vec(arb_half(), 1..4),
        ) {
            let base = format!("{}|{}", left, right);
            let mut edits = Vec::new();

            let mut previous = base.clone();
            for (i, step) in left_steps.iter().enumerate() {
                let next = format!("{}|{}", step, right);
                let parent = if i == 0 { "root".to_string() } else { format!("l::{}", i) };
                edits.push(edit(&format!("l::{}", i + 1), &parent, diff(&previous, &next)));
                previous = next;
            }

            let mut previous = base.clone();
            for (i, step) in right_steps.iter().enumerate() {
                let next = format!("{}|{}", left, step);
                let parent = if i == 0 { "root".to_string() } else { format!("r::{}", i) };
                edits.push(edit(&format!("r::{}", i + 1), &parent, diff(&previous, &next)));
                previous = next;
            }

            let expected = format!("{}|{}", left_steps.last().unwrap(), right_steps.last().unwrap());
            let result = process(&base, "root", &edits).unwrap();
            prop_assert_eq!(&result.text, &expected);

            // flip the winner by renaming the left session
            let flipped: Vec<Edit> = edits
                .into_iter()
                .map(|mut e| {
                    e.revision = e.revision.replace("l::", "z::");
                    e.based_on = e.based_on.replace("l::", "z::");
                    e
                })
                .collect();
            let result = process(&base, "root", &flipped).unwrap();
            prop_assert_eq!(&result.text, &expected);
        }
    }
}
