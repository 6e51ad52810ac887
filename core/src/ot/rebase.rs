//! Rebaser
//!
//! Re-expresses an Edit's operations so they stay valid once a concurrent
//! Edit has been applied first. Each elementary shift of the applied edit is
//! folded over every operation:
//!
//! | shift     | operation | outcome                                              |
//! |-----------|-----------|------------------------------------------------------|
//! | insertion | insert    | moves right when at or after the boundary            |
//! | insertion | delete    | moves right, or splits around the inserted text      |
//! | deletion  | delete    | moves left, shrinks, truncates, or is dropped        |
//! | deletion  | insert    | moves left, or is clamped to the start of the hole   |
//!
//! An insert is never dropped: text typed into a region someone else removed
//! survives at the edge of that region.
//!
//! Two inserts meeting at one position are ordered by their anchors when both
//! were made against the same base: original position first, then revision.
//! Without anchors the shifted insert goes after the applied text, except
//! when a concurrent edit is lifted over a parent, where it stays in front.

use super::changeset::ChangeSet;
use super::offsets::{compute_offsets, OffsetMap, OffsetShift};
use crate::edit::{Edit, InsertAnchor, Operation};
use crate::error::{ReconcileError, Result};
use std::collections::HashSet;

/// Which side wins when two inserts land on the same position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertTie {
    /// The operation being shifted goes after the already applied text
    After,
    /// The operation being shifted stays in front of it
    Before,
}

/// An operation travelling with its ordering key
#[derive(Debug, Clone)]
struct Anchored {
    op: Operation,
    anchor: Option<InsertAnchor>,
}

fn anchored(edit: &Edit) -> Vec<Anchored> {
    edit.operations
        .iter()
        .enumerate()
        .map(|(index, op)| Anchored {
            op: op.clone(),
            anchor: edit.anchor(index),
        })
        .collect()
}

fn store(edit: &mut Edit, ops: Vec<Anchored>) {
    let (operations, anchors): (Vec<_>, Vec<_>) = ops.into_iter().map(|a| (a.op, a.anchor)).unzip();
    edit.operations = operations;
    edit.anchors = anchors;
}

/// Produce a copy of `edit` valid after the edit behind `offsets` was applied
///
/// `based_on` is left untouched; [`rebase`] re-parents the edit.
pub fn shift(edit: &Edit, offsets: &OffsetMap) -> Edit {
    let mut shifted = edit.clone();
    store(&mut shifted, shift_operations(anchored(edit), offsets, InsertTie::After));
    shifted
}

fn shift_operations(ops: Vec<Anchored>, offsets: &OffsetMap, tie: InsertTie) -> Vec<Anchored> {
    let mut shifted = ops;

    for step in offsets.iter() {
        let mut next = Vec::with_capacity(shifted.len() + 1);
        for item in shifted {
            if step.is_insertion() {
                shift_over_insertion(item, step, tie, &mut next);
            } else {
                let anchor = item.anchor;
                let mut ops = Vec::with_capacity(1);
                shift_over_deletion(item.op, step, &mut ops);
                next.extend(ops.into_iter().map(|op| Anchored { op, anchor }));
            }
        }
        shifted = next;
    }

    // stable, so inserts sharing an offset keep their relative order
    shifted.sort_by_key(|item| item.op.offset());
    shifted
}

/// Whether an insert meeting applied text at the same position goes after it
///
/// Inserts made against the same base keep the order of their original
/// positions, then of their revisions. Anything else falls back to `tie`.
fn lands_after(shifted: Option<InsertAnchor>, applied: Option<InsertAnchor>, tie: InsertTie) -> bool {
    match (shifted, applied) {
        (Some(shifted), Some(applied)) if shifted.base == applied.base => shifted > applied,
        _ => tie == InsertTie::After,
    }
}

fn shift_over_insertion(item: Anchored, step: &OffsetShift, tie: InsertTie, out: &mut Vec<Anchored>) {
    let at = step.boundary;
    let len = step.magnitude();
    let anchor = item.anchor;

    match item.op {
        Operation::Insert { offset, text } => {
            let moves = offset > at || (offset == at && lands_after(anchor, step.anchor(), tie));
            let offset = if moves { offset.saturating_add(len) } else { offset };
            out.push(Anchored {
                op: Operation::Insert { offset, text },
                anchor,
            });
        }
        Operation::Delete { offset, length } => {
            let end = offset.saturating_add(length);
            if end <= at {
                out.push(Anchored {
                    op: Operation::Delete { offset, length },
                    anchor,
                });
            } else if offset >= at {
                out.push(Anchored {
                    op: Operation::Delete {
                        offset: offset.saturating_add(len),
                        length,
                    },
                    anchor,
                });
            } else {
                // The inserted text sits inside the range: delete around it
                tracing::trace!(offset, length, at, "splitting delete around insertion");
                out.push(Anchored {
                    op: Operation::Delete {
                        offset,
                        length: at - offset,
                    },
                    anchor: None,
                });
                out.push(Anchored {
                    op: Operation::Delete {
                        offset: at.saturating_add(len),
                        length: end - at,
                    },
                    anchor: None,
                });
            }
        }
    }
}

fn shift_over_deletion(op: Operation, step: &OffsetShift, out: &mut Vec<Operation>) {
    let (from, to) = step.removed_range();
    let removed = to - from;

    match op {
        Operation::Insert { offset, text } => {
            let offset = if offset >= to {
                offset - removed
            } else if offset > from {
                tracing::trace!(offset, from, to, "clamping insert into removed range");
                from
            } else {
                offset
            };
            out.push(Operation::Insert { offset, text });
        }
        Operation::Delete { offset, length } => {
            let end = offset.saturating_add(length);
            if end <= from {
                out.push(Operation::Delete { offset, length });
            } else if offset >= to {
                out.push(Operation::Delete {
                    offset: offset - removed,
                    length,
                });
            } else if from <= offset && end <= to {
                tracing::trace!(offset, length, from, to, "dropping delete of removed text");
            } else if offset <= from && end >= to {
                out.push(Operation::Delete {
                    offset,
                    length: length.saturating_sub(removed),
                });
            } else if offset < from {
                out.push(Operation::Delete {
                    offset,
                    length: from - offset,
                });
            } else {
                out.push(Operation::Delete {
                    offset: from,
                    length: end - to,
                });
            }
        }
    }
}

/// Re-express every descendant of `source` after `concurrent` was slotted in
/// underneath it
///
/// `source` is the edit as it was before its own rebase and `concurrent` the
/// edit it was rebased onto, both relative to the same base. Descendants are
/// shifted by `concurrent` as seen from their parent's resulting state, so
/// the whole subtree stays consistent.
pub fn propagate_offsets(pending: &mut ChangeSet, source: &Edit, concurrent: &Edit) {
    let mut stack = vec![(source.clone(), anchored(concurrent))];
    let mut visited = HashSet::new();

    while let Some((parent, base_ops)) = stack.pop() {
        if !visited.insert(parent.revision.clone()) {
            tracing::warn!(revision = %parent.revision, "edit tree loops back on itself");
            continue;
        }

        let children = pending.children_of(&parent.revision);
        if children.is_empty() {
            continue;
        }

        // The concurrent edit as expressed after `parent`: concurrent inserts
        // stay in front of the parent's text on ties.
        let lifted = shift_operations(base_ops, &compute_offsets(&parent), InsertTie::Before);
        let mut lifted_edit = concurrent.clone();
        store(&mut lifted_edit, lifted.clone());
        let lifted_offsets = compute_offsets(&lifted_edit);

        for revision in children {
            let Some(child) = pending.get_mut(&revision) else {
                continue;
            };
            let before = child.clone();
            let ops = shift_operations(anchored(child), &lifted_offsets, InsertTie::After);
            store(child, ops);
            tracing::trace!(revision = %child.revision, "propagated rebase to descendant");
            stack.push((before, lifted.clone()));
        }
    }
}

/// Rebase `edit` so it applies after `new_base`
///
/// - **Siblings** (same `based_on`): `edit` is shifted by `new_base` and
///   re-parented onto it; its descendants in `pending` follow.
/// - **Inverted** (`new_base` was built on `edit`): the two swap places.
///   `new_base` moves to `edit`'s former parent with `edit`'s shifts undone,
///   and `edit` is re-expressed on top of it.
///
/// Any other relationship fails with [`ReconcileError::UnrelatedRebase`] and
/// leaves both edits untouched.
pub fn rebase(pending: &mut ChangeSet, new_base: &mut Edit, edit: &mut Edit) -> Result<()> {
    if new_base.revision != edit.revision && new_base.based_on == edit.based_on {
        tracing::trace!(revision = %edit.revision, onto = %new_base.revision, "rebasing sibling");
        let before = edit.clone();
        *edit = shift(&before, &compute_offsets(new_base));
        edit.based_on = new_base.revision.clone();
        propagate_offsets(pending, &before, new_base);
        Ok(())
    } else if new_base.based_on == edit.revision {
        tracing::trace!(revision = %edit.revision, onto = %new_base.revision, "rebasing inverted pair");
        let before = edit.clone();
        let undo = compute_offsets(edit).inverted();
        *new_base = shift(new_base, &undo);
        new_base.based_on = edit.based_on.clone();

        *edit = shift(&before, &compute_offsets(new_base));
        edit.based_on = new_base.revision.clone();
        propagate_offsets(pending, &before, new_base);
        Ok(())
    } else {
        Err(ReconcileError::UnrelatedRebase {
            base: new_base.revision.clone(),
            edit: edit.revision.clone(),
        })
    }
}
