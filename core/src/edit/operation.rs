//! Operation: a single insert or delete against a text buffer
//!
//! Offsets count chars (Unicode scalar values) in the buffer as it existed at
//! the Edit's `based_on` revision. Operations of one Edit never see each
//! other's side effects: they are stored in ascending-offset order and applied
//! from the highest offset down.

use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Largest offset or end position an operation may carry
///
/// Keeps every position representable as a signed length change.
pub const MAX_POSITION: usize = isize::MAX as usize;

/// An insertion or deletion at a char offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    /// Insert `text` before the char at `offset`
    Insert { offset: usize, text: String },

    /// Remove `length` chars starting at `offset`
    Delete { offset: usize, length: usize },
}

impl Operation {
    /// Create an insert operation
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Operation::Insert {
            offset,
            text: text.into(),
        }
    }

    /// Create a delete operation
    pub fn delete(offset: usize, length: usize) -> Self {
        Operation::Delete { offset, length }
    }

    /// Offset in the pre-edit coordinate space
    pub fn offset(&self) -> usize {
        match self {
            Operation::Insert { offset, .. } | Operation::Delete { offset, .. } => *offset,
        }
    }

    /// Number of chars inserted or removed
    pub fn len(&self) -> usize {
        match self {
            Operation::Insert { text, .. } => text.chars().count(),
            Operation::Delete { length, .. } => *length,
        }
    }

    /// Check if the operation leaves any buffer unchanged
    pub fn is_noop(&self) -> bool {
        match self {
            Operation::Insert { text, .. } => text.is_empty(),
            Operation::Delete { length, .. } => *length == 0,
        }
    }

    /// Wire name of the operation kind
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Delete { .. } => "delete",
        }
    }

    // Deletes go first when two operations share an offset, otherwise the
    // insert would land inside the range and get removed with it.
    fn rank(&self) -> u8 {
        match self {
            Operation::Delete { .. } => 0,
            Operation::Insert { .. } => 1,
        }
    }
}

/// Indices of `operations` in the order they must be applied
///
/// Highest offset first. On equal offsets deletes precede inserts, and inserts
/// are taken in reverse list order so earlier-listed text ends up first.
pub(crate) fn application_order(operations: &[Operation]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..operations.len()).collect();
    order.sort_by(|&a, &b| {
        let (left, right) = (&operations[a], &operations[b]);
        match right.offset().cmp(&left.offset()) {
            Ordering::Equal => left.rank().cmp(&right.rank()).then_with(|| b.cmp(&a)),
            other => other,
        }
    });
    order
}

/// Apply operations to a rope, clamping anything that runs past the end
pub(crate) fn apply_to_rope(rope: &mut Rope, operations: &[Operation]) {
    for index in application_order(operations) {
        let len = rope.len_chars();
        match &operations[index] {
            Operation::Insert { offset, text } => {
                let at = if *offset > len {
                    tracing::warn!(offset, len, "insert past end of buffer, appending");
                    len
                } else {
                    *offset
                };
                rope.insert(at, text);
            }
            Operation::Delete { offset, length } => {
                let start = (*offset).min(len);
                let end = offset.saturating_add(*length).min(len);
                if end - start < *length {
                    tracing::warn!(offset, length, len, "delete past end of buffer, truncating");
                }
                rope.remove(start..end);
            }
        }
    }
}

/// Bring one Edit's operations into canonical form
///
/// - positions are capped at [`MAX_POSITION`]
/// - empty inserts and zero-length deletes are removed
/// - overlapping deletes are merged into one range
/// - an insert strictly inside a deleted range moves to the range start
///
/// The result is sorted by offset, deletes before inserts on equal offsets,
/// inserts on one offset in their original order.
///
/// # Example
///
/// ```rust
/// use textsync_core::edit::{normalize_operations, Operation};
///
/// let ops = normalize_operations(&[
///     Operation::delete(1, 6),
///     Operation::delete(0, 3),
///     Operation::insert(4, "x"),
/// ]);
/// assert_eq!(ops, vec![Operation::delete(0, 7), Operation::insert(0, "x")]);
/// ```
pub fn normalize_operations(operations: &[Operation]) -> Vec<Operation> {
    let mut removed: Vec<(usize, usize)> = Vec::new();
    let mut inserts: Vec<(usize, &str)> = Vec::new();

    for op in operations {
        match op {
            Operation::Insert { offset, text } => {
                if !text.is_empty() {
                    inserts.push(((*offset).min(MAX_POSITION), text.as_str()));
                }
            }
            Operation::Delete { offset, length } => {
                let start = (*offset).min(MAX_POSITION);
                let end = start.saturating_add(*length).min(MAX_POSITION);
                if end > start {
                    removed.push((start, end));
                }
            }
        }
    }

    removed.sort_unstable();
    let mut ranges: Vec<(usize, usize)> = Vec::with_capacity(removed.len());
    for (start, end) in removed {
        match ranges.last_mut() {
            Some(last) if start < last.1 => {
                tracing::trace!(start, end, "merging overlapping deletes");
                last.1 = last.1.max(end);
            }
            _ => ranges.push((start, end)),
        }
    }

    // stable: inserts sharing an offset keep their list order
    inserts.sort_by_key(|(offset, _)| *offset);
    let inserts = inserts.into_iter().map(|(offset, text)| {
        let offset = ranges
            .iter()
            .find(|(start, end)| *start < offset && offset < *end)
            .map_or(offset, |(start, _)| *start);
        Operation::insert(offset, text)
    });

    let mut normalized: Vec<Operation> = ranges
        .iter()
        .map(|(start, end)| Operation::delete(*start, end - start))
        .chain(inserts)
        .collect();
    normalized.sort_by_key(Operation::offset);
    normalized
}

/// Apply operations to a string and return the result
///
/// # Example
///
/// ```rust
/// use textsync_core::edit::{apply_operations, Operation};
///
/// let ops = vec![Operation::delete(0, 5), Operation::insert(11, "!")];
/// assert_eq!(apply_operations("Hello world", &ops), " world!");
/// ```
pub fn apply_operations(text: &str, operations: &[Operation]) -> String {
    let mut rope = Rope::from_str(text);
    apply_to_rope(&mut rope, &normalize_operations(operations));
    rope.to_string()
}
