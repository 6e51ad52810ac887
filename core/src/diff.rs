//! MicroChange differ
//!
//! Turns two snapshots of a buffer into the insert/delete operations that
//! transform one into the other. The diff runs over chars (Myers LCS via the
//! `similar` crate) and walks the resulting runs left to right with one
//! running offset into `previous`:
//!
//! - unchanged runs advance the offset
//! - removed runs emit a delete at the offset, then advance it
//! - inserted runs emit an insert at the offset and leave it in place
//!
//! # Example
//!
//! ```rust
//! use textsync_core::{diff, edit::Operation};
//!
//! let ops = diff("abc", "abXc");
//! assert_eq!(ops, vec![Operation::insert(2, "X")]);
//! ```

use crate::edit::Operation;
use similar::{Algorithm, DiffOp, TextDiff};

/// Compute the operations turning `previous` into `current`
///
/// Offsets are char offsets into `previous`; the result is in ascending
/// offset order.
pub fn diff(previous: &str, current: &str) -> Vec<Operation> {
    if previous == current {
        return Vec::new();
    }

    let text_diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(previous, current);
    let new_chars = text_diff.new_slices();

    let inserted = |start: usize, len: usize| -> String { new_chars[start..start + len].concat() };

    let mut operations = Vec::new();
    let mut offset = 0;

    for op in text_diff.ops() {
        match *op {
            DiffOp::Equal { len, .. } => offset += len,
            DiffOp::Delete { old_len, .. } => {
                operations.push(Operation::delete(offset, old_len));
                offset += old_len;
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                operations.push(Operation::insert(offset, inserted(new_index, new_len)));
            }
            DiffOp::Replace {
                old_len,
                new_index,
                new_len,
                ..
            } => {
                operations.push(Operation::delete(offset, old_len));
                offset += old_len;
                operations.push(Operation::insert(offset, inserted(new_index, new_len)));
            }
        }
    }

    operations
}
