//! Offset calculator
//!
//! Summarizes how one Edit shifts buffer positions. The result is a list of
//! elementary shifts, each a `(boundary, delta)` pair:
//!
//! - `delta > 0`: `delta` chars were inserted at `boundary`
//! - `delta < 0`: the chars in `[boundary + delta, boundary)` were removed
//!
//! Shifts are consumed front to back and each boundary is expressed in the
//! coordinates left by the shifts before it. Operations are recorded highest
//! offset first; every newly recorded (lower) shift goes to the front and
//! re-keys the entries already recorded behind it.

use crate::edit::{application_order, Edit, InsertAnchor, Operation};
use serde::{Deserialize, Serialize};

/// One elementary position shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetShift {
    /// Position where the shift happens
    pub boundary: usize,

    /// Signed length change
    pub delta: isize,

    /// Ordering key of the inserted text
    #[serde(skip)]
    anchor: Option<InsertAnchor>,
}

impl OffsetShift {
    /// Check if the shift is an insertion
    pub fn is_insertion(&self) -> bool {
        self.delta > 0
    }

    /// Number of chars inserted or removed
    pub fn magnitude(&self) -> usize {
        self.delta.unsigned_abs()
    }

    pub(crate) fn anchor(&self) -> Option<InsertAnchor> {
        self.anchor
    }

    /// Removed range `[from, to)`; empty for insertions
    pub fn removed_range(&self) -> (usize, usize) {
        if self.is_insertion() {
            (self.boundary, self.boundary)
        } else {
            (self.boundary.saturating_sub(self.magnitude()), self.boundary)
        }
    }

    /// Where `position` lands once this shift has been applied
    fn rekey(&self, position: usize) -> usize {
        if self.is_insertion() {
            if position >= self.boundary {
                position.saturating_add(self.magnitude())
            } else {
                position
            }
        } else {
            let (from, to) = self.removed_range();
            if position >= to {
                position - (to - from)
            } else if position > from {
                from
            } else {
                position
            }
        }
    }

    /// The shift that undoes this one
    fn inverse(&self) -> OffsetShift {
        if self.is_insertion() {
            OffsetShift {
                boundary: self.boundary.saturating_add(self.magnitude()),
                delta: -self.delta,
                anchor: None,
            }
        } else {
            OffsetShift {
                boundary: self.boundary.saturating_sub(self.magnitude()),
                delta: -self.delta,
                anchor: None,
            }
        }
    }
}

/// Ordered position shifts caused by one Edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetMap {
    shifts: Vec<OffsetShift>,
}

impl OffsetMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a shift that happens before everything already recorded
    pub fn record(&mut self, boundary: usize, delta: isize) {
        self.record_shift(OffsetShift {
            boundary,
            delta,
            anchor: None,
        });
    }

    fn record_shift(&mut self, shift: OffsetShift) {
        if shift.delta == 0 {
            return;
        }

        for existing in &mut self.shifts {
            existing.boundary = shift.rekey(existing.boundary);
        }
        self.shifts.insert(0, shift);
    }

    /// Iterate over shifts in consumption order
    pub fn iter(&self) -> impl Iterator<Item = &OffsetShift> {
        self.shifts.iter()
    }

    /// Number of elementary shifts
    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    /// Check if the map shifts nothing
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Total length change of the buffer
    pub fn net_delta(&self) -> isize {
        self.shifts.iter().map(|shift| shift.delta).sum()
    }

    /// Map that undoes this one, taking post-edit positions back
    pub fn inverted(&self) -> OffsetMap {
        OffsetMap {
            shifts: self.shifts.iter().rev().map(OffsetShift::inverse).collect(),
        }
    }
}

/// Compute the position shifts caused by `edit`
///
/// # Example
///
/// ```rust
/// use textsync_core::edit::{Edit, Operation};
/// use textsync_core::ot::compute_offsets;
///
/// let edit = Edit::new("a::1", "root", vec![
///     Operation::delete(0, 2),
///     Operation::insert(5, "xyz"),
/// ]);
/// let offsets = compute_offsets(&edit);
///
/// // The insert is re-keyed past the delete that precedes it
/// let shifts: Vec<_> = offsets.iter().map(|s| (s.boundary, s.delta)).collect();
/// assert_eq!(shifts, vec![(2, -2), (3, 3)]);
/// ```
pub fn compute_offsets(edit: &Edit) -> OffsetMap {
    let mut offsets = OffsetMap::new();

    for index in application_order(&edit.operations) {
        match &edit.operations[index] {
            Operation::Delete { offset, length } => {
                offsets.record(offset.saturating_add(*length), -signed(*length));
            }
            Operation::Insert { offset, text } => {
                offsets.record_shift(OffsetShift {
                    boundary: *offset,
                    delta: signed(text.chars().count()),
                    anchor: edit.anchor(index),
                });
            }
        }
    }

    offsets
}

fn signed(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}
