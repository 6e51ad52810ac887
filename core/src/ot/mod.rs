//! Operational-transform engine
//!
//! - [`compute_offsets`]: position shifts caused by one edit
//! - [`shift`], [`rebase`], [`propagate_offsets`]: re-express edits after a
//!   concurrent edit was applied
//! - [`process`]: linearize a whole tree of edits into one text
//! - [`ChangeSet`]: the arena of pending edits a pass works on

mod changeset;
mod offsets;
mod process;
mod rebase;

pub use changeset::ChangeSet;
pub use offsets::{compute_offsets, OffsetMap, OffsetShift};
pub use process::{process, Processed};
pub use rebase::{propagate_offsets, rebase, shift};
