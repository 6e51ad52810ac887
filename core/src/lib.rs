//! TextSync Core - reconciliation engine for collaborative plain text
//!
//! Concurrent editing sessions exchange [`Edit`]s: batches of insert/delete
//! operations anchored to the revision they were made against. This crate
//! merges any set of such edits into one deterministic text, compiled to both
//! native and WASM. It implements:
//! - Character-level diffing of two text states into operations
//! - Offset maps and rebasing of edits over concurrent edits
//! - A processor that linearizes a tree of edits into one text
//! - A per-document session controller with outbound coalescing
//!
//! # Examples
//!
//! ```rust
//! use textsync_core::{diff, process, Edit};
//!
//! let mine = Edit::new("a::1", "root", diff("cat", "cats"));
//! let theirs = Edit::new("b::1", "root", diff("cat", "the cat"));
//!
//! let merged = process("cat", "root", &[theirs, mine]).unwrap();
//! assert_eq!(merged.text, "the cats");
//! ```

pub mod config;
pub mod diff;
pub mod edit;
pub mod error;
pub mod ot;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use config::SessionConfig;
pub use diff::diff;
pub use edit::{DocumentKey, Edit, Operation};
pub use error::{ReconcileError, Result};
pub use ot::{process, Processed};
pub use session::{merge_known, DocumentSession, MergedEdits, ReconcileOutcome, SessionRegistry};
