//! Client-side session: turns local typing into edits and folds the
//! authoritative edit set back into the local buffer
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use textsync_core::edit::DocumentKey;
//! use textsync_core::{DocumentSession, SessionConfig};
//!
//! let config = SessionConfig::with_coalesce_window(Duration::from_millis(10));
//! let mut doc = DocumentSession::new("ws-a", DocumentKey::new("card", 1), "hi", "root", &config);
//!
//! let start = Instant::now();
//! doc.local_change("hi!", start);
//! let edit = doc.poll_outgoing(start + Duration::from_millis(10)).unwrap();
//! assert_eq!(edit.revision, "ws-a::1");
//!
//! let outcome = doc.reconcile(&[edit]).unwrap();
//! assert_eq!(outcome.confirmed, vec!["ws-a::1"]);
//! ```

mod controller;
mod debounce;
mod merge;
mod registry;

pub use controller::{DocumentSession, ReconcileOutcome};
pub use debounce::Debouncer;
pub use merge::{merge_known, MergedEdits};
pub use registry::SessionRegistry;
