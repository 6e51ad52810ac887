//! Revision identifiers
//!
//! Revisions are opaque strings. By convention a session names the edits it
//! creates `"<originSession>::<counter>"`, with the counter strictly
//! increasing per session.
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Revision of a freshly opened document with no edits applied
pub const ROOT_REVISION: &str = "root";

/// Separator between session and counter in a revision id
pub const REVISION_SEPARATOR: &str = "::";

/// Build a revision id from a session and counter value
pub fn revision_id(session: &str, counter: u64) -> String {
    format!("{}{}{}", session, REVISION_SEPARATOR, counter)
}

/// Split a conventional revision id into session and counter
///
/// Returns `None` for ids that don't follow the convention (such as
/// [`ROOT_REVISION`]).
pub fn parse_revision(revision: &str) -> Option<(&str, u64)> {
    let (session, counter) = revision.rsplit_once(REVISION_SEPARATOR)?;
    let counter = counter.parse().ok()?;
    Some((session, counter))
}

/// Generate a random origin session identifier
pub fn new_origin_session() -> String {
    format!("ws-{}", Uuid::new_v4().simple())
}

/// Thread-safe monotonic counter for revision ids
///
/// One counter is shared by every document a session edits, so revision ids
/// from the same session never collide.
#[derive(Debug)]
pub struct RevisionCounter {
    value: AtomicU64,
}

impl RevisionCounter {
    /// Create a counter starting at 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a counter whose next value is `value + 1`
    pub fn starting_at(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }

    /// Increment and return the new value
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current value without incrementing
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Raise the counter to at least `seen`
    ///
    /// Used when a session rejoins and finds its own older revisions in the
    /// authoritative edit set.
    pub fn observe(&self, seen: u64) {
        self.value.fetch_max(seen, Ordering::SeqCst);
    }
}

impl Default for RevisionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RevisionCounter {
    fn clone(&self) -> Self {
        Self::starting_at(self.get())
    }
}
