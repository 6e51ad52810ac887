//! Per-document reconciliation state for one editing session
//!
//! The session keeps three views of the document:
//!
//! - the **root**: last agreed text and revision every pass starts from
//! - the **base**: the state this session has reconciled or sent up to
//! - the **current** text: the live local buffer, possibly ahead of the base
//!
//! Local changes are coalesced and packaged as Edits against the base. When
//! the authoritative edit set arrives it is merged with the local edits not
//! yet echoed back, and any unsent local input is carried over onto the new
//! base.

use super::debounce::Debouncer;
use super::merge::{merge_known, MergedEdits};
use crate::config::SessionConfig;
use crate::diff::diff;
use crate::edit::{parse_revision, revision_id, DocumentKey, Edit, RevisionCounter, REVISION_SEPARATOR};
use crate::error::Result;
use crate::ot::process;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Result of merging an authoritative edit set into a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Merged text of all known edits, without unsent local input
    pub text: String,

    /// Revision the merged text corresponds to
    pub revision: String,

    /// Local revisions the server has now confirmed
    pub confirmed: Vec<String>,

    /// Unsent local input was moved onto the new base and must be re-sent
    pub rearmed: bool,
}

/// Reconciliation state for one open document
#[derive(Debug, Clone)]
pub struct DocumentSession {
    document: DocumentKey,
    origin_session: String,
    counter: Arc<RevisionCounter>,
    root_text: String,
    root_revision: String,
    base_text: String,
    base_revision: String,
    current_text: String,
    pending_local: Vec<Edit>,
    outgoing: Debouncer,
}

impl DocumentSession {
    /// Open a document at an agreed text and revision
    pub fn new(
        origin_session: impl Into<String>,
        document: DocumentKey,
        text: impl Into<String>,
        revision: impl Into<String>,
        config: &SessionConfig,
    ) -> Self {
        let text = text.into();
        let revision = revision.into();

        Self {
            document,
            origin_session: origin_session.into(),
            counter: Arc::new(RevisionCounter::new()),
            root_text: text.clone(),
            root_revision: revision.clone(),
            base_text: text.clone(),
            base_revision: revision,
            current_text: text,
            pending_local: Vec::new(),
            outgoing: Debouncer::new(config.coalesce_window),
        }
    }

    /// Share a revision counter with other documents of the same session
    pub fn with_counter(mut self, counter: Arc<RevisionCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn document(&self) -> &DocumentKey {
        &self.document
    }

    pub fn origin_session(&self) -> &str {
        &self.origin_session
    }

    /// Live local text
    pub fn text(&self) -> &str {
        &self.current_text
    }

    /// Text at the base revision
    pub fn base_text(&self) -> &str {
        &self.base_text
    }

    pub fn base_revision(&self) -> &str {
        &self.base_revision
    }

    /// Edits sent but not yet seen in an authoritative set
    pub fn pending_local(&self) -> &[Edit] {
        &self.pending_local
    }

    /// Check if an outgoing emission is scheduled
    pub fn has_outgoing(&self) -> bool {
        self.outgoing.is_armed()
    }

    /// Replace the local buffer without touching the emission timer
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.current_text = text.into();
    }

    /// Record a local modification and arm the outgoing timer if idle
    pub fn local_change(&mut self, text: impl Into<String>, now: Instant) {
        self.set_text(text);
        if self.current_text == self.base_text {
            self.outgoing.cancel();
        } else {
            self.outgoing.schedule(now);
        }
    }

    /// Emit the coalesced local edit once the window has passed
    pub fn poll_outgoing(&mut self, now: Instant) -> Option<Edit> {
        if self.outgoing.is_due(now) {
            self.flush()
        } else {
            None
        }
    }

    /// Package everything typed since the base into one Edit right away
    ///
    /// The edit is recorded as pending and returned for transmission; the
    /// base advances to it.
    pub fn flush(&mut self) -> Option<Edit> {
        self.outgoing.cancel();

        let operations = diff(&self.base_text, &self.current_text);
        if operations.is_empty() {
            return None;
        }

        let edit = Edit::new(
            revision_id(&self.origin_session, self.counter.next()),
            self.base_revision.clone(),
            operations,
        )
        .with_origin(self.origin_session.clone())
        .with_target(&self.document);
        tracing::debug!(
            document = %self.document,
            revision = %edit.revision,
            based_on = %edit.based_on,
            "packaged local edit"
        );

        self.pending_local.push(edit.clone());
        self.base_text = self.current_text.clone();
        self.base_revision = edit.revision.clone();
        Some(edit)
    }

    /// Merge the authoritative edit set and re-arm the timer if local input
    /// had to be carried over
    pub fn receive(&mut self, server_edits: &[Edit], now: Instant) -> Result<ReconcileOutcome> {
        let outcome = self.reconcile(server_edits)?;
        if outcome.rearmed {
            self.outgoing.schedule(now);
        }
        Ok(outcome)
    }

    /// Merge the authoritative edit set without touching the timer
    ///
    /// On error the session is left as it was.
    pub fn reconcile(&mut self, server_edits: &[Edit]) -> Result<ReconcileOutcome> {
        let MergedEdits { merged, duplicates } = merge_known(server_edits, &self.pending_local);
        let processed = process(&self.root_text, &self.root_revision, &merged)?;

        let carried = if processed.text != self.base_text && self.current_text != self.base_text {
            Some(self.carry_local_input(&merged)?)
        } else {
            None
        };

        for edit in server_edits {
            if let Some((session, counter)) = parse_revision(&edit.revision) {
                if session == self.origin_session {
                    self.counter.observe(counter);
                }
            }
        }
        self.pending_local
            .retain(|edit| !duplicates.contains(&edit.revision));

        let rearmed = carried.is_some();
        if processed.text != self.base_text {
            self.current_text = carried.unwrap_or_else(|| processed.text.clone());
            self.base_text = processed.text.clone();
        }
        self.base_revision = processed.revision.clone();

        tracing::debug!(
            document = %self.document,
            revision = %processed.revision,
            confirmed = duplicates.len(),
            rearmed,
            "reconciled"
        );

        Ok(ReconcileOutcome {
            text: processed.text,
            revision: processed.revision,
            confirmed: duplicates,
            rearmed,
        })
    }

    /// Start over from a new agreed state, discarding local history
    pub fn reset(&mut self, text: impl Into<String>, revision: impl Into<String>) {
        let text = text.into();
        let revision = revision.into();

        self.root_text = text.clone();
        self.root_revision = revision.clone();
        self.base_text = text.clone();
        self.base_revision = revision;
        self.current_text = text;
        self.pending_local.clear();
        self.outgoing.cancel();
    }

    // Replays the unsent local input (old base -> current) as a throwaway
    // edit alongside the merged set.
    fn carry_local_input(&self, merged: &[Edit]) -> Result<String> {
        let residual = Edit::new(
            format!("{}{}~unsent", self.origin_session, REVISION_SEPARATOR),
            self.base_revision.clone(),
            diff(&self.base_text, &self.current_text),
        )
        .with_origin(self.origin_session.clone())
        .with_target(&self.document);

        let mut edits = merged.to_vec();
        edits.push(residual);
        Ok(process(&self.root_text, &self.root_revision, &edits)?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Operation;
    use crate::error::ReconcileError;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(500);

    fn session(text: &str) -> DocumentSession {
        DocumentSession::new(
            "s1",
            DocumentKey::new("card", 1),
            text,
            "root",
            &SessionConfig::with_coalesce_window(WINDOW),
        )
    }

    #[test]
    fn test_local_change_is_debounced() {
        let start = Instant::now();
        let mut doc = session("hello");

        doc.local_change("hello!", start);
        assert!(doc.has_outgoing());
        assert!(doc.poll_outgoing(start + Duration::from_millis(100)).is_none());

        let edit = doc.poll_outgoing(start + WINDOW).unwrap();
        assert_eq!(edit.revision, "s1::1");
        assert_eq!(edit.based_on, "root");
        assert_eq!(edit.target_kind, "card");
        assert_eq!(edit.target_id, 1);
        assert_eq!(edit.operations, vec![Operation::insert(5, "!")]);

        assert_eq!(doc.base_revision(), "s1::1");
        assert_eq!(doc.base_text(), "hello!");
        assert_eq!(doc.pending_local().len(), 1);
        assert!(!doc.has_outgoing());
    }

    #[test]
    fn test_changes_in_window_coalesce() {
        let start = Instant::now();
        let mut doc = session("");

        doc.local_change("a", start);
        doc.local_change("ab", start + Duration::from_millis(200));
        doc.local_change("abc", start + Duration::from_millis(400));
        assert!(doc.poll_outgoing(start + Duration::from_millis(450)).is_none());

        let edit = doc.poll_outgoing(start + Duration::from_millis(600)).unwrap();
        assert_eq!(edit.operations, vec![Operation::insert(0, "abc")]);
        assert!(doc.poll_outgoing(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_steady_typing_still_emits() {
        let start = Instant::now();
        let mut doc = session("");
        let mut text = String::new();

        for step in 0..4u64 {
            text.push('a');
            doc.local_change(text.clone(), start + Duration::from_millis(150 * step));
        }
        let edit = doc.poll_outgoing(start + WINDOW).unwrap();
        assert_eq!(edit.operations, vec![Operation::insert(0, "aaaa")]);

        // the change after the emission starts a new window
        doc.local_change("aaaaa", start + Duration::from_millis(600));
        assert!(doc.has_outgoing());
        assert!(doc.poll_outgoing(start + Duration::from_millis(900)).is_none());
        let edit = doc.poll_outgoing(start + Duration::from_millis(1100)).unwrap();
        assert_eq!(edit.operations, vec![Operation::insert(4, "a")]);
    }

    #[test]
    fn test_reverting_change_cancels_emission() {
        let start = Instant::now();
        let mut doc = session("same");

        doc.local_change("samey", start);
        doc.local_change("same", start + Duration::from_millis(10));
        assert!(!doc.has_outgoing());
        assert!(doc.flush().is_none());
    }

    #[test]
    fn test_echo_confirms_pending_edit() {
        let mut doc = session("hello");
        doc.set_text("hello!");
        let sent = doc.flush().unwrap();

        let outcome = doc.reconcile(&[sent.clone()]).unwrap();
        assert_eq!(outcome.confirmed, vec![sent.revision.clone()]);
        assert_eq!(outcome.text, "hello!");
        assert!(!outcome.rearmed);
        assert!(doc.pending_local().is_empty());
        assert_eq!(doc.text(), "hello!");
        assert_eq!(doc.base_revision(), "s1::1");
    }

    #[test]
    fn test_remote_edit_merges_with_unconfirmed_local() {
        let mut doc = session("hello");
        doc.set_text("hello!");
        doc.flush().unwrap();

        let remote = Edit::new("s2::1", "root", vec![Operation::insert(0, ">> ")]);
        let outcome = doc.reconcile(&[remote]).unwrap();

        assert_eq!(outcome.text, ">> hello!");
        assert!(outcome.confirmed.is_empty());
        assert_eq!(doc.pending_local().len(), 1);
        assert_eq!(doc.text(), ">> hello!");
        assert_eq!(doc.base_text(), ">> hello!");
    }

    #[test]
    fn test_unsent_input_is_carried_and_rearmed() {
        let start = Instant::now();
        let mut doc = session("hello");
        doc.local_change("hello!", start);

        let remote = Edit::new("s2::1", "root", vec![Operation::insert(0, ">> ")]);
        let later = start + Duration::from_millis(100);
        let outcome = doc.receive(&[remote], later).unwrap();

        assert!(outcome.rearmed);
        assert_eq!(outcome.text, ">> hello");
        assert_eq!(doc.base_text(), ">> hello");
        assert_eq!(doc.base_revision(), "s2::1");
        assert_eq!(doc.text(), ">> hello!");

        // the window still runs from the first unsent change
        assert!(doc.poll_outgoing(later).is_none());
        let edit = doc.poll_outgoing(start + WINDOW).unwrap();
        assert_eq!(edit.based_on, "s2::1");
        assert_eq!(edit.operations, vec![Operation::insert(8, "!")]);
    }

    #[test]
    fn test_unchanged_server_state_keeps_local_input() {
        let start = Instant::now();
        let mut doc = session("hello");
        doc.local_change("hello?", start);

        let outcome = doc.receive(&[], start).unwrap();
        assert!(!outcome.rearmed);
        assert_eq!(doc.text(), "hello?");
        assert_eq!(doc.base_text(), "hello");
    }

    #[test]
    fn test_inconsistent_set_leaves_state() {
        let mut doc = session("hello");
        doc.set_text("hello!");
        doc.flush().unwrap();

        let orphan = Edit::new("s2::9", "s2::8", vec![Operation::insert(0, "x")]);
        let err = doc.reconcile(&[orphan]).unwrap_err();

        assert!(matches!(err, ReconcileError::InconsistentChangeSet { .. }));
        assert_eq!(doc.text(), "hello!");
        assert_eq!(doc.base_revision(), "s1::1");
        assert_eq!(doc.pending_local().len(), 1);
    }

    #[test]
    fn test_own_revisions_advance_counter() {
        let mut doc = session("");
        let earlier = Edit::new("s1::41", "root", vec![Operation::insert(0, "a")]);
        doc.reconcile(&[earlier]).unwrap();

        doc.set_text("ab");
        let edit = doc.flush().unwrap();
        assert_eq!(edit.revision, "s1::42");
        assert_eq!(edit.based_on, "s1::41");
    }

    #[test]
    fn test_reset() {
        let mut doc = session("old");
        doc.set_text("older");
        doc.flush().unwrap();

        doc.reset("fresh", "ws-s9::3");
        assert_eq!(doc.text(), "fresh");
        assert_eq!(doc.base_revision(), "ws-s9::3");
        assert!(doc.pending_local().is_empty());

        let outcome = doc
            .reconcile(&[Edit::new("s2::1", "ws-s9::3", vec![Operation::insert(5, "!")])])
            .unwrap();
        assert_eq!(outcome.text, "fresh!");
    }
}
