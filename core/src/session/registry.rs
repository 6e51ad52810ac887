//! All documents open in one editing session

use super::controller::{DocumentSession, ReconcileOutcome};
use crate::config::SessionConfig;
use crate::edit::{new_origin_session, DocumentKey, Edit, RevisionCounter};
use crate::error::Result;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Open documents of one origin session, sharing its revision counter
#[derive(Debug)]
pub struct SessionRegistry {
    origin_session: String,
    config: SessionConfig,
    counter: Arc<RevisionCounter>,
    sessions: BTreeMap<DocumentKey, DocumentSession>,
}

impl SessionRegistry {
    pub fn new(origin_session: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            origin_session: origin_session.into(),
            config,
            counter: Arc::new(RevisionCounter::new()),
            sessions: BTreeMap::new(),
        }
    }

    /// Start a registry under a freshly generated origin session id
    pub fn with_new_origin(config: SessionConfig) -> Self {
        Self::new(new_origin_session(), config)
    }

    pub fn origin_session(&self) -> &str {
        &self.origin_session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open (or reopen) a document at an agreed text and revision
    pub fn open(
        &mut self,
        document: DocumentKey,
        text: impl Into<String>,
        revision: impl Into<String>,
    ) -> &mut DocumentSession {
        let session = DocumentSession::new(
            self.origin_session.clone(),
            document.clone(),
            text,
            revision,
            &self.config,
        )
        .with_counter(Arc::clone(&self.counter));

        tracing::debug!(%document, origin = %self.origin_session, "document opened");
        match self.sessions.entry(document) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    pub fn close(&mut self, document: &DocumentKey) -> Option<DocumentSession> {
        self.sessions.remove(document)
    }

    pub fn get(&self, document: &DocumentKey) -> Option<&DocumentSession> {
        self.sessions.get(document)
    }

    pub fn get_mut(&mut self, document: &DocumentKey) -> Option<&mut DocumentSession> {
        self.sessions.get_mut(document)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Collect every edit whose coalescing window has passed
    pub fn poll_outgoing(&mut self, now: Instant) -> Vec<Edit> {
        self.sessions
            .values_mut()
            .filter_map(|session| session.poll_outgoing(now))
            .collect()
    }

    /// Route an authoritative batch to the documents it targets
    ///
    /// Edits for documents that are not open are ignored.
    pub fn receive(
        &mut self,
        edits: &[Edit],
        now: Instant,
    ) -> Vec<(DocumentKey, Result<ReconcileOutcome>)> {
        let mut grouped: BTreeMap<DocumentKey, Vec<Edit>> = BTreeMap::new();
        for edit in edits {
            grouped.entry(edit.document()).or_default().push(edit.clone());
        }

        let mut outcomes = Vec::with_capacity(grouped.len());
        for (document, batch) in grouped {
            let Some(session) = self.sessions.get_mut(&document) else {
                tracing::debug!(%document, edits = batch.len(), "ignoring edits for closed document");
                continue;
            };

            let outcome = session.receive(&batch, now);
            if let Err(err) = &outcome {
                tracing::warn!(%document, error = %err, "reconciliation failed");
            }
            outcomes.push((document, outcome));
        }
        outcomes
    }
}
