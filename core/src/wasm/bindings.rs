//! JavaScript bindings for TextSync core types
//!
//! The JavaScript side owns the coalescing timer: it calls `flush` when its
//! own debounce fires and `reconcile` whenever the server pushes the edit set.

use super::utils::to_js_error;
use crate::config::SessionConfig;
use crate::edit::{edits_from_json, DocumentKey, Edit};
use crate::session::{merge_known, DocumentSession};
use wasm_bindgen::prelude::*;

/// Diff two texts; returns a JSON array of operations
#[wasm_bindgen(js_name = diff)]
pub fn diff(previous: &str, current: &str) -> Result<String, JsValue> {
    serde_json::to_string(&crate::diff::diff(previous, current))
        .map_err(|e| to_js_error("JSON serialization failed", e))
}

/// Merge a JSON array of edits on top of `initial_text`
///
/// Returns the JSON-encoded `{ text, revision, applied }` result.
#[wasm_bindgen(js_name = process)]
pub fn process(initial_text: &str, root_revision: &str, edits_json: &str) -> Result<String, JsValue> {
    let edits = edits_from_json(edits_json).map_err(|e| to_js_error("Invalid edits JSON", e))?;
    let processed = crate::ot::process(initial_text, root_revision, &edits)
        .map_err(|e| to_js_error("Processing failed", e))?;

    serde_json::to_string(&processed).map_err(|e| to_js_error("JSON serialization failed", e))
}

/// De-duplicate local edits against the server's edit set
///
/// Returns the JSON-encoded `{ merged, duplicates }` result.
#[wasm_bindgen(js_name = mergeKnown)]
pub fn merge_known_json(server_json: &str, local_json: &str) -> Result<String, JsValue> {
    let server = edits_from_json(server_json).map_err(|e| to_js_error("Invalid server edits", e))?;
    let local = edits_from_json(local_json).map_err(|e| to_js_error("Invalid local edits", e))?;

    serde_json::to_string(&merge_known(&server, &local))
        .map_err(|e| to_js_error("JSON serialization failed", e))
}

/// JavaScript-friendly wrapper for DocumentSession
#[wasm_bindgen]
pub struct WasmDocumentSession {
    inner: DocumentSession,
}

#[wasm_bindgen]
impl WasmDocumentSession {
    /// Open a document at an agreed text and revision
    #[wasm_bindgen(constructor)]
    pub fn new(
        origin_session: String,
        target_kind: String,
        target_id: i64,
        text: String,
        revision: String,
    ) -> Self {
        Self {
            inner: DocumentSession::new(
                origin_session,
                DocumentKey::new(target_kind, target_id),
                text,
                revision,
                &SessionConfig::default(),
            ),
        }
    }

    /// Replace the local buffer after a user modification
    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, text: String) {
        self.inner.set_text(text);
    }

    /// Get the live local text
    #[wasm_bindgen(js_name = text)]
    pub fn text(&self) -> String {
        self.inner.text().to_string()
    }

    /// Get the revision local edits are currently based on
    #[wasm_bindgen(js_name = baseRevision)]
    pub fn base_revision(&self) -> String {
        self.inner.base_revision().to_string()
    }

    /// Number of sent edits awaiting confirmation
    #[wasm_bindgen(js_name = pendingCount)]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_local().len()
    }

    /// Package local changes into an edit (JSON), if there are any
    #[wasm_bindgen(js_name = flush)]
    pub fn flush(&mut self) -> Result<Option<String>, JsValue> {
        self.inner
            .flush()
            .map(|edit: Edit| edit.to_json())
            .transpose()
            .map_err(|e| to_js_error("JSON serialization failed", e))
    }

    /// Fold the server's edit set (JSON array) into the session
    ///
    /// Returns the JSON-encoded outcome; `rearmed` tells the caller to
    /// restart its debounce timer.
    #[wasm_bindgen(js_name = reconcile)]
    pub fn reconcile(&mut self, edits_json: &str) -> Result<String, JsValue> {
        let edits = edits_from_json(edits_json).map_err(|e| to_js_error("Invalid edits JSON", e))?;
        let outcome = self
            .inner
            .reconcile(&edits)
            .map_err(|e| to_js_error("Reconciliation failed", e))?;

        serde_json::to_string(&outcome).map_err(|e| to_js_error("JSON serialization failed", e))
    }

    /// Start over from a new agreed text and revision
    #[wasm_bindgen(js_name = reset)]
    pub fn reset(&mut self, text: String, revision: String) {
        self.inner.reset(text, revision);
    }
}
