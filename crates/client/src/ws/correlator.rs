//! Request correlation state.
//!
//! Each request id can have follow-up action builders, a pending batch and a
//! file-context redirection attached to it. Entries are created when the
//! request is sent and removed once its response has been handled, or when
//! the next page of a batch supersedes them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fleetlink_shared::{Action, RequestId};
use serde_json::Value;

use crate::file_context::BlobStore;

/// Builds a follow-up action from a response result.
pub type NextActionBuilder = Arc<dyn Fn(&Value) -> Action + Send + Sync>;

/// What to do after a page of a batch request arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// A full page came back; request the next one.
    Continue(Action),
    /// A short page came back; the batch for this intent type is done.
    Complete { intent_type: String },
}

#[derive(Default)]
pub struct RequestCorrelator {
    next_actions: HashMap<RequestId, Vec<NextActionBuilder>>,
    batches: HashMap<RequestId, Action>,
    file_contexts: HashMap<RequestId, Action>,
}

impl fmt::Debug for RequestCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCorrelator")
            .field("next_actions", &self.next_actions.len())
            .field("batches", &self.batches.len())
            .field("file_contexts", &self.file_contexts.len())
            .finish()
    }
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_next_actions(&mut self, id: RequestId, builders: &[NextActionBuilder]) {
        if builders.is_empty() {
            return;
        }
        if self.next_actions.insert(id, builders.to_vec()).is_some() {
            crate::log_warn!("Duplicate request id {} replaced pending next actions", id);
        }
    }

    /// Track `intent` as a batch if it declares a page limit and asks for
    /// batching.
    pub fn record_batch(&mut self, id: RequestId, intent: &Action) {
        let batched = intent.meta.as_ref().is_some_and(|m| m.batch);
        if !batched || intent.limit().is_none() {
            return;
        }
        if self.batches.insert(id, intent.clone()).is_some() {
            crate::log_warn!("Duplicate request id {} replaced a pending batch", id);
        }
    }

    pub fn record_file_context(&mut self, id: RequestId, intent: &Action) {
        if !intent.meta.as_ref().is_some_and(|m| m.use_file_context) {
            return;
        }
        if self.file_contexts.insert(id, intent.clone()).is_some() {
            crate::log_warn!("Duplicate request id {} replaced a file context request", id);
        }
    }

    /// Decide whether a batch continues after receiving `result` for `id`.
    ///
    /// A page with exactly `limit` rows is not the last one: the next request
    /// starts after the last row's id, and a declared `subsequentLimit`
    /// replaces the limit once.
    pub fn resolve_batch(&mut self, id: RequestId, result: &Value) -> Option<BatchOutcome> {
        let mut intent = self.batches.remove(&id)?;
        let rows = result.as_array().map(Vec::as_slice).unwrap_or_default();
        let full_page = intent.limit().is_some_and(|limit| limit as usize == rows.len());

        if !full_page {
            return Some(BatchOutcome::Complete {
                intent_type: intent.r#type,
            });
        }

        let subsequent_limit = intent
            .meta
            .as_mut()
            .and_then(|m| m.subsequent_limit.take())
            .filter(|limit| *limit > 0);
        let cursor = rows
            .last()
            .and_then(|row| row.get("id"))
            .cloned()
            .unwrap_or(Value::Null);

        if let Some(params) = intent.params_mut() {
            if let Some(limit) = subsequent_limit {
                params.insert("limit".to_string(), Value::from(limit));
            }
            params.insert("start".to_string(), cursor);
        }
        Some(BatchOutcome::Continue(intent))
    }

    /// Build the follow-up actions registered for `id`.
    pub fn resolve_next_actions(&mut self, id: RequestId, result: &Value) -> Vec<Action> {
        self.take_next_actions(id)
            .iter()
            .map(|build| build(result))
            .collect()
    }

    /// Remove and return the builders registered for `id` without running
    /// them.
    pub fn take_next_actions(&mut self, id: RequestId) -> Vec<NextActionBuilder> {
        self.next_actions.remove(&id).unwrap_or_default()
    }

    /// Write the result of a file context request into `store`.
    ///
    /// Returns true when `id` was a file context request, in which case the
    /// result must not be delivered in the success event.
    pub fn resolve_file_context(
        &mut self,
        id: RequestId,
        result: Option<&Value>,
        store: &dyn BlobStore,
    ) -> bool {
        let Some(key) = self.take_file_context_key(id) else {
            return false;
        };
        if let Some(result) = result {
            store.add(&key, result.clone());
        }
        true
    }

    /// Remove the file context entry for `id`, returning the store key its
    /// result belongs under. The key defaults to the intent type.
    pub fn take_file_context_key(&mut self, id: RequestId) -> Option<String> {
        let intent = self.file_contexts.remove(&id)?;
        Some(
            intent
                .meta
                .and_then(|m| m.file_context_key)
                .unwrap_or(intent.r#type),
        )
    }

    /// Drop everything recorded for `id`.
    pub fn forget(&mut self, id: RequestId) {
        self.next_actions.remove(&id);
        self.batches.remove(&id);
        self.file_contexts.remove(&id);
    }

    /// Whether anything is still recorded for `id`.
    pub fn is_tracking(&self, id: RequestId) -> bool {
        self.next_actions.contains_key(&id)
            || self.batches.contains_key(&id)
            || self.file_contexts.contains_key(&id)
    }

    /// Total number of entries across all maps.
    pub fn len(&self) -> usize {
        self.next_actions.len() + self.batches.len() + self.file_contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
