//! Per-orchestrator session state shared by the dispatch loop and the send
//! pipeline.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::correlator::RequestCorrelator;

/// Endpoints (`<model>.<method>`) fetched on the current connection.
#[derive(Debug, Default)]
pub struct LoadedEndpoints {
    endpoints: HashSet<String>,
}

impl LoadedEndpoints {
    /// Whether the data is fetching or has been fetched.
    pub fn is_loaded(&self, endpoint: &str) -> bool {
        self.endpoints.contains(endpoint)
    }

    /// Mark an endpoint as fetched. Returns false if it already was, which
    /// makes check-and-set a single step.
    pub fn mark_loaded(&mut self, endpoint: &str) -> bool {
        self.endpoints.insert(endpoint.to_string())
    }

    /// Forget everything; called whenever a connection (re)opens.
    pub fn reset(&mut self) {
        self.endpoints.clear();
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub loaded: LoadedEndpoints,
    pub correlator: RequestCorrelator,
}

pub type SharedSession = Arc<Mutex<SessionState>>;
