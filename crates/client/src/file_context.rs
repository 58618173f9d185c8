//! Keyed store for large response payloads kept outside UI state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// Destination for results of file context requests.
pub trait BlobStore: Send + Sync {
    fn add(&self, key: &str, value: Value);
}

/// In-memory file context store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct FileContextStore {
    files: Arc<RwLock<HashMap<String, Value>>>,
}

impl FileContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for FileContextStore {
    fn add(&self, key: &str, value: Value) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_share_contents() {
        let store = FileContextStore::new();
        let other = store.clone();
        store.add("log", json!("line 1\nline 2"));

        assert_eq!(other.get("log"), Some(json!("line 1\nline 2")));
        assert_eq!(other.remove("log"), Some(json!("line 1\nline 2")));
        assert!(store.is_empty());
    }
}
