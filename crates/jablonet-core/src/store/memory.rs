// ── In-memory namespace store ──
//
// Concurrent map-backed implementation of `NamespaceStore`. Records how
// often each path was declared so callers can verify create-once semantics.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

use super::{ConnectivityState, Declaration, EntryKind, NamespaceStore, StoreError};
use crate::namespace::NamespacePath;

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    kind: EntryKind,
    declarations: usize,
    value: Option<Value>,
    writes: usize,
}

/// Lock-free in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    connectivity: watch::Sender<Option<ConnectivityState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (connectivity, _) = watch::channel(None);
        Self {
            entries: DashMap::new(),
            connectivity,
        }
    }

    /// Current value at `path`, if one was written.
    pub fn value(&self, path: &str) -> Option<Value> {
        self.entries.get(path).and_then(|e| e.value.clone())
    }

    pub fn kind(&self, path: &str) -> Option<EntryKind> {
        self.entries.get(path).map(|e| e.kind)
    }

    pub fn name(&self, path: &str) -> Option<String> {
        self.entries.get(path).map(|e| e.name.clone())
    }

    /// Number of times `path` was declared.
    pub fn declaration_count(&self, path: &str) -> usize {
        self.entries.get(path).map_or(0, |e| e.declarations)
    }

    /// Number of value writes to `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.entries.get(path).map_or(0, |e| e.writes)
    }

    /// Sorted list of all declared paths.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last published connectivity, `None` if never published.
    pub fn connectivity(&self) -> Option<ConnectivityState> {
        *self.connectivity.borrow()
    }

    /// Subscribe to connectivity publications.
    pub fn subscribe_connectivity(&self) -> watch::Receiver<Option<ConnectivityState>> {
        self.connectivity.subscribe()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceStore for MemoryStore {
    async fn declare(&self, decl: &Declaration) -> Result<(), StoreError> {
        self.entries
            .entry(decl.path.as_str().to_owned())
            .and_modify(|e| {
                e.name.clone_from(&decl.name);
                e.kind = decl.kind;
                e.declarations += 1;
            })
            .or_insert_with(|| Entry {
                name: decl.name.clone(),
                kind: decl.kind,
                declarations: 1,
                value: None,
                writes: 0,
            });
        Ok(())
    }

    async fn exists(&self, path: &NamespacePath) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(path.as_str()))
    }

    async fn set_value(&self, path: &NamespacePath, value: &Value, _ack: bool) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .get_mut(path.as_str())
            .ok_or_else(|| StoreError::Rejected {
                operation: "set_value",
                path: path.to_string(),
                message: "entry was never declared".into(),
            })?;
        entry.value = Some(value.clone());
        entry.writes += 1;
        Ok(())
    }

    async fn publish_connectivity(&self, state: ConnectivityState) -> Result<(), StoreError> {
        self.connectivity.send_replace(Some(state));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{LeafMeta, Role, ValueType};
    use serde_json::json;

    fn leaf(path: &str) -> Declaration {
        Declaration {
            path: NamespacePath::from_sanitized(path),
            name: "name".into(),
            kind: EntryKind::Leaf(LeafMeta::read_only(ValueType::String, Role::Text)),
        }
    }

    #[tokio::test]
    async fn set_value_requires_declaration() {
        let store = MemoryStore::new();
        let path = NamespacePath::from_sanitized("services.1.name");

        let err = store.set_value(&path, &json!("x"), true).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));

        store.declare(&leaf("services.1.name")).await.unwrap();
        store.set_value(&path, &json!("x"), true).await.unwrap();
        assert_eq!(store.value("services.1.name"), Some(json!("x")));
        assert!(store.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn redeclaration_is_counted() {
        let store = MemoryStore::new();
        store.declare(&leaf("a")).await.unwrap();
        store.declare(&leaf("a")).await.unwrap();
        assert_eq!(store.declaration_count("a"), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn connectivity_is_observable() {
        let store = MemoryStore::new();
        assert_eq!(store.connectivity(), None);
        store
            .publish_connectivity(ConnectivityState::Connected)
            .await
            .unwrap();
        assert_eq!(store.connectivity(), Some(ConnectivityState::Connected));
    }
}
