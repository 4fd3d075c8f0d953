//! JSON-lines host store.
//!
//! Stands in for a host object store: every declaration, value update and
//! connectivity change becomes one JSON object on its own line.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use jablonet_core::namespace::NamespacePath;
use jablonet_core::store::{CONNECTION_PATH, StoreError};
use jablonet_core::{ConnectivityState, Declaration, NamespaceStore};

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Record<'a> {
    Declare(&'a Declaration),
    Set {
        path: &'a str,
        value: &'a Value,
        ack: bool,
    },
}

struct Inner<W> {
    writer: W,
    declared: HashSet<String>,
}

/// Writes store operations as JSON lines to `W`.
pub struct JsonLinesStore<W> {
    inner: Mutex<Inner<W>>,
}

impl JsonLinesStore<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesStore<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                writer,
                declared: HashSet::new(),
            }),
        }
    }

    /// Consume the store and return the writer.
    #[cfg(test)]
    pub fn into_writer(self) -> W {
        match self.inner.into_inner() {
            Ok(inner) => inner.writer,
            Err(poisoned) => poisoned.into_inner().writer,
        }
    }

    fn emit(&self, operation: &'static str, path: &str, record: &Record<'_>) -> Result<(), StoreError> {
        let rejected = |message: String| StoreError::Rejected {
            operation,
            path: path.to_owned(),
            message,
        };

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("output lock poisoned".into()))?;
        let line = serde_json::to_string(record).map_err(|e| rejected(e.to_string()))?;
        writeln!(inner.writer, "{line}").map_err(|e| rejected(e.to_string()))?;
        inner.writer.flush().map_err(|e| rejected(e.to_string()))?;

        if let Record::Declare(decl) = record {
            inner.declared.insert(decl.path.as_str().to_owned());
        }
        Ok(())
    }
}

impl<W: Write + Send> NamespaceStore for JsonLinesStore<W> {
    async fn declare(&self, decl: &Declaration) -> Result<(), StoreError> {
        self.emit("declare", decl.path.as_str(), &Record::Declare(decl))
    }

    async fn exists(&self, path: &NamespacePath) -> Result<bool, StoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("output lock poisoned".into()))?;
        Ok(inner.declared.contains(path.as_str()))
    }

    async fn set_value(&self, path: &NamespacePath, value: &Value, ack: bool) -> Result<(), StoreError> {
        self.emit(
            "set_value",
            path.as_str(),
            &Record::Set {
                path: path.as_str(),
                value,
                ack,
            },
        )
    }

    async fn publish_connectivity(&self, state: ConnectivityState) -> Result<(), StoreError> {
        let value = Value::Bool(state.is_connected());
        self.emit(
            "publish_connectivity",
            CONNECTION_PATH,
            &Record::Set {
                path: CONNECTION_PATH,
                value: &value,
                ack: true,
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jablonet_core::EntryKind;
    use jablonet_core::store::{LeafMeta, Role, ValueType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lines(store: JsonLinesStore<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(store.into_writer())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn operations_become_json_lines() {
        let store = JsonLinesStore::new(Vec::new());
        let path = NamespacePath::root("services").child("42").child("name");
        let decl = Declaration {
            path: path.clone(),
            name: "name".into(),
            kind: EntryKind::Leaf(LeafMeta::read_only(ValueType::String, Role::Text)),
        };

        store.declare(&decl).await.unwrap();
        assert!(store.exists(&path).await.unwrap());
        store.set_value(&path, &json!("Home"), true).await.unwrap();
        store
            .publish_connectivity(ConnectivityState::Connected)
            .await
            .unwrap();

        assert_eq!(
            lines(store),
            vec![
                json!({
                    "op": "declare",
                    "path": "services.42.name",
                    "name": "name",
                    "kind": "state",
                    "type": "string",
                    "role": "text",
                    "read": true,
                    "write": false
                }),
                json!({"op": "set", "path": "services.42.name", "value": "Home", "ack": true}),
                json!({"op": "set", "path": "info.connection", "value": true, "ack": true}),
            ]
        );
    }

    #[tokio::test]
    async fn folders_carry_only_their_kind() {
        let store = JsonLinesStore::new(Vec::new());
        let decl = Declaration {
            path: NamespacePath::root("services"),
            name: "All services related to the account".into(),
            kind: EntryKind::Folder,
        };
        store.declare(&decl).await.unwrap();

        assert_eq!(
            lines(store),
            vec![json!({
                "op": "declare",
                "path": "services",
                "name": "All services related to the account",
                "kind": "folder"
            })]
        );
    }
}
