// ── Host store boundary ──
//
// The core is write-only towards the host object store: it declares
// entries and sets values, and never reads a value back. The store is an
// external collaborator; `MemoryStore` is the in-process reference
// implementation used by tests and embedders.

mod memory;

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use strum::Display;
use thiserror::Error;

use crate::namespace::NamespacePath;

pub use memory::MemoryStore;

/// Path of the connectivity indicator every host store exposes.
pub const CONNECTION_PATH: &str = "info.connection";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store rejected {operation} on {path}: {message}")]
    Rejected {
        operation: &'static str,
        path: String,
        message: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Declared type of a leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

/// Semantic role tag attached to a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Json,
    Text,
    Indicator,
    Value,
}

/// Metadata of a leaf entry. Immutable once the leaf is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeafMeta {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub role: Role,
    pub read: bool,
    pub write: bool,
}

impl LeafMeta {
    /// Read-only leaf as produced by polling.
    pub fn read_only(value_type: ValueType, role: Role) -> Self {
        Self {
            value_type,
            role,
            read: true,
            write: false,
        }
    }
}

/// Kind of a namespace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    Channel,
    #[serde(rename = "state")]
    Leaf(LeafMeta),
}

/// A declaration sent to the store the first time a path is seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub path: NamespacePath,
    pub name: String,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// Externally observable health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectivityState {
    Connected,
    Disconnected,
}

impl ConnectivityState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Host object store primitives used by the reconciler and the scheduler.
pub trait NamespaceStore: Send + Sync {
    /// Declare a folder, channel or leaf.
    fn declare(&self, decl: &Declaration) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Whether the host already has an entry at `path`.
    fn exists(&self, path: &NamespacePath) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Write a leaf value. `ack` marks it as confirmed by the device side.
    fn set_value(
        &self,
        path: &NamespacePath,
        value: &Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Publish the connectivity indicator.
    fn publish_connectivity(
        &self,
        state: ConnectivityState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: NamespaceStore> NamespaceStore for std::sync::Arc<S> {
    fn declare(&self, decl: &Declaration) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).declare(decl)
    }

    fn exists(&self, path: &NamespacePath) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).exists(path)
    }

    fn set_value(
        &self,
        path: &NamespacePath,
        value: &Value,
        ack: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set_value(path, value, ack)
    }

    fn publish_connectivity(
        &self,
        state: ConnectivityState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).publish_connectivity(state)
    }
}
