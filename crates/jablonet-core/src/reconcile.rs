// ── JSON → flat namespace reconciliation ──
//
// Walks `data` payloads from the cloud and mirrors them into the host
// store as folder → channel-per-record → leaf-per-field. Every path is
// declared at most once per process; later passes only write values.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::CoreError;
use crate::namespace::{KnownPaths, NamespacePath};
use crate::store::{Declaration, EntryKind, LeafMeta, NamespaceStore, Role, ValueType};

/// Identifier joining components with their state records.
pub const COMPONENT_ID: &str = "cloud-component-id";
/// Identifier of a service in the service list.
pub const SERVICE_ID: &str = "service-id";
/// Sibling collection holding per-component states.
pub const STATES_KEY: &str = "states";
/// Leaf written under a record when its state is found.
pub const STATE_LEAF: &str = "state";

/// Where a collection of records lives in a payload and in the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionLayout<'a> {
    /// Key of the collection inside the `data` object.
    pub key: &'a str,
    /// Folder segment the records are placed under.
    pub folder: &'a str,
    /// Human readable folder name.
    pub description: &'a str,
    /// Field naming each record's channel.
    pub id_field: &'a str,
    /// Join each record with the `states` collection by `id_field`.
    pub join_states: bool,
}

pub const SERVICES: CollectionLayout<'static> = CollectionLayout {
    key: "services",
    folder: "services",
    description: "All services related to the account",
    id_field: SERVICE_ID,
    join_states: false,
};

pub const SECTIONS: CollectionLayout<'static> = CollectionLayout {
    key: "sections",
    folder: "sections",
    description: "All sections related to the service",
    id_field: COMPONENT_ID,
    join_states: true,
};

pub const PROGRAMMABLE_GATES: CollectionLayout<'static> = CollectionLayout {
    key: "programmableGates",
    folder: "programmable-gates",
    description: "All programmable gates related to the service",
    id_field: COMPONENT_ID,
    join_states: true,
};

pub const THERMO_DEVICES: CollectionLayout<'static> = CollectionLayout {
    key: "thermoDevices",
    folder: "thermo-devices",
    description: "All thermo devices related to the service",
    id_field: COMPONENT_ID,
    join_states: true,
};

/// Infer leaf metadata from a value's runtime kind.
///
/// Nested structures and `null` are stored as serialized JSON text.
pub fn infer_leaf(value: &Value) -> (LeafMeta, Value) {
    let (value_type, role, stored) = match value {
        Value::Object(_) | Value::Array(_) | Value::Null => (
            ValueType::String,
            Role::Json,
            Value::String(value.to_string()),
        ),
        Value::String(_) => (ValueType::String, Role::Text, value.clone()),
        Value::Bool(_) => (ValueType::Boolean, Role::Indicator, value.clone()),
        Value::Number(_) => (ValueType::Number, Role::Value, value.clone()),
    };
    (LeafMeta::read_only(value_type, role), stored)
}

/// Counters for one reconciliation call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries declared for the first time.
    pub declared: usize,
    /// Leaf values written.
    pub written: usize,
    /// Records placed under a channel.
    pub records: usize,
    /// Records that received a joined `state` leaf.
    pub joined: usize,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.declared += other.declared;
        self.written += other.written;
        self.records += other.records;
        self.joined += other.joined;
    }
}

/// Per-call bookkeeping: counters and the raw origin of each sanitized
/// path, used to report collisions.
#[derive(Default)]
struct Pass {
    report: ReconcileReport,
    origins: HashMap<NamespacePath, String>,
}

impl Pass {
    fn note_origin(&mut self, path: &NamespacePath, raw: &str) {
        match self.origins.get(path) {
            Some(previous) if previous != raw => {
                warn!(
                    path = %path,
                    previous = %previous,
                    current = %raw,
                    "sanitized path collision, later value overwrites"
                );
            }
            Some(_) => {}
            None => {
                self.origins.insert(path.clone(), raw.to_owned());
            }
        }
    }
}

/// Mirrors payloads into a [`NamespaceStore`], declaring each path once.
#[derive(Debug, Default)]
pub struct Reconciler {
    known: KnownPaths,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths declared so far.
    pub fn known_paths(&self) -> &KnownPaths {
        &self.known
    }

    /// Reconcile an arbitrary `data` object below `base`.
    ///
    /// Arrays of objects become collections (folder named after the key,
    /// one channel per record, identified by `cloud-component-id`,
    /// `service-id` or `id`, whichever the records carry). When the payload
    /// has a `states` array, every collection is joined against it. All
    /// other fields become leaves directly below `base`.
    pub async fn reconcile<S: NamespaceStore>(
        &mut self,
        store: &S,
        base: &NamespacePath,
        payload: &Value,
    ) -> Result<ReconcileReport, CoreError> {
        let mut pass = Pass::default();

        let Some(fields) = payload.as_object() else {
            self.write_leaf(store, base, base.leaf_name(), payload, &mut pass)
                .await?;
            return Ok(pass.report);
        };
        let states = fields.get(STATES_KEY).and_then(Value::as_array);

        for (key, value) in fields {
            if key == STATES_KEY && states.is_some() {
                continue;
            }
            match value.as_array() {
                Some(items) if is_record_list(items) => {
                    let layout = CollectionLayout {
                        key,
                        folder: key,
                        description: key,
                        id_field: detect_id_field(items),
                        join_states: states.is_some(),
                    };
                    self.collection(store, Some(base), &layout, value, states, &mut pass)
                        .await?;
                }
                _ => {
                    let path = base.child(key);
                    pass.note_origin(&path, key);
                    self.write_leaf(store, &path, key, value, &mut pass).await?;
                }
            }
        }

        Ok(pass.report)
    }

    /// Reconcile one known collection of `payload` below `parent`
    /// (`None` places the folder at the namespace root).
    pub async fn reconcile_collection<S: NamespaceStore>(
        &mut self,
        store: &S,
        parent: Option<&NamespacePath>,
        layout: &CollectionLayout<'_>,
        payload: &Value,
    ) -> Result<ReconcileReport, CoreError> {
        let mut pass = Pass::default();
        let Some(records) = payload.get(layout.key) else {
            debug!(collection = layout.key, "collection absent from payload");
            return Ok(pass.report);
        };
        let states = payload.get(STATES_KEY).and_then(Value::as_array);
        self.collection(store, parent, layout, records, states, &mut pass)
            .await?;
        Ok(pass.report)
    }

    async fn collection<S: NamespaceStore>(
        &mut self,
        store: &S,
        parent: Option<&NamespacePath>,
        layout: &CollectionLayout<'_>,
        records: &Value,
        states: Option<&Vec<Value>>,
        pass: &mut Pass,
    ) -> Result<(), CoreError> {
        let entries: Vec<(String, &Value)> = match records {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| (idx.to_string(), item))
                .collect(),
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            other => {
                warn!(
                    collection = layout.key,
                    kind = kind_name(other),
                    "collection is not a list"
                );
                return Ok(());
            }
        };

        let folder = match parent {
            Some(p) => p.child(layout.folder),
            None => NamespacePath::root(layout.folder),
        };
        self.ensure(store, &folder, layout.description, EntryKind::Folder, pass)
            .await?;

        for (fallback, record) in entries {
            let Some(fields) = record.as_object() else {
                warn!(collection = layout.key, position = %fallback, "skipping non-object record");
                continue;
            };

            let id = match fields.get(layout.id_field).and_then(scalar_text) {
                Some(id) => id,
                None => {
                    debug!(
                        collection = layout.key,
                        id_field = layout.id_field,
                        position = %fallback,
                        "record without identifier, using position"
                    );
                    fallback
                }
            };

            let channel = folder.child(&id);
            pass.note_origin(&channel, &format!("{}/{id}", layout.key));
            self.ensure(store, &channel, &id, EntryKind::Channel, pass)
                .await?;
            self.record(store, &channel, fields, pass).await?;
            pass.report.records += 1;

            if layout.join_states {
                let id_value = fields.get(layout.id_field);
                let joined = states.and_then(|s| find_state(s, layout.id_field, id_value));
                match joined {
                    Some(state) => {
                        let path = channel.child(STATE_LEAF);
                        pass.note_origin(&path, &format!("{STATES_KEY}/{id}"));
                        self.write_leaf(store, &path, STATE_LEAF, state, pass).await?;
                        pass.report.joined += 1;
                    }
                    None => trace!(component = %id, "no state for component"),
                }
            }
        }
        Ok(())
    }

    async fn record<S: NamespaceStore>(
        &mut self,
        store: &S,
        channel: &NamespacePath,
        fields: &Map<String, Value>,
        pass: &mut Pass,
    ) -> Result<(), CoreError> {
        for (key, value) in fields {
            let path = channel.child(key);
            pass.note_origin(&path, key);
            self.write_leaf(store, &path, key, value, pass).await?;
        }
        Ok(())
    }

    /// Declare `path` unless it is already known. The path is registered
    /// only after the store accepted the declaration.
    async fn ensure<S: NamespaceStore>(
        &mut self,
        store: &S,
        path: &NamespacePath,
        name: &str,
        kind: EntryKind,
        pass: &mut Pass,
    ) -> Result<(), CoreError> {
        if self.known.contains(path) {
            return Ok(());
        }
        let decl = Declaration {
            path: path.clone(),
            name: name.to_owned(),
            kind,
        };
        store.declare(&decl).await?;
        self.known.register(path.clone());
        pass.report.declared += 1;
        trace!(path = %path, "declared");
        Ok(())
    }

    async fn write_leaf<S: NamespaceStore>(
        &mut self,
        store: &S,
        path: &NamespacePath,
        name: &str,
        value: &Value,
        pass: &mut Pass,
    ) -> Result<(), CoreError> {
        let (meta, stored) = infer_leaf(value);
        self.ensure(store, path, name, EntryKind::Leaf(meta), pass)
            .await?;
        store.set_value(path, &stored, true).await?;
        pass.report.written += 1;
        Ok(())
    }
}

/// The first state record whose identifier equals `id`.
fn find_state<'a>(states: &'a [Value], id_field: &str, id: Option<&Value>) -> Option<&'a Value> {
    let id = id?;
    states
        .iter()
        .find(|s| s.get(id_field) == Some(id))
        .and_then(|s| s.get(STATE_LEAF))
}

fn is_record_list(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

fn detect_id_field(items: &[Value]) -> &'static str {
    [COMPONENT_ID, SERVICE_ID, "id"]
        .into_iter()
        .find(|field| items.iter().all(|item| item.get(field).is_some()))
        .unwrap_or(COMPONENT_ID)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
