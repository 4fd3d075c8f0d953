// Resource queries
//
// One variant per POST endpoint. The account-level service list is the
// root; the remaining queries are scoped to a single service.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifier of a service (an installation bound to the account).
///
/// The cloud emits it as a JSON number or string depending on the service
/// type; it is echoed back verbatim in scoped request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(Value);

impl ServiceId {
    /// Read the identifier from a `service-id` field. Only strings and
    /// numbers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Number(_) => Some(Self(value.clone())),
            _ => None,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_owned()))
    }
}

impl From<u64> for ServiceId {
    fn from(n: u64) -> Self {
        Self(Value::from(n))
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// A resource query against the cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// All services related to the account.
    Services,
    /// Alarm sections of a service, with their states.
    Sections(ServiceId),
    /// Programmable gates (PG outputs) of a service, with their states.
    ProgrammableGates(ServiceId),
    /// Thermostats and thermometers of a service.
    ThermoDevices(ServiceId),
}

impl Query {
    /// Endpoint path relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Services => "JA100/serviceListGet.json",
            Self::Sections(_) => "JA100/sectionsGet.json",
            Self::ProgrammableGates(_) => "JA100/programmableGatesGet.json",
            Self::ThermoDevices(_) => "JA100/thermoDevicesGet.json",
        }
    }

    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Services => "serviceListGet",
            Self::Sections(_) => "sectionsGet",
            Self::ProgrammableGates(_) => "programmableGatesGet",
            Self::ThermoDevices(_) => "thermoDevicesGet",
        }
    }

    pub fn service_id(&self) -> Option<&ServiceId> {
        match self {
            Self::Services => None,
            Self::Sections(id) | Self::ProgrammableGates(id) | Self::ThermoDevices(id) => Some(id),
        }
    }

    /// JSON request body.
    pub fn body(&self) -> Value {
        match self.service_id() {
            None => json!({
                "list-type": "EXTENDED",
                "visibility": "DEFAULT",
            }),
            Some(id) => json!({
                "connect-device": true,
                "list-type": "FULL",
                "service-id": id,
                "service-states": true,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scoped_body_echoes_numeric_service_id() {
        let id = ServiceId::from_value(&json!(4711)).unwrap();
        let body = Query::Sections(id).body();
        assert_eq!(
            body,
            json!({
                "connect-device": true,
                "list-type": "FULL",
                "service-id": 4711,
                "service-states": true,
            })
        );
    }

    #[test]
    fn service_id_display_strips_quotes() {
        assert_eq!(ServiceId::from("ABC-1").to_string(), "ABC-1");
        assert_eq!(ServiceId::from(42_u64).to_string(), "42");
    }

    #[test]
    fn service_id_rejects_structures() {
        assert!(ServiceId::from_value(&json!({"a": 1})).is_none());
        assert!(ServiceId::from_value(&Value::Null).is_none());
    }
}
