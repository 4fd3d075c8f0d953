// ── Resource fetching ──
//
// Issues the service list and the per-service queries with the current
// session and applies the per-query failure policy: timeouts skip,
// resolution failures are counted against a bounded budget, and a
// rejected session is renewed and the query retried once.

use jablonet_api::{Query, ServiceId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::CloudApi;
use crate::config::FeatureFlags;
use crate::error::CoreError;
use crate::reconcile::SERVICE_ID;
use crate::session::SessionManager;

/// Counter of consecutive name-resolution failures.
///
/// Reset by any successful call. Reaching the ceiling escalates the
/// failure to [`CoreError::Fatal`].
#[derive(Debug, Clone)]
pub struct DnsRetryBudget {
    consecutive: u32,
    ceiling: u32,
}

impl DnsRetryBudget {
    pub fn new(ceiling: u32) -> Self {
        Self {
            consecutive: 0,
            ceiling: ceiling.max(1),
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn reset(&mut self) {
        if self.consecutive > 0 {
            debug!(after = self.consecutive, "name resolution recovered");
        }
        self.consecutive = 0;
    }

    /// Count one failure. Returns the new count while below the ceiling.
    pub fn record_failure(&mut self, message: &str) -> Result<u32, CoreError> {
        self.consecutive += 1;
        if self.consecutive >= self.ceiling {
            return Err(CoreError::Fatal {
                message: format!(
                    "name resolution failed {} times in a row: {message}",
                    self.consecutive
                ),
            });
        }
        warn!(
            attempt = self.consecutive,
            ceiling = self.ceiling,
            error = message,
            "name resolution failed, skipping"
        );
        Ok(self.consecutive)
    }
}

/// Runs resource queries under the per-query failure policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFetcher {
    features: FeatureFlags,
}

impl ResourceFetcher {
    pub fn new(features: FeatureFlags) -> Self {
        Self { features }
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Enabled per-service queries, in fixed order.
    pub fn service_queries(&self, service: &ServiceId) -> Vec<Query> {
        let mut queries = Vec::with_capacity(3);
        if self.features.read_sections {
            queries.push(Query::Sections(service.clone()));
        }
        if self.features.read_programmable_gates {
            queries.push(Query::ProgrammableGates(service.clone()));
        }
        if self.features.read_thermo_devices {
            queries.push(Query::ThermoDevices(service.clone()));
        }
        queries
    }

    /// Run one query.
    ///
    /// `Ok(None)` means the query was skipped for this cycle (timeout, or a
    /// resolution failure below the ceiling). A 401 triggers one renewal
    /// and one retry; a second rejection is an [`CoreError::AuthFailure`].
    pub async fn fetch<A: CloudApi>(
        &self,
        api: &A,
        sessions: &mut SessionManager,
        budget: &mut DnsRetryBudget,
        query: &Query,
    ) -> Result<Option<Value>, CoreError> {
        let first = match sessions.current() {
            Some(session) => api.query(query, session.token()).await,
            None => {
                return Err(CoreError::AuthFailure {
                    message: "no active session".into(),
                });
            }
        };

        match first {
            Ok(data) => {
                budget.reset();
                Ok(Some(data))
            }
            Err(e) if e.is_auth_expired() => {
                debug!(query = query.name(), "session rejected, renewing");
                let session = match sessions.renew(api).await {
                    Ok(session) => session,
                    Err(CoreError::TransientResolution { message, .. }) => {
                        budget.record_failure(&message)?;
                        return Err(CoreError::AuthFailure {
                            message: format!("session renewal failed: {message}"),
                        });
                    }
                    Err(e) => return Err(e),
                };
                budget.reset();
                match api.query(query, session.token()).await {
                    Ok(data) => Ok(Some(data)),
                    Err(e) => classify(query, budget, e),
                }
            }
            Err(e) => classify(query, budget, e),
        }
    }
}

/// Apply the skip/count/propagate policy to a failed query.
fn classify(
    query: &Query,
    budget: &mut DnsRetryBudget,
    err: jablonet_api::Error,
) -> Result<Option<Value>, CoreError> {
    if err.is_timeout() {
        warn!(query = query.name(), error = %err, "query timed out, skipping");
        return Ok(None);
    }
    if err.is_resolution_failure() {
        budget.record_failure(&err.to_string())?;
        return Ok(None);
    }
    Err(err.into())
}

/// Identifiers of every service in a `serviceListGet` payload.
pub fn service_ids(payload: &Value) -> Vec<ServiceId> {
    payload
        .get("services")
        .and_then(Value::as_array)
        .map(|services| {
            services
                .iter()
                .filter_map(|s| s.get(SERVICE_ID).and_then(ServiceId::from_value))
                .collect()
        })
        .unwrap_or_default()
}
