// ── Poll scheduler ──
//
// Drives one fetch-and-reconcile cycle at a time. The next cycle is armed
// only after the current one has completed, by a single-shot sleep raced
// against the cancellation token, so cycles never overlap no matter how
// long one takes.

use std::sync::Arc;
use std::time::Duration;

use jablonet_api::Query;
use serde_json::Value;
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::CloudApi;
use crate::config::AdapterConfig;
use crate::error::CoreError;
use crate::fetcher::{DnsRetryBudget, ResourceFetcher, service_ids};
use crate::namespace::NamespacePath;
use crate::reconcile::{
    CollectionLayout, PROGRAMMABLE_GATES, ReconcileReport, Reconciler, SECTIONS, SERVICES,
    THERMO_DEVICES,
};
use crate::session::SessionManager;
use crate::store::{ConnectivityState, NamespaceStore};

// ── PollState ────────────────────────────────────────────────────

/// Scheduler state, observable through [`Poller::subscribe_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    Idle,
    Authenticating,
    Fetching,
    Reconciling,
    /// Waiting for the next cycle.
    Scheduled,
    Stopped,
}

// ── Cycle results ────────────────────────────────────────────────

/// How a cycle ended when it did not end the loop.
#[derive(Debug)]
pub enum CycleOutcome {
    /// All enabled queries ran; some may have been skipped.
    Completed,
    /// The session could not be established or renewed. Connectivity was
    /// marked false.
    Abandoned(CoreError),
    /// A recoverable error stopped the cycle early.
    Skipped(CoreError),
}

#[derive(Debug)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Queries that returned a payload.
    pub fetched: usize,
    /// Queries skipped because of a timeout or resolution failure.
    pub skipped: usize,
    pub reconcile: ReconcileReport,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            outcome: CycleOutcome::Completed,
            fetched: 0,
            skipped: 0,
            reconcile: ReconcileReport::default(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Completed)
    }
}

// ── Poller ───────────────────────────────────────────────────────

/// Owns the session, the known-paths registry and the DNS budget of one
/// adapter instance. Only one cycle is ever in flight.
pub struct Poller<A, S> {
    api: A,
    store: Arc<S>,
    interval: Duration,
    sessions: SessionManager,
    fetcher: ResourceFetcher,
    reconciler: Reconciler,
    budget: DnsRetryBudget,
    state: watch::Sender<PollState>,
    connectivity: watch::Sender<Option<ConnectivityState>>,
    cancel: CancellationToken,
    cycles: u64,
}

impl<A, S> Poller<A, S>
where
    A: CloudApi,
    S: NamespaceStore + 'static,
{
    /// Validate `config` and build a poller. No network call is made here;
    /// an invalid configuration never reaches the cloud.
    pub fn new(config: &AdapterConfig, api: A, store: Arc<S>) -> Result<Self, CoreError> {
        config.validate()?;
        let (state, _) = watch::channel(PollState::Idle);
        let (connectivity, _) = watch::channel(None);
        Ok(Self {
            api,
            store,
            interval: config.poll_interval,
            sessions: SessionManager::from_config(config),
            fetcher: ResourceFetcher::new(config.features),
            reconciler: Reconciler::new(),
            budget: DnsRetryBudget::new(config.dns_retry_limit),
            state,
            connectivity,
            cancel: CancellationToken::new(),
            cycles: 0,
        })
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Last published connectivity; `None` until the first cycle ran.
    pub fn connectivity(&self) -> Option<ConnectivityState> {
        *self.connectivity.borrow()
    }

    pub fn subscribe_connectivity(&self) -> watch::Receiver<Option<ConnectivityState>> {
        self.connectivity.subscribe()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn dns_budget(&self) -> &DnsRetryBudget {
        &self.budget
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until `cancel` fires or a fatal error occurs.
    ///
    /// Cancellation stops the pending wait; a cycle already running is
    /// allowed to finish but publishes nothing afterwards.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        self.cancel = cancel;
        info!(interval_secs = self.interval.as_secs(), "polling started");

        let result = loop {
            if self.cancel.is_cancelled() {
                break Ok(());
            }

            match self.run_cycle().await {
                Ok(report) => debug!(
                    cycle = self.cycles,
                    fetched = report.fetched,
                    skipped = report.skipped,
                    declared = report.reconcile.declared,
                    written = report.reconcile.written,
                    "cycle finished"
                ),
                Err(e) => {
                    warn!(error = %e, "polling stopped on fatal error");
                    break Err(e);
                }
            }

            if self.cancel.is_cancelled() {
                break Ok(());
            }

            self.set_state(PollState::Scheduled);
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Ok(()),
                () = tokio::time::sleep(self.interval) => {}
            }
        };

        self.shutdown();
        result
    }

    /// Run one fetch-and-reconcile pass.
    ///
    /// Recoverable failures are reported through [`CycleOutcome`]; only
    /// fatal errors are returned as `Err`.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CoreError> {
        self.cycles += 1;
        let mut report = CycleReport::new();

        match self.cycle(&mut report).await {
            Ok(()) if report.fetched > 0 => {
                self.publish(ConnectivityState::Connected).await;
            }
            Ok(()) => debug!("nothing fetched this cycle"),
            Err(e) if e.is_fatal() => {
                self.publish(ConnectivityState::Disconnected).await;
                return Err(e);
            }
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "cycle abandoned");
                self.publish(ConnectivityState::Disconnected).await;
                report.outcome = CycleOutcome::Abandoned(e);
            }
            Err(e) => {
                warn!(error = %e, "cycle skipped");
                report.outcome = CycleOutcome::Skipped(e);
            }
        }
        Ok(report)
    }

    async fn cycle(&mut self, report: &mut CycleReport) -> Result<(), CoreError> {
        self.set_state(PollState::Authenticating);
        let logins = self.sessions.login_count();
        let session = self.sessions.ensure_valid(&self.api).await.map(|_| ());
        match session {
            Ok(()) => {
                if self.sessions.login_count() > logins {
                    self.budget.reset();
                }
            }
            Err(CoreError::TransientResolution { message, .. }) => {
                let attempt = self.budget.record_failure(&message)?;
                return Err(CoreError::TransientResolution { attempt, message });
            }
            Err(e) => return Err(e),
        }

        self.set_state(PollState::Fetching);
        let Some(services) = self.fetch(&Query::Services, report).await? else {
            return Ok(());
        };

        let mut payloads: Vec<(NamespacePath, CollectionLayout<'static>, Value)> = Vec::new();
        for service in service_ids(&services) {
            let base = NamespacePath::root(SERVICES.folder).child(&service.to_string());
            for query in self.fetcher.service_queries(&service) {
                if let Some(payload) = self.fetch(&query, report).await? {
                    payloads.push((base.clone(), collection_for(&query), payload));
                }
            }
        }

        self.set_state(PollState::Reconciling);
        let store = self.store.as_ref();
        let services_report = self
            .reconciler
            .reconcile_collection(store, None, &SERVICES, &services)
            .await?;
        report.reconcile.merge(services_report);

        for (base, layout, payload) in &payloads {
            let pass = self
                .reconciler
                .reconcile_collection(store, Some(base), layout, payload)
                .await?;
            report.reconcile.merge(pass);
        }
        Ok(())
    }

    async fn fetch(
        &mut self,
        query: &Query,
        report: &mut CycleReport,
    ) -> Result<Option<Value>, CoreError> {
        let result = self
            .fetcher
            .fetch(&self.api, &mut self.sessions, &mut self.budget, query)
            .await?;
        match result {
            Some(_) => report.fetched += 1,
            None => report.skipped += 1,
        }
        Ok(result)
    }

    fn set_state(&self, state: PollState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = %current, to = %state, "poll state");
            *current = state;
            true
        });
    }

    /// Publish connectivity on change. Nothing is published once
    /// cancellation was requested.
    async fn publish(&self, state: ConnectivityState) {
        if self.cancel.is_cancelled() {
            return;
        }
        if *self.connectivity.borrow() == Some(state) {
            return;
        }
        self.connectivity.send_replace(Some(state));
        info!(connected = state.is_connected(), "connectivity changed");
        if let Err(e) = self.store.publish_connectivity(state).await {
            warn!(error = %e, "failed to publish connectivity");
        }
    }

    /// Enter `Stopped` and write connectivity false without waiting for it.
    fn shutdown(&self) {
        self.set_state(PollState::Stopped);
        self.connectivity
            .send_replace(Some(ConnectivityState::Disconnected));

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store
                .publish_connectivity(ConnectivityState::Disconnected)
                .await
            {
                debug!(error = %e, "final connectivity write failed");
            }
        });
        info!("polling stopped");
    }
}

/// Collection a per-service query fills.
fn collection_for(query: &Query) -> CollectionLayout<'static> {
    match query {
        Query::Services => SERVICES,
        Query::Sections(_) => SECTIONS,
        Query::ProgrammableGates(_) => PROGRAMMABLE_GATES,
        Query::ThermoDevices(_) => THERMO_DEVICES,
    }
}
