// ── Adapter facade ──
//
// The small surface a host shim drives: start with a configuration, stop
// on unload, wait for the polling task to wind down.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::CloudApi;
use crate::config::AdapterConfig;
use crate::error::CoreError;
use crate::poller::{PollState, Poller};
use crate::store::{ConnectivityState, NamespaceStore};

/// A running adapter instance.
pub struct Adapter {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    connectivity: watch::Receiver<Option<ConnectivityState>>,
    task: JoinHandle<Result<(), CoreError>>,
}

impl Adapter {
    /// Validate `config` and spawn the polling loop on the current runtime.
    ///
    /// Configuration errors are returned before anything is spawned.
    pub fn start<A, S>(config: &AdapterConfig, api: A, store: Arc<S>) -> Result<Self, CoreError>
    where
        A: CloudApi + 'static,
        S: NamespaceStore + 'static,
    {
        let mut poller = Poller::new(config, api, store)?;
        let cancel = CancellationToken::new();
        let state = poller.subscribe_state();
        let connectivity = poller.subscribe_connectivity();

        let token = cancel.clone();
        let task = tokio::spawn(async move { poller.run(token).await });

        Ok(Self {
            cancel,
            state,
            connectivity,
            task,
        })
    }

    /// Request shutdown. The pending wait is cancelled; a cycle in flight
    /// finishes without further effect.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            debug!("stop requested");
            self.cancel.cancel();
        }
    }

    /// Token that stops the adapter when cancelled, for signal handlers.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_stopping(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn connectivity(&self) -> Option<ConnectivityState> {
        *self.connectivity.borrow()
    }

    pub fn subscribe_connectivity(&self) -> watch::Receiver<Option<ConnectivityState>> {
        self.connectivity.clone()
    }

    /// Wait for the polling task to end. Returns the fatal error that ended
    /// it, if any.
    pub async fn wait(self) -> Result<(), CoreError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoreError::Fatal {
                message: format!("polling task failed: {e}"),
            }),
        }
    }
}
