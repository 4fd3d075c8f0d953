// jablonet-core: session lifecycle, polling and state reconciliation on top of jablonet-api.
//
// Control flow of one cycle: the poller asks the session manager for a
// valid session, the fetcher runs the service list and the per-service
// queries, and the reconciler mirrors every payload into the host store.

pub mod adapter;
pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod namespace;
pub mod poller;
pub mod reconcile;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::Adapter;
pub use api::CloudApi;
pub use config::{AdapterConfig, FeatureFlags, SessionPolicy};
pub use error::CoreError;
pub use fetcher::{DnsRetryBudget, ResourceFetcher};
pub use namespace::{KnownPaths, NamespacePath};
pub use poller::{CycleOutcome, CycleReport, PollState, Poller};
pub use reconcile::{CollectionLayout, ReconcileReport, Reconciler};
pub use session::{Session, SessionManager};
pub use store::{ConnectivityState, Declaration, EntryKind, MemoryStore, NamespaceStore};
