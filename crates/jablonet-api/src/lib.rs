//! Async client for the Jablotron Jablonet cloud API.
//!
//! The cloud speaks JSON over POST only. Every response is wrapped in a
//! `{ "data": { ... } }` envelope; this crate strips the envelope and hands
//! the inner object back as a raw [`serde_json::Value`] so callers can walk
//! it without a fixed schema.
//!
//! - [`JablonetClient`]: login (cookie-derived session token) and the four
//!   resource queries described by [`Query`].
//! - [`TransportConfig`]: base URL, request timeout, and the fixed vendor
//!   header set the cloud expects from its mobile clients.
//! - [`Error`]: transport failures pre-classified into timeout,
//!   name-resolution, authorization and everything else.

pub mod auth;
pub mod client;
pub mod error;
pub mod query;
pub mod transport;

pub use client::JablonetClient;
pub use error::Error;
pub use query::{Query, ServiceId};
pub use transport::TransportConfig;
