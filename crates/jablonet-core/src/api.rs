// ── Cloud API seam ──
//
// The session manager and the fetcher talk to the cloud through this
// trait, so the poll flow can be driven by a scripted fake in tests.

use std::future::Future;
use std::sync::Arc;

use jablonet_api::{JablonetClient, Query};
use secrecy::SecretString;
use serde_json::Value;

/// Login and resource queries against the cloud.
///
/// Errors stay in transport form so callers can tell timeouts, name
/// resolution and authorization failures apart.
pub trait CloudApi: Send + Sync {
    /// Authenticate and return the session token.
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<SecretString, jablonet_api::Error>> + Send;

    /// Run `query` with the given session token, returning the `data` object.
    fn query(
        &self,
        query: &Query,
        session: &SecretString,
    ) -> impl Future<Output = Result<Value, jablonet_api::Error>> + Send;
}

impl CloudApi for JablonetClient {
    async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, jablonet_api::Error> {
        JablonetClient::login(self, username, password).await
    }

    async fn query(&self, query: &Query, session: &SecretString) -> Result<Value, jablonet_api::Error> {
        JablonetClient::query(self, query, session).await
    }
}

impl<A: CloudApi> CloudApi for Arc<A> {
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<SecretString, jablonet_api::Error>> + Send {
        (**self).login(username, password)
    }

    fn query(
        &self,
        query: &Query,
        session: &SecretString,
    ) -> impl Future<Output = Result<Value, jablonet_api::Error>> + Send {
        (**self).query(query, session)
    }
}
