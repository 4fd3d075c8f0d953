// ── Session lifecycle ──
//
// Owns the credentials and the current session token. The token is
// replaced wholesale on every login; nothing else in the crate stores it.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::CloudApi;
use crate::config::{AdapterConfig, SessionPolicy};
use crate::error::CoreError;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    issued_at: Instant,
    logged_in_at: DateTime<Utc>,
    expires_at: Option<Instant>,
}

impl Session {
    fn issue(token: SecretString, policy: SessionPolicy) -> Self {
        let issued_at = Instant::now();
        let expires_at = match policy {
            SessionPolicy::UntilRejected => None,
            SessionPolicy::FixedLifetime(lifetime) => Some(issued_at + lifetime),
        };
        Self {
            token,
            issued_at,
            logged_in_at: Utc::now(),
            expires_at,
        }
    }

    /// Opaque cookie value replayed on every query.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Wall-clock time of the login, for display.
    pub fn logged_in_at(&self) -> DateTime<Utc> {
        self.logged_in_at
    }

    /// `None` when the session lives until the cloud rejects it.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Performs logins and decides when the current session must be replaced.
#[derive(Debug)]
pub struct SessionManager {
    username: String,
    password: SecretString,
    policy: SessionPolicy,
    current: Option<Session>,
    logins: u64,
}

impl SessionManager {
    pub fn new(username: impl Into<String>, password: SecretString, policy: SessionPolicy) -> Self {
        Self {
            username: username.into(),
            password,
            policy,
            current: None,
            logins: 0,
        }
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        Self::new(
            config.username.clone(),
            config.password.clone(),
            config.session_policy,
        )
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// The active session, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Number of successful logins so far.
    pub fn login_count(&self) -> u64 {
        self.logins
    }

    /// Log in with the stored credentials, replacing any current session.
    ///
    /// Every failure is an [`CoreError::AuthFailure`] except fatal errors and
    /// name-resolution failures, which the caller must count.
    pub async fn login<A: CloudApi>(&mut self, api: &A) -> Result<&Session, CoreError> {
        self.current = None;
        let token = match api.login(&self.username, &self.password).await {
            Ok(token) => token,
            Err(e) => {
                return Err(match CoreError::from(e) {
                    e @ (CoreError::TransientResolution { .. } | CoreError::AuthFailure { .. }) => e,
                    e if e.is_fatal() => e,
                    e => CoreError::AuthFailure {
                        message: format!("login failed: {e}"),
                    },
                });
            }
        };

        self.logins += 1;
        let session = Session::issue(token, self.policy);
        debug!(
            logins = self.logins,
            at = %session.logged_in_at.to_rfc3339(),
            fixed_lifetime = session.expires_at.is_some(),
            "session established"
        );
        Ok(&*self.current.insert(session))
    }

    /// Return the current session, logging in first when there is none or
    /// when its fixed lifetime has elapsed.
    pub async fn ensure_valid<A: CloudApi>(&mut self, api: &A) -> Result<&Session, CoreError> {
        let now = Instant::now();
        let reusable = self.current.as_ref().is_some_and(|s| !s.is_expired_at(now));
        if !reusable {
            if self.current.is_some() {
                info!("session lifetime elapsed, renewing");
            }
            return self.login(api).await;
        }
        self.current.as_ref().ok_or_else(|| CoreError::AuthFailure {
            message: "no active session".into(),
        })
    }

    /// Drop the current session and log in again.
    pub async fn renew<A: CloudApi>(&mut self, api: &A) -> Result<&Session, CoreError> {
        self.invalidate();
        match self.login(api).await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!(error = %e, "session renewal failed");
                Err(e)
            }
        }
    }

    /// Forget the current session. The next [`ensure_valid`](Self::ensure_valid)
    /// logs in again.
    pub fn invalidate(&mut self) {
        if self.current.take().is_some() {
            debug!("session invalidated");
        }
    }
}
