// ── Runtime adapter configuration ──
//
// These types describe how to poll the cloud. They carry credential data
// and polling tuning, but never touch disk: `jablonet-config` builds an
// `AdapterConfig` and hands it in.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;

/// Lower bound for the poll interval. Anything faster risks an account ban.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive name-resolution failures tolerated before giving up.
pub const DEFAULT_DNS_RETRY_LIMIT: u32 = 12;

/// How long a session token is trusted.
///
/// One mode per run; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPolicy {
    /// No client-side expiry. The token is renewed when the cloud answers
    /// an authenticated call with HTTP 401.
    #[default]
    UntilRejected,
    /// The token is renewed before the first cycle that starts after
    /// `issued_at + lifetime`.
    FixedLifetime(Duration),
}

/// Which per-service queries run each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub read_sections: bool,
    pub read_programmable_gates: bool,
    pub read_thermo_devices: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            read_sections: true,
            read_programmable_gates: true,
            read_thermo_devices: false,
        }
    }
}

/// Configuration for one adapter instance.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub username: String,
    pub password: SecretString,
    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    pub features: FeatureFlags,
    /// Log raw response payloads at debug level.
    pub log_response: bool,
    pub session_policy: SessionPolicy,
    /// Ceiling for consecutive DNS failures before the loop gives up.
    pub dns_retry_limit: u32,
    /// Cloud API base URL.
    pub base_url: Url,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

impl AdapterConfig {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            ..Self::default()
        }
    }

    /// Startup validation. Runs before any network call.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(CoreError::Config {
                message: format!(
                    "poll interval must be at least {}s, got {}s",
                    MIN_POLL_INTERVAL.as_secs(),
                    self.poll_interval.as_secs_f32()
                ),
            });
        }
        if self.username.trim().is_empty() || self.password.expose_secret().is_empty() {
            return Err(CoreError::Config {
                message: "username and password are mandatory".into(),
            });
        }
        if self.dns_retry_limit == 0 {
            return Err(CoreError::Config {
                message: "dns retry limit must be at least 1".into(),
            });
        }
        if let SessionPolicy::FixedLifetime(lifetime) = self.session_policy {
            if lifetime.is_zero() {
                return Err(CoreError::Config {
                    message: "session lifetime must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecretString::from(String::new()),
            poll_interval: Duration::from_secs(30),
            features: FeatureFlags::default(),
            log_response: false,
            session_policy: SessionPolicy::default(),
            dns_retry_limit: DEFAULT_DNS_RETRY_LIMIT,
            base_url: jablonet_api::transport::default_base_url(),
            request_timeout: jablonet_api::transport::DEFAULT_TIMEOUT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid() -> AdapterConfig {
        AdapterConfig::new("user@example.com", SecretString::from("pw".to_string()))
    }

    #[test]
    fn defaults_validate() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn poll_interval_below_floor_is_rejected() {
        let mut cfg = valid();
        cfg.poll_interval = Duration::from_secs(3);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
        assert!(err.to_string().contains("at least 5s"));
    }

    #[test]
    fn poll_interval_at_floor_is_accepted() {
        let mut cfg = valid();
        cfg.poll_interval = MIN_POLL_INTERVAL;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let cfg = AdapterConfig::new("", SecretString::from("pw".to_string()));
        assert!(cfg.validate().is_err());

        let cfg = AdapterConfig::new("user", SecretString::from(String::new()));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let mut cfg = valid();
        cfg.session_policy = SessionPolicy::FixedLifetime(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }
}
