//! Configuration for the jablonet adapter.
//!
//! A flat TOML file merged over built-in defaults and `JABLONET_*`
//! environment variables, credential resolution (named env var, then
//! plaintext), and translation to [`jablonet_core::AdapterConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use jablonet_core::{AdapterConfig, FeatureFlags, SessionPolicy};

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "JABLONET_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {what} configured (set it in {path} or via JABLONET_{env})")]
    NoCredentials {
        what: &'static str,
        env: &'static str,
        path: String,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Adapter settings as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Account e-mail used to log in.
    pub username: Option<String>,

    /// Account password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,

    /// Seconds between the end of one cycle and the start of the next.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_true")]
    pub read_sections: bool,

    #[serde(default = "default_true")]
    pub read_programmable_gates: bool,

    #[serde(default)]
    pub read_thermo_devices: bool,

    /// Log raw API payloads at debug level.
    #[serde(default)]
    pub log_response: bool,

    /// Fixed session lifetime in seconds. Unset: keep the session until the
    /// cloud rejects it.
    pub session_lifetime: Option<u64>,

    #[serde(default = "default_dns_retry_limit")]
    pub dns_retry_limit: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            password_env: None,
            poll_interval: default_poll_interval(),
            read_sections: true,
            read_programmable_gates: true,
            read_thermo_devices: false,
            log_response: false,
            session_lifetime: None,
            dns_retry_limit: default_dns_retry_limit(),
            request_timeout: default_request_timeout(),
            base_url: default_base_url(),
        }
    }
}

fn default_poll_interval() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_dns_retry_limit() -> u32 {
    jablonet_core::config::DEFAULT_DNS_RETRY_LIMIT
}
fn default_request_timeout() -> u64 {
    AdapterConfig::default().request_timeout.as_secs()
}
fn default_base_url() -> String {
    AdapterConfig::default().base_url.to_string()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "jablonet", "jablonet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("jablonet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then `path` (or the platform path), then the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX));

    Ok(figment.extract()?)
}

/// Load only defaults and `path`, ignoring the environment.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path));
    Ok(figment.extract()?)
}

/// Render the effective configuration as TOML with the password masked.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    let mut shown = cfg.clone();
    if shown.password.is_some() {
        shown.password = Some("********".into());
    }
    Ok(toml::to_string_pretty(&shown)?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the password: the variable named by `password_env`, then the
/// plaintext `password` field.
pub fn resolve_password(cfg: &Config) -> Result<SecretString, ConfigError> {
    resolve_password_with(cfg, |name| std::env::var(name).ok())
}

/// [`resolve_password`] with an injectable environment lookup.
pub fn resolve_password_with(
    cfg: &Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref name) = cfg.password_env {
        if let Some(pw) = lookup(name) {
            return Ok(SecretString::from(pw));
        }
        debug!(var = %name, "password variable not set, falling back to config");
    }

    // 2. Plaintext in config
    if let Some(ref pw) = cfg.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        what: "password",
        env: "PASSWORD",
        path: config_path().display().to_string(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the runtime `AdapterConfig`. Range checks such as the poll
/// interval floor are left to [`AdapterConfig::validate`].
pub fn to_adapter_config(cfg: &Config) -> Result<AdapterConfig, ConfigError> {
    let username = cfg
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            what: "username",
            env: "USERNAME",
            path: config_path().display().to_string(),
        })?;
    let password = resolve_password(cfg)?;

    let base_url: url::Url = cfg.base_url.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {}", cfg.base_url),
    })?;

    let session_policy = match cfg.session_lifetime {
        None => SessionPolicy::UntilRejected,
        Some(secs) => SessionPolicy::FixedLifetime(Duration::from_secs(secs)),
    };

    Ok(AdapterConfig {
        username,
        password,
        poll_interval: Duration::from_secs(cfg.poll_interval),
        features: FeatureFlags {
            read_sections: cfg.read_sections,
            read_programmable_gates: cfg.read_programmable_gates,
            read_thermo_devices: cfg.read_thermo_devices,
        },
        log_response: cfg.log_response,
        session_policy,
        dns_retry_limit: cfg.dns_retry_limit,
        base_url,
        request_timeout: Duration::from_secs(cfg.request_timeout),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.poll_interval, 30);
        assert!(cfg.read_sections);
        assert!(!cfg.read_thermo_devices);
        assert_eq!(cfg.dns_retry_limit, 12);
        assert_eq!(cfg.request_timeout, 10);
        assert_eq!(cfg.base_url, "https://api.jablonet.net/api/2.2");
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            username = "user@example.com"
            password = "secret"
            poll_interval = 60
            read_thermo_devices = true
            session_lifetime = 900
            "#,
        );

        let cfg = load_file(file.path()).unwrap();
        let adapter = to_adapter_config(&cfg).unwrap();

        assert_eq!(adapter.username, "user@example.com");
        assert_eq!(adapter.password.expose_secret(), "secret");
        assert_eq!(adapter.poll_interval, Duration::from_secs(60));
        assert!(adapter.features.read_thermo_devices);
        assert_eq!(
            adapter.session_policy,
            SessionPolicy::FixedLifetime(Duration::from_secs(900))
        );
    }

    #[test]
    fn short_interval_passes_translation_and_fails_validation() {
        let file = write_config(
            r#"
            username = "user"
            password = "pw"
            poll_interval = 3
            "#,
        );

        let adapter = to_adapter_config(&load_file(file.path()).unwrap()).unwrap();
        assert!(adapter.validate().is_err());
    }

    #[test]
    fn password_env_takes_precedence() {
        let cfg = Config {
            password: Some("plain".into()),
            password_env: Some("MY_PW".into()),
            ..Config::default()
        };

        let pw = resolve_password_with(&cfg, |name| (name == "MY_PW").then(|| "from-env".into()));
        assert_eq!(pw.unwrap().expose_secret(), "from-env");

        let pw = resolve_password_with(&cfg, |_| None);
        assert_eq!(pw.unwrap().expose_secret(), "plain");
    }

    #[test]
    fn missing_credentials_are_reported() {
        let cfg = Config::default();
        assert!(matches!(
            to_adapter_config(&cfg),
            Err(ConfigError::NoCredentials { what: "username", .. })
        ));

        let cfg = Config {
            username: Some("user".into()),
            ..Config::default()
        };
        assert!(matches!(
            resolve_password_with(&cfg, |_| None),
            Err(ConfigError::NoCredentials { what: "password", .. })
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg = Config {
            username: Some("user".into()),
            password: Some("pw".into()),
            base_url: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            to_adapter_config(&cfg),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn rendered_config_masks_password() {
        let cfg = Config {
            username: Some("user".into()),
            password: Some("hunter2".into()),
            ..Config::default()
        };
        let rendered = render_config(&cfg).unwrap();
        assert!(rendered.contains("username = \"user\""));
        assert!(!rendered.contains("hunter2"));
    }
}
