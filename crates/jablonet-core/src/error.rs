// ── Core error types ──
//
// The failure taxonomy the poll loop acts on. Transport details from
// `jablonet_api::Error` are folded into these variants by the `From` impl;
// the fetcher classifies timeouts and name-resolution failures before they
// ever reach this conversion.

use thiserror::Error;

use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthFailure { message: String },

    // ── Transport (recovered locally) ────────────────────────────────
    #[error("Request timed out: {context}")]
    Timeout { context: String },

    #[error("Name resolution failed ({attempt} consecutive): {message}")]
    TransientResolution { attempt: u32, message: String },

    // ── Reconciliation ───────────────────────────────────────────────
    #[error("Unsupported value type `{kind}` for {path}")]
    UnsupportedValueType { path: String, kind: &'static str },

    // ── Recoverable per cycle ────────────────────────────────────────
    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Terminal ─────────────────────────────────────────────────────
    #[error("Fatal: {message}")]
    Fatal { message: String },
}

impl CoreError {
    /// Errors that must reach the process boundary instead of merely
    /// skipping the current cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Fatal { .. } | Self::UnsupportedValueType { .. } | Self::Config { .. }
        )
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<jablonet_api::Error> for CoreError {
    fn from(err: jablonet_api::Error) -> Self {
        use jablonet_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthFailure { message },
            ApiError::Unauthorized { status } => CoreError::AuthFailure {
                message: format!("session rejected (HTTP {status})"),
            },
            ApiError::Timeout { context } => CoreError::Timeout { context },
            ApiError::DnsResolution { message } => CoreError::TransientResolution {
                attempt: 0,
                message,
            },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Fatal {
                message: format!("unexpected response: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(CoreError::Fatal { message: "x".into() }.is_fatal());
        assert!(
            CoreError::UnsupportedValueType {
                path: "a.b".into(),
                kind: "null"
            }
            .is_fatal()
        );
        assert!(!CoreError::AuthFailure { message: "x".into() }.is_fatal());
        assert!(
            !CoreError::Api {
                message: "x".into(),
                status: Some(500)
            }
            .is_fatal()
        );
    }

    #[test]
    fn api_errors_map_into_taxonomy() {
        let auth: CoreError = jablonet_api::Error::Unauthorized { status: 401 }.into();
        assert!(auth.is_auth_failure());

        let api: CoreError = jablonet_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(api.to_string(), "API error: bad gateway");
        assert!(!api.is_fatal());
    }
}
