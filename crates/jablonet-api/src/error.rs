use thiserror::Error;

/// Top-level error type for the `jablonet-api` crate.
///
/// Transport failures are classified at the point where the request is
/// sent, so callers can branch on [`is_timeout`](Self::is_timeout),
/// [`is_resolution_failure`](Self::is_resolution_failure) and
/// [`is_auth_expired`](Self::is_auth_expired) without inspecting reqwest
/// internals. `jablonet-core` maps these into its own failure policy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, or no session cookie in the reply).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated call was refused; the session token is no longer valid.
    #[error("Session rejected by the cloud (HTTP {status})")]
    Unauthorized { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// Client-side deadline exceeded, request aborted, or upstream HTTP 504.
    #[error("Request timed out: {context}")]
    Timeout { context: String },

    /// Host name could not be resolved.
    #[error("DNS resolution failed: {message}")]
    DnsResolution { message: String },

    /// Any other HTTP transport error (connection refused, TLS, body read).
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status other than 401 and 504.
    #[error("Jablonet API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not JSON or carried no `data` envelope.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Classify a reqwest failure into timeout, name-resolution, or
    /// generic transport error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                context: err.to_string(),
            };
        }
        if is_dns_failure(&err) {
            return Self::DnsResolution {
                message: source_chain(&err),
            };
        }
        Self::Transport(err)
    }

    /// Returns `true` for deadline / abort failures, which are skipped
    /// without counting against any retry budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the host name could not be resolved.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::DnsResolution { .. })
    }

    /// Returns `true` if the session must be renewed before retrying.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status } | Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Walk the source chain looking for the resolver failure that hyper's
/// connector reports as `dns error`.
pub(crate) fn is_dns_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        current = e.source();
    }
    false
}

fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        parts.push(e.to_string());
        current = e.source();
    }
    parts.join(": ")
}
