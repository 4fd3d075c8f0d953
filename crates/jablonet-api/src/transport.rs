// Shared transport configuration for building the reqwest::Client.
//
// The cloud only answers clients that present the vendor header set of the
// official mobile app, so every request carries the same default headers.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::error::Error;

/// Public endpoint of the Jablonet cloud API.
pub const DEFAULT_BASE_URL: &str = "https://api.jablonet.net/api/2.2";

static DEFAULT_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL"));

/// Default deadline for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (iPhone13,2; U; CPU iPhone OS 14_0 like Mac OS X) \
    AppleWebKit/602.1.50 (KHTML, like Gecko) Version/10.0 Mobile/15E148 Safari/602.1";

const VENDOR_HEADERS: [(&str, &str); 8] = [
    ("x-vendor-id", "JABLOTRON:Jablotron"),
    ("x-client-version", "MYJ-PUB-ANDROID-12"),
    ("accept", "application/json"),
    ("accept-language", "en"),
    ("accept-encoding", "*"),
    ("cache-control", "private, no-cache, no-store, must-revalidate, max-age=0"),
    ("pragma", "no-cache"),
    ("expires", "0"),
];

/// [`DEFAULT_BASE_URL`], parsed.
pub fn default_base_url() -> Url {
    DEFAULT_URL.clone()
}

/// Shared transport configuration for building the HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self { base_url, timeout }
    }

    /// The fixed vendor identity header set.
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in VENDOR_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// No cookie store is attached: the session cookie is captured from the
    /// login response and replayed explicitly, so renewal fully replaces it.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(Self::default_headers())
            .build()
            .map_err(Error::Transport)
    }
}
