// Jablonet HTTP client
//
// Wraps `reqwest::Client` with base-URL construction, the session cookie
// header, status classification, and `{ data: {...} }` envelope unwrapping.
// Login lives in `auth.rs` as an inherent method on the same type.

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::query::Query;
use crate::transport::TransportConfig;

/// Raw HTTP response after status checks, before envelope handling.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub(crate) headers: HeaderMap,
    pub(crate) body: String,
}

/// HTTP client for the Jablonet cloud API.
///
/// Stateless with respect to the session: the caller owns the session
/// token and passes it to every [`query`](Self::query).
#[derive(Debug, Clone)]
pub struct JablonetClient {
    http: reqwest::Client,
    base_url: Url,
    log_response: bool,
}

impl JablonetClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url: transport.base_url.clone(),
            log_response: false,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            log_response: false,
        }
    }

    /// Log full response headers and payloads at debug level.
    pub fn log_responses(mut self, enabled: bool) -> Self {
        self.log_response = enabled;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn logs_responses(&self) -> bool {
        self.log_response
    }

    /// Build a full URL for an endpoint path: `{base}/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Ok(Url::parse(&full)?)
    }

    /// Run a resource query and return the `data` object of the envelope.
    pub async fn query(&self, query: &Query, session: &SecretString) -> Result<Value, Error> {
        let url = self.api_url(query.endpoint())?;
        let raw = self
            .post(url, &query.body(), Some(session.expose_secret()))
            .await?;

        let data = unwrap_envelope(&raw.body)?;
        if self.log_response {
            debug!(query = query.name(), payload = %data, "response payload");
        }
        Ok(data)
    }

    /// Send a POST request with JSON body, classifying failures.
    pub(crate) async fn post(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
        cookie: Option<&str>,
    ) -> Result<RawResponse, Error> {
        debug!("POST {}", url.path());

        let mut builder = self.http.post(url).json(body);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let resp = builder.send().await.map_err(Error::from_reqwest)?;
        let status = resp.status();
        let headers = resp.headers().clone();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }

        if status == StatusCode::GATEWAY_TIMEOUT {
            return Err(Error::Timeout {
                context: "upstream gateway timeout (HTTP 504)".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(Error::from_reqwest)?;
        trace!(bytes = body.len(), "response body received");
        Ok(RawResponse { headers, body })
    }
}

/// Parse a response body and return its `data` object.
fn unwrap_envelope(body: &str) -> Result<Value, Error> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })?;

    match parsed {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(Error::Deserialization {
                message: "response has no `data` object".into(),
                body: body.to_owned(),
            }),
        },
        _ => Err(Error::Deserialization {
            message: "response is not a JSON object".into(),
            body: body.to_owned(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_data_is_returned() {
        let data = unwrap_envelope(r#"{"data":{"services":[]},"http-code":200}"#).unwrap();
        assert_eq!(data, json!({"services": []}));
    }

    #[test]
    fn envelope_without_data_is_rejected() {
        let err = unwrap_envelope(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn api_url_joins_base_path() {
        let client = JablonetClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://api.jablonet.net/api/2.2/").unwrap(),
        );
        let url = client.api_url("JA100/sectionsGet.json").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.jablonet.net/api/2.2/JA100/sectionsGet.json"
        );
    }
}
