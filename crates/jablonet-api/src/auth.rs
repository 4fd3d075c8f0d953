// Account authentication
//
// The login endpoint answers with a `Set-Cookie` header; the `name=value`
// pair before the first `;` is the session token replayed as `Cookie` on
// every later request.

use chrono::Utc;
use reqwest::header::{HeaderMap, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info};

use crate::client::JablonetClient;
use crate::error::Error;

const LOGIN_PATH: &str = "userAuthorize.json";

impl JablonetClient {
    /// Authenticate with username/password and return the session token.
    ///
    /// The request carries a millisecond `timestamp` query parameter the
    /// cloud uses as a cache buster. A reply without a session cookie is a
    /// rejected login, not a transport fault.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let mut url = self.api_url(LOGIN_PATH)?;
        url.query_pairs_mut()
            .append_pair("timestamp", &Utc::now().timestamp_millis().to_string());

        debug!("fetching new session id");

        let body = json!({
            "login": username,
            "password": password.expose_secret(),
        });

        let resp = match self.post(url, &body, None).await {
            Ok(resp) => resp,
            Err(Error::Unauthorized { status } | Error::Api { status: status @ 403, .. }) => {
                return Err(Error::Authentication {
                    message: format!("login rejected (HTTP {status})"),
                });
            }
            Err(e) => return Err(e),
        };

        if self.logs_responses() {
            debug!(headers = ?resp.headers, "login response headers");
        }

        let token = session_cookie(&resp.headers).ok_or_else(|| Error::Authentication {
            message: "login failed, no session id received".into(),
        })?;

        info!("logged in to jablonet api");
        Ok(SecretString::from(token))
    }
}

/// Extract the `name=value` part of the first `Set-Cookie` header.
pub(crate) fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(SET_COOKIE)?.to_str().ok()?;
    let pair = raw.split(';').next()?.trim();
    if pair.is_empty() {
        None
    } else {
        Some(pair.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn cookie_pair_is_cut_at_first_attribute() {
        let mut headers = HeaderMap::new();
        headers.insert(
            SET_COOKIE,
            HeaderValue::from_static("PHPSESSID=abc123; path=/; HttpOnly"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("PHPSESSID=abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        assert!(session_cookie(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("; path=/"));
        assert!(session_cookie(&headers).is_none());
    }
}
