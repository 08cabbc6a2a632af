// Device registry HTTP client
//
// Wraps `reqwest::Client` with URL construction under `/api` and response
// decoding. Endpoint methods live in `devices.rs` and `rooms.rs` as
// inherent impls so this module stays focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shape: `{"status": "error", "message": "..."}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Raw HTTP client for the device registry API.
///
/// Cheap to clone; the underlying `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DeviceClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `http://192.168.1.20:5000`); every
    /// request path is built as `{base_url}/api/...`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`, percent-encoding each segment.
    ///
    /// Unique ids are opaque strings and may contain characters that are
    /// not path-safe, so they are always pushed as whole segments.
    pub(crate) fn api_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON response.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_response(resp).await
    }

    /// Map non-success statuses to `Error::Api`, otherwise decode `T`.
    async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| preview(&body));
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(len = body.len(), "response body received");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> DeviceClient {
        DeviceClient::with_client(reqwest::Client::new(), Url::parse(base).expect("valid url"))
    }

    #[test]
    fn api_url_appends_under_root() {
        let url = client("http://hub.local:5000")
            .api_url(&["device", "abc"])
            .expect("url");
        assert_eq!(url.as_str(), "http://hub.local:5000/api/device/abc");
    }

    #[test]
    fn api_url_keeps_base_prefix() {
        let url = client("http://hub.local/deck/")
            .api_url(&["rooms"])
            .expect("url");
        assert_eq!(url.as_str(), "http://hub.local/deck/api/rooms");
    }

    #[test]
    fn api_url_encodes_opaque_ids() {
        let url = client("http://hub.local")
            .api_url(&["device", "a b/c"])
            .expect("url");
        assert_eq!(url.path(), "/api/device/a%20b%2Fc");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        assert_eq!(preview(&body).chars().count(), 200);
    }
}
