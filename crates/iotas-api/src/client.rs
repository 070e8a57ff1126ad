// IOTAS HTTP client
//
// Wraps `reqwest::Client` with IOTAS-specific URL construction, bearer
// authorization and status handling. Endpoint methods live in `auth.rs`
// and `resources.rs` as inherent impls to keep this module focused on
// transport mechanics.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.iotashome.com/api/v1";

/// Raw HTTP client for the IOTAS cloud API.
///
/// Stateless apart from the connection pool: every authenticated call
/// takes the bearer token explicitly. Token caching and renewal are the
/// caller's business.
#[derive(Clone)]
pub struct IotasClient {
    http: reqwest::Client,
    base_url: Url,
}

impl IotasClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client (for auth flows that need direct access).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL: `{base}/{path}`.
    ///
    /// The base carries a path prefix (`/api/v1`), so `Url::join` would
    /// drop its last segment; concatenate instead.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET, decoding the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &SecretString,
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::parse_json(resp).await
    }

    /// Authenticated PUT with a JSON body. The response body is discarded.
    pub(crate) async fn put(
        &self,
        path: &str,
        token: &SecretString,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        let url = self.api_url(path)?;
        debug!("PUT {}", url);

        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        Self::check_status(resp).await.map(drop)
    }

    /// Map non-2xx statuses onto `Error`, passing successful responses through.
    pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body).to_owned(),
            });
        }

        Ok(resp)
    }

    pub(crate) async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let resp = Self::check_status(resp).await?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }
}

/// First 200 bytes of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
