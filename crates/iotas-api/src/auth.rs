// Credential grants
//
// Password grant (`/auth/tokenwithrefresh`, HTTP basic auth) and refresh
// grant (`/auth/refresh`). Both return a short-lived JWT; the password
// grant also returns the long-lived refresh token.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::IotasClient;
use crate::error::Error;

/// Tokens handed out by either grant.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Bearer JWT for authenticated requests.
    pub access_token: SecretString,
    /// Refresh token. The refresh grant may omit it, in which case the
    /// previous one stays valid.
    pub refresh_token: Option<SecretString>,
}

#[derive(Deserialize)]
struct GrantBody {
    jwt: String,
    #[serde(default)]
    refresh: Option<String>,
}

impl From<GrantBody> for TokenGrant {
    fn from(body: GrantBody) -> Self {
        Self {
            access_token: SecretString::from(body.jwt),
            refresh_token: body.refresh.map(SecretString::from),
        }
    }
}

impl IotasClient {
    /// Exchange username/password for a token pair.
    ///
    /// `POST /auth/tokenwithrefresh` with HTTP basic auth and an empty JSON body.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<TokenGrant, Error> {
        let url = self.api_url("auth/tokenwithrefresh")?;
        debug!(username, "requesting token with password grant");

        let resp = self
            .http()
            .post(url)
            .basic_auth(username, Some(password.expose_secret()))
            .json(&json!({}))
            .send()
            .await?;

        Self::grant_response(resp).await
    }

    /// Rotate the access token using a refresh token.
    ///
    /// `POST /auth/refresh` with `{"refresh": "...", "email": "..."}`.
    pub async fn refresh(
        &self,
        refresh_token: &SecretString,
        email: &str,
    ) -> Result<TokenGrant, Error> {
        let url = self.api_url("auth/refresh")?;
        debug!("requesting token with refresh grant");

        let resp = self
            .http()
            .post(url)
            .json(&json!({
                "refresh": refresh_token.expose_secret(),
                "email": email,
            }))
            .send()
            .await?;

        Self::grant_response(resp).await
    }

    async fn grant_response(resp: reqwest::Response) -> Result<TokenGrant, Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("grant rejected (HTTP {status}): {body}"),
            });
        }
        Self::parse_json::<GrantBody>(resp).await.map(TokenGrant::from)
    }
}
