// ── Authenticated session ──
//
// `IotasApi` is the seam to the HTTP client (faked in tests). `Session`
// pairs it with the `TokenManager`: every call fetches a bearer token,
// and a 401 from any endpoint drops the cached credential.

mod flight;
mod token;
mod topology;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::warn;

use iotas_api::{Account, Feature, IotasClient, Residency, Room, TokenGrant};

use crate::error::CoreError;

pub(crate) use flight::SingleFlight;
pub use token::TokenManager;
pub use topology::TopologyCache;
pub(crate) use topology::find_feature;

/// Remote operations the core needs from the IOTAS API.
#[async_trait]
pub trait IotasApi: Send + Sync {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, iotas_api::Error>;

    async fn refresh(
        &self,
        refresh_token: &SecretString,
        email: &str,
    ) -> Result<TokenGrant, iotas_api::Error>;

    async fn account(&self, token: &SecretString) -> Result<Account, iotas_api::Error>;

    async fn residencies(
        &self,
        token: &SecretString,
        account_id: u64,
    ) -> Result<Vec<Residency>, iotas_api::Error>;

    async fn unit_rooms(&self, token: &SecretString, unit: u64)
    -> Result<Vec<Room>, iotas_api::Error>;

    async fn feature(&self, token: &SecretString, feature_id: u64)
    -> Result<Feature, iotas_api::Error>;

    async fn update_feature(
        &self,
        token: &SecretString,
        feature_id: u64,
        value: f64,
    ) -> Result<(), iotas_api::Error>;
}

#[async_trait]
impl IotasApi for IotasClient {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenGrant, iotas_api::Error> {
        IotasClient::login(self, username, password).await
    }

    async fn refresh(
        &self,
        refresh_token: &SecretString,
        email: &str,
    ) -> Result<TokenGrant, iotas_api::Error> {
        IotasClient::refresh(self, refresh_token, email).await
    }

    async fn account(&self, token: &SecretString) -> Result<Account, iotas_api::Error> {
        IotasClient::account(self, token).await
    }

    async fn residencies(
        &self,
        token: &SecretString,
        account_id: u64,
    ) -> Result<Vec<Residency>, iotas_api::Error> {
        IotasClient::residencies(self, token, account_id).await
    }

    async fn unit_rooms(
        &self,
        token: &SecretString,
        unit: u64,
    ) -> Result<Vec<Room>, iotas_api::Error> {
        IotasClient::unit_rooms(self, token, unit).await
    }

    async fn feature(
        &self,
        token: &SecretString,
        feature_id: u64,
    ) -> Result<Feature, iotas_api::Error> {
        IotasClient::feature(self, token, feature_id).await
    }

    async fn update_feature(
        &self,
        token: &SecretString,
        feature_id: u64,
        value: f64,
    ) -> Result<(), iotas_api::Error> {
        IotasClient::update_feature(self, token, feature_id, value).await
    }
}

/// Bearer-authenticated access to the API.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn IotasApi>,
    tokens: TokenManager,
}

impl Session {
    pub fn new(api: Arc<dyn IotasApi>, tokens: TokenManager) -> Self {
        Self { api, tokens }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Current bearer token. During an authentication outage the token
    /// manager yields nothing; callers get `NotAuthenticated`.
    async fn bearer(&self) -> Result<SecretString, CoreError> {
        self.tokens.token().await.ok_or(CoreError::NotAuthenticated)
    }

    /// Convert a remote result, dropping the credential on 401.
    async fn settle<T>(&self, result: Result<T, iotas_api::Error>) -> Result<T, CoreError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_unauthorized() {
                    warn!("request rejected with 401, invalidating token");
                    self.tokens.invalidate().await;
                }
                Err(CoreError::from(e))
            }
        }
    }

    pub async fn account(&self) -> Result<Account, CoreError> {
        let token = self.bearer().await?;
        let result = self.api.account(&token).await;
        self.settle(result).await
    }

    pub async fn residencies(&self, account_id: u64) -> Result<Vec<Residency>, CoreError> {
        let token = self.bearer().await?;
        let result = self.api.residencies(&token, account_id).await;
        self.settle(result).await
    }

    pub async fn unit_rooms(&self, unit: u64) -> Result<Vec<Room>, CoreError> {
        let token = self.bearer().await?;
        let result = self.api.unit_rooms(&token, unit).await;
        self.settle(result).await
    }

    pub async fn feature(&self, feature_id: u64) -> Result<Feature, CoreError> {
        let token = self.bearer().await?;
        let result = self.api.feature(&token, feature_id).await;
        self.settle(result).await
    }

    pub async fn update_feature(&self, feature_id: u64, value: f64) -> Result<(), CoreError> {
        let token = self.bearer().await?;
        let result = self.api.update_feature(&token, feature_id, value).await;
        self.settle(result).await
    }
}
