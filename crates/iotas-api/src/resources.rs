// Account, unit and feature endpoints

use secrecy::SecretString;
use tracing::debug;

use crate::client::IotasClient;
use crate::error::Error;
use crate::types::{Account, Feature, FeatureUpdate, Residency, Room};

impl IotasClient {
    /// The authenticated account.
    ///
    /// `GET /account/me`
    pub async fn account(&self, token: &SecretString) -> Result<Account, Error> {
        self.get("account/me", token).await
    }

    /// Residencies of an account; each one points at a unit.
    ///
    /// `GET /account/{account_id}/residency`
    pub async fn residencies(
        &self,
        token: &SecretString,
        account_id: u64,
    ) -> Result<Vec<Residency>, Error> {
        debug!(account_id, "listing residencies");
        self.get(&format!("account/{account_id}/residency"), token)
            .await
    }

    /// Full room/device/feature graph of a unit.
    ///
    /// `GET /unit/{unit}/rooms`
    pub async fn unit_rooms(&self, token: &SecretString, unit: u64) -> Result<Vec<Room>, Error> {
        debug!(unit, "fetching unit rooms");
        self.get(&format!("unit/{unit}/rooms"), token).await
    }

    /// A single feature.
    ///
    /// `GET /feature/{id}`
    pub async fn feature(&self, token: &SecretString, feature_id: u64) -> Result<Feature, Error> {
        self.get(&format!("feature/{feature_id}"), token).await
    }

    /// Write a feature value.
    ///
    /// `PUT /feature/{id}` with `{"value": n}`
    pub async fn update_feature(
        &self,
        token: &SecretString,
        feature_id: u64,
        value: f64,
    ) -> Result<(), Error> {
        debug!(feature_id, value, "updating feature");
        self.put(&format!("feature/{feature_id}"), token, &FeatureUpdate { value })
            .await
    }
}
