// ── Unit and room topology ──
//
// Resolves the unit once per session, then serves the room graph with
// concurrent fetches collapsed into one request.

use std::sync::Arc;

use futures::future::FutureExt;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use iotas_api::{Feature, Residency, Room};

use super::{Session, SingleFlight};
use crate::error::CoreError;

struct TopologyInner {
    session: Session,
    unit_override: Option<String>,
    unit: OnceCell<u64>,
    rooms: SingleFlight<Result<Arc<Vec<Room>>, CoreError>>,
}

/// Room/device/feature graph of the active unit.
#[derive(Clone)]
pub struct TopologyCache {
    inner: Arc<TopologyInner>,
}

impl TopologyCache {
    pub fn new(session: Session, unit_override: Option<String>) -> Self {
        Self {
            inner: Arc::new(TopologyInner {
                session,
                unit_override,
                unit: OnceCell::new(),
                rooms: SingleFlight::new(),
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The active unit, resolved on first use and cached afterwards.
    pub async fn unit(&self) -> Result<u64, CoreError> {
        self.inner.unit().await
    }

    /// Fresh room graph of the active unit.
    pub async fn unit_rooms(&self) -> Result<Arc<Vec<Room>>, CoreError> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .rooms
            .run(move || {
                async move {
                    let unit = inner.unit().await?;
                    let rooms = inner.session.unit_rooms(unit).await?;
                    debug!(unit, rooms = rooms.len(), "fetched unit rooms");
                    Ok(Arc::new(rooms))
                }
                .boxed()
            })
            .await
    }

    /// Current state of one feature, taken from the room graph. Features
    /// missing from the graph are fetched individually.
    pub async fn feature(&self, feature_id: u64) -> Result<Feature, CoreError> {
        let rooms = self.unit_rooms().await?;
        if let Some(feature) = find_feature(&rooms, feature_id) {
            return Ok(feature.clone());
        }

        debug!(feature_id, "feature not in room graph, fetching directly");
        match self.inner.session.feature(feature_id).await {
            Err(CoreError::Remote {
                status: Some(404), ..
            }) => Err(CoreError::FeatureNotFound { feature_id }),
            other => other,
        }
    }
}

impl TopologyInner {
    async fn unit(&self) -> Result<u64, CoreError> {
        self.unit
            .get_or_try_init(|| async {
                let account = self.session.account().await?;
                let residencies = self.session.residencies(account.id).await?;
                let unit = select_unit(&residencies, self.unit_override.as_deref())?;
                info!(unit, "resolved active unit");
                Ok(unit)
            })
            .await
            .copied()
    }
}

/// Pick the residency matching the configured name, else the first one.
fn select_unit(residencies: &[Residency], unit_override: Option<&str>) -> Result<u64, CoreError> {
    let Some(first) = residencies.first() else {
        error!("no residencies found for this account");
        return Err(CoreError::NoUnit);
    };

    let Some(wanted) = unit_override else {
        return Ok(first.unit);
    };

    if let Some(residency) = residencies.iter().find(|r| {
        r.unit_name
            .as_deref()
            .is_some_and(|name| name.trim().eq_ignore_ascii_case(wanted.trim()))
    }) {
        return Ok(residency.unit);
    }

    warn!(
        unit = wanted,
        fallback = first.unit_name.as_deref().unwrap_or_default(),
        "configured unit not found, using the first residency"
    );
    Ok(first.unit)
}

pub(crate) fn find_feature(rooms: &[Room], feature_id: u64) -> Option<&Feature> {
    rooms
        .iter()
        .flat_map(|room| &room.devices)
        .flat_map(|device| &device.features)
        .find(|feature| feature.id == feature_id)
}
