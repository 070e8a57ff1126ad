#![allow(clippy::unwrap_used)]
// Test doubles: an in-memory IOTAS API and fixture builders.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::SecretString;

use iotas_api::{Account, Device, Feature, Residency, Room, TokenGrant};

use crate::session::IotasApi;

/// Unsigned JWT with the given `exp`; `nonce` keeps tokens distinct.
pub(crate) fn make_jwt(exp: i64, nonce: usize) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"n":{nonce}}}"#));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln")
}

/// Unsigned JWT without an `exp` claim.
pub(crate) fn make_jwt_without_expiry(nonce: usize) -> String {
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"n":{nonce}}}"#));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln")
}

/// Formatted log output, collected while the guard from `install` is
/// alive on the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Counters {
    logins: AtomicUsize,
    refreshes: AtomicUsize,
    accounts: AtomicUsize,
    rooms: AtomicUsize,
    features: AtomicUsize,
}

pub(crate) struct FakeApi {
    residencies: Mutex<Vec<Residency>>,
    rooms: Mutex<Vec<Room>>,
    writes: Mutex<Vec<(u64, f64)>>,
    token_ttl: Mutex<i64>,
    latency: Mutex<Duration>,
    counters: Counters,
    omit_expiry: AtomicBool,
    fail_logins: AtomicBool,
    fail_refreshes: AtomicBool,
    fail_writes: AtomicBool,
    reject_next: AtomicBool,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self {
            residencies: Mutex::new(vec![residency(1, "Apt 101")]),
            rooms: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            token_ttl: Mutex::new(3600),
            latency: Mutex::new(Duration::ZERO),
            counters: Counters::default(),
            omit_expiry: AtomicBool::new(false),
            fail_logins: AtomicBool::new(false),
            fail_refreshes: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            reject_next: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_residencies(&self, residencies: Vec<Residency>) {
        *self.residencies.lock().unwrap() = residencies;
    }

    pub(crate) fn set_rooms(&self, rooms: Vec<Room>) {
        *self.rooms.lock().unwrap() = rooms;
    }

    pub(crate) fn set_token_ttl(&self, secs: i64) {
        *self.token_ttl.lock().unwrap() = secs;
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Issue access tokens that carry no `exp` claim.
    pub(crate) fn omit_expiry(&self, omit: bool) {
        self.omit_expiry.store(omit, Ordering::SeqCst);
    }

    pub(crate) fn fail_logins(&self, fail: bool) {
        self.fail_logins.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_refreshes(&self, fail: bool) {
        self.fail_refreshes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer the next authenticated request with 401.
    pub(crate) fn reject_next_request(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn logins(&self) -> usize {
        self.counters.logins.load(Ordering::SeqCst)
    }

    pub(crate) fn refreshes(&self) -> usize {
        self.counters.refreshes.load(Ordering::SeqCst)
    }

    pub(crate) fn account_fetches(&self) -> usize {
        self.counters.accounts.load(Ordering::SeqCst)
    }

    pub(crate) fn room_fetches(&self) -> usize {
        self.counters.rooms.load(Ordering::SeqCst)
    }

    pub(crate) fn feature_fetches(&self) -> usize {
        self.counters.features.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> Vec<(u64, f64)> {
        self.writes.lock().unwrap().clone()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn grant(&self) -> TokenGrant {
        let issued = self.logins() + self.refreshes();
        let exp = chrono::Utc::now().timestamp() + *self.token_ttl.lock().unwrap();
        let jwt = if self.omit_expiry.load(Ordering::SeqCst) {
            make_jwt_without_expiry(issued)
        } else {
            make_jwt(exp, issued)
        };
        TokenGrant {
            access_token: SecretString::from(jwt),
            refresh_token: Some(SecretString::from(format!("refresh-{issued}"))),
        }
    }

    fn check_rejection(&self) -> Result<(), iotas_api::Error> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(iotas_api::Error::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl IotasApi for FakeApi {
    async fn login(
        &self,
        _username: &str,
        _password: &SecretString,
    ) -> Result<TokenGrant, iotas_api::Error> {
        self.delay().await;
        self.counters.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_logins.load(Ordering::SeqCst) {
            return Err(iotas_api::Error::Authentication {
                message: "bad credentials".into(),
            });
        }
        Ok(self.grant())
    }

    async fn refresh(
        &self,
        _refresh_token: &SecretString,
        _email: &str,
    ) -> Result<TokenGrant, iotas_api::Error> {
        self.delay().await;
        self.counters.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refreshes.load(Ordering::SeqCst) {
            return Err(iotas_api::Error::Authentication {
                message: "refresh token expired".into(),
            });
        }
        Ok(self.grant())
    }

    async fn account(&self, _token: &SecretString) -> Result<Account, iotas_api::Error> {
        self.check_rejection()?;
        self.counters.accounts.fetch_add(1, Ordering::SeqCst);
        Ok(Account {
            id: 77,
            email: Some("resident@example.com".into()),
        })
    }

    async fn residencies(
        &self,
        _token: &SecretString,
        _account_id: u64,
    ) -> Result<Vec<Residency>, iotas_api::Error> {
        self.check_rejection()?;
        Ok(self.residencies.lock().unwrap().clone())
    }

    async fn unit_rooms(
        &self,
        _token: &SecretString,
        _unit: u64,
    ) -> Result<Vec<Room>, iotas_api::Error> {
        self.delay().await;
        self.check_rejection()?;
        self.counters.rooms.fetch_add(1, Ordering::SeqCst);
        Ok(self.rooms.lock().unwrap().clone())
    }

    async fn feature(
        &self,
        _token: &SecretString,
        feature_id: u64,
    ) -> Result<Feature, iotas_api::Error> {
        self.check_rejection()?;
        self.counters.features.fetch_add(1, Ordering::SeqCst);
        crate::session::find_feature(&self.rooms.lock().unwrap(), feature_id)
            .cloned()
            .ok_or(iotas_api::Error::Api {
                status: 404,
                message: "feature not found".into(),
            })
    }

    async fn update_feature(
        &self,
        _token: &SecretString,
        feature_id: u64,
        value: f64,
    ) -> Result<(), iotas_api::Error> {
        self.check_rejection()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(iotas_api::Error::Api {
                status: 503,
                message: "device offline".into(),
            });
        }
        self.writes.lock().unwrap().push((feature_id, value));
        for feature in self
            .rooms
            .lock()
            .unwrap()
            .iter_mut()
            .flat_map(|room| &mut room.devices)
            .flat_map(|device| &mut device.features)
            .filter(|feature| feature.id == feature_id)
        {
            feature.value = value;
        }
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub(crate) fn residency(unit: u64, name: &str) -> Residency {
    Residency {
        id: Some(unit * 10),
        unit,
        unit_name: Some(name.to_owned()),
        building_name: None,
    }
}

/// A settable feature.
pub(crate) fn feature(id: u64, event: &str, type_name: &str, category: &str, value: f64) -> Feature {
    Feature {
        id,
        device: 0,
        event_type: 0,
        event_type_name: event.to_owned(),
        feature_type: 0,
        feature_type_name: type_name.to_owned(),
        feature_type_category: category.to_owned(),
        feature_type_settable: true,
        name: type_name.to_owned(),
        value,
        values: None,
    }
}

pub(crate) fn read_only(mut feature: Feature) -> Feature {
    feature.feature_type_settable = false;
    feature
}

pub(crate) fn mode_feature(id: u64, value: f64, values: &str) -> Feature {
    let mut mode = feature(id, "ThermostatMode", "Thermostat Mode", "thermostat_mode", value);
    mode.values = Some(values.to_owned());
    mode
}

pub(crate) fn device(id: u64, name: &str, features: Vec<Feature>) -> Device {
    Device {
        id,
        room: 0,
        device_template_id: 0,
        device_type: 0,
        name: name.to_owned(),
        category: "generic".to_owned(),
        active: true,
        movable: false,
        secure: false,
        paired: true,
        serial_number: None,
        features: features
            .into_iter()
            .map(|mut f| {
                f.device = id;
                f
            })
            .collect(),
    }
}

pub(crate) fn room(id: u64, name: &str, devices: Vec<Device>) -> Room {
    Room {
        id,
        unit: 1,
        name: name.to_owned(),
        devices: devices
            .into_iter()
            .map(|mut d| {
                d.room = id;
                d
            })
            .collect(),
    }
}
