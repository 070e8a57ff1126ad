// ── Token lifecycle ──
//
// Caches the bearer credential, refreshes it before expiry and
// deduplicates concurrent grants. A failed grant never surfaces as an
// error: waiters get `None` and a retry is scheduled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::{BoxFuture, FutureExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::{IotasApi, SingleFlight};

/// A token is only reused while it stays valid this much longer.
const EXPIRY_MARGIN_SECS: i64 = 60;

struct Credential {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    /// `exp` claim of the access token, when it could be decoded.
    expiry: Option<DateTime<Utc>>,
}

impl Credential {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        // Without a readable expiry the token counts as expired.
        self.expiry
            .is_some_and(|exp| exp > now + TimeDelta::seconds(EXPIRY_MARGIN_SECS))
    }
}

struct TokenInner {
    api: Arc<dyn IotasApi>,
    username: String,
    password: SecretString,
    retry_delay: Duration,
    credential: RwLock<Option<Credential>>,
    flight: SingleFlight<Option<SecretString>>,
    retry_pending: AtomicBool,
}

/// Acquires, caches and refreshes the bearer credential.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<TokenInner>,
}

impl TokenManager {
    pub fn new(
        api: Arc<dyn IotasApi>,
        username: impl Into<String>,
        password: SecretString,
        retry_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                api,
                username: username.into(),
                password,
                retry_delay,
                credential: RwLock::new(None),
                flight: SingleFlight::new(),
                retry_pending: AtomicBool::new(false),
            }),
        }
    }

    /// A valid bearer token, or `None` while authentication is failing.
    pub async fn token(&self) -> Option<SecretString> {
        TokenInner::token(Arc::clone(&self.inner)).await
    }

    /// Drop the cached credential; the next `token()` re-authenticates.
    pub async fn invalidate(&self) {
        *self.inner.credential.write().await = None;
        debug!("credential invalidated");
    }

    /// Whether an authentication retry is currently scheduled.
    pub fn retry_pending(&self) -> bool {
        self.inner.retry_pending.load(Ordering::SeqCst)
    }
}

impl TokenInner {
    // Boxed so the retry task can call back into it.
    fn token(inner: Arc<Self>) -> BoxFuture<'static, Option<SecretString>> {
        async move {
            if let Some(token) = inner.cached().await {
                return Some(token);
            }
            let worker = Arc::clone(&inner);
            inner.flight.run(move || worker.acquire().boxed()).await
        }
        .boxed()
    }

    async fn cached(&self) -> Option<SecretString> {
        let credential = self.credential.read().await;
        credential
            .as_ref()
            .filter(|c| c.is_fresh(Utc::now()))
            .map(|c| c.access_token.clone())
    }

    async fn acquire(self: Arc<Self>) -> Option<SecretString> {
        // A flight that settled just before this one may have filled the cache.
        if let Some(token) = self.cached().await {
            return Some(token);
        }

        let refresh_token = self
            .credential
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone());

        let result = match &refresh_token {
            Some(refresh) => {
                debug!("access token expired, using refresh grant");
                self.api.refresh(refresh, &self.username).await
            }
            None => {
                debug!(username = %self.username, "authenticating with password grant");
                self.api.login(&self.username, &self.password).await
            }
        };

        match result {
            Ok(grant) => {
                let expiry = decode_expiry(grant.access_token.expose_secret());
                if expiry.is_none() {
                    warn!("access token carries no readable expiry, it will not be reused");
                }
                let token = grant.access_token.clone();
                *self.credential.write().await = Some(Credential {
                    access_token: grant.access_token,
                    refresh_token: grant.refresh_token.or(refresh_token),
                    expiry,
                });
                info!("authenticated with IOTAS");
                Some(token)
            }
            Err(e) => {
                error!(
                    error = %e,
                    retry_in_secs = self.retry_delay.as_secs(),
                    "authentication failed"
                );
                if refresh_token.is_some()
                    && (e.is_unauthorized() || matches!(e, iotas_api::Error::Authentication { .. }))
                {
                    *self.credential.write().await = None;
                }
                self.schedule_retry();
                None
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>) {
        if self.retry_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(inner.retry_delay).await;
            inner.retry_pending.store(false, Ordering::SeqCst);
            debug!("retrying authentication");
            let _ = Self::token(Arc::clone(&inner)).await;
        });
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it.
pub(crate) fn decode_expiry(jwt: &str) -> Option<DateTime<Utc>> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}
