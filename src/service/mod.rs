//! Data-access façade
//!
//! Every operation calls the backend first. Reads fall back to local data on
//! any error; writes that have a local implementation fall back only when
//! the backend is unreachable; everything else reports `success: false`.

mod admin;
mod contacts;
mod offline;
mod progress;
mod promotions;
mod scripts;
mod settings;
mod users;

pub use admin::{DataTarget, HealthStatus};
pub use offline::OfflineMonitor;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::ApiClient;
use crate::local::LocalStore;
use crate::models::ApiResponse;
use crate::poll::PollHandle;

/// Whether fallback diagnostics are logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fallbacks are logged at `warn`
    Logged,
    /// For reads expected to run offline routinely, such as polling
    Silent,
}

/// Chooses between the backend and the local store for each operation
#[derive(Clone)]
pub struct DataService {
    api: ApiClient,
    store: Arc<LocalStore>,
    clock: Arc<dyn Clock>,
    offline: Arc<OfflineMonitor>,
    claim_refresh_interval: Duration,
}

impl DataService {
    /// Create a façade over the given client, store and clock.
    ///
    /// Poll intervals are taken from `options`.
    pub fn new(api: ApiClient, store: Arc<LocalStore>, clock: Arc<dyn Clock>, options: &ClientOptions) -> Self {
        Self {
            api,
            store,
            clock,
            offline: Arc::new(OfflineMonitor::new(options.offline_probe_interval)),
            claim_refresh_interval: options.claim_refresh_interval,
        }
    }

    /// The backend client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The local fallback store
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// The clock used for expiry and day rollover
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// How often number claims are re-fetched
    pub fn claim_refresh_interval(&self) -> Duration {
        self.claim_refresh_interval
    }

    /// Advisory flag from the last health probe; may be stale by one probe interval
    pub fn is_offline_mode(&self) -> bool {
        self.offline.is_offline()
    }

    /// Probe `/health` if the last probe is older than the probe interval
    pub async fn refresh_offline_mode(&self) -> bool {
        if !self.offline.try_begin_probe() {
            return self.offline.is_offline();
        }

        let reachable = self.api.get("/health").long_running().execute_value().await.is_ok();
        self.offline.set_offline(!reachable);
        if !reachable {
            debug!("Health probe failed; running in offline mode");
        }
        !reachable
    }

    /// Keep the offline flag fresh in the background
    pub fn spawn_offline_probe(&self) -> PollHandle {
        let service = self.clone();
        let period = self.offline.interval();
        PollHandle::spawn(period, move || {
            let service = service.clone();
            async move {
                service.refresh_offline_mode().await;
            }
        })
    }

    /// Remote first, local on any error
    pub(crate) async fn with_fallback<T, Fut, L>(&self, op: &str, mode: Mode, remote: Fut, local: L) -> ApiResponse<T>
    where
        Fut: Future<Output = Result<T>>,
        L: FnOnce() -> Result<T>,
    {
        match remote.await {
            Ok(value) => ApiResponse::ok(value),
            Err(e) => {
                match mode {
                    Mode::Logged => warn!("{}: backend call failed, using local data: {}", op, e),
                    Mode::Silent => debug!("{}: backend call failed, using local data: {}", op, e),
                }
                run_local(op, local)
            }
        }
    }

    /// Remote first, local only when the backend could not be reached
    pub(crate) async fn write_with_fallback<T, Fut, L>(&self, op: &str, remote: Fut, local: L) -> ApiResponse<T>
    where
        Fut: Future<Output = Result<T>>,
        L: FnOnce() -> Result<T>,
    {
        match remote.await {
            Ok(value) => ApiResponse::ok(value),
            Err(e) if e.is_transient() => {
                warn!("{}: backend unreachable, applying locally: {}", op, e);
                run_local(op, local)
            }
            Err(e) => {
                debug!("{}: rejected by backend: {}", op, e);
                ApiResponse::failed(e.to_string())
            }
        }
    }

    /// Remote only; failures become `success: false`
    pub(crate) async fn remote_only<T, Fut>(&self, op: &str, remote: Fut) -> ApiResponse<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match remote.await {
            Ok(value) => ApiResponse::ok(value),
            Err(e) => {
                warn!("{}: {}", op, e);
                ApiResponse::failed(e.to_string())
            }
        }
    }
}

fn run_local<T>(op: &str, local: impl FnOnce() -> Result<T>) -> ApiResponse<T> {
    match local() {
        Ok(value) => ApiResponse::ok(value),
        Err(e) => {
            debug!("{}: local fallback failed: {}", op, e);
            ApiResponse::failed(e.to_string())
        }
    }
}

/// Percent-encode one path segment
pub(crate) fn segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
