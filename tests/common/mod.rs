#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use crm_admin_client::clock::{Clock, ManualClock};
use crm_admin_client::config::{ClientOptions, RetryPolicy};
use crm_admin_client::fetch::ApiClient;
use crm_admin_client::local::LocalStore;
use crm_admin_client::service::DataService;

/// Nothing listens here, so every request fails with a connection error
pub const UNREACHABLE: &str = "http://127.0.0.1:1/api";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

pub fn options(api_url: &str) -> ClientOptions {
    ClientOptions::default()
        .with_api_url(api_url)
        .with_request_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::exponential(Duration::from_millis(10), 3))
        .with_storage_namespace("test")
}

pub struct Harness {
    pub service: DataService,
    pub store: Arc<LocalStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(api_url: &str) -> Harness {
    harness_with(options(api_url))
}

pub fn harness_with(options: ClientOptions) -> Harness {
    let store = Arc::new(LocalStore::in_memory(&options.storage_namespace));
    let clock = Arc::new(ManualClock::new(start_time()));
    let api = ApiClient::new(&options).expect("valid api url");
    let service = DataService::new(api, store.clone(), clock.clone() as Arc<dyn Clock>, &options);
    Harness { service, store, clock }
}
