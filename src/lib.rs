//! CRM Admin Client Library
//!
//! Data layer for the call-center CRM admin console: a client for the
//! backend API, a local store that keeps the console usable while the
//! backend is down, number-claim leasing, and session state.

pub mod claims;
pub mod clock;
pub mod config;
pub mod csv;
pub mod error;
pub mod fetch;
pub mod local;
pub mod models;
pub mod poll;
pub mod service;
pub mod session;

pub use error::Error;

use std::sync::Arc;

use crate::claims::{Identity, NumberClaims};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::ApiClient;
use crate::local::LocalStore;
use crate::poll::PollHandle;
use crate::service::DataService;
use crate::session::SessionContext;

/// The main entry point for the CRM admin client
pub struct CrmAdmin {
    /// Client options
    pub options: ClientOptions,
    service: DataService,
    session: Arc<SessionContext>,
}

impl CrmAdmin {
    /// Create a client with default options pointing at `api_url`
    ///
    /// # Example
    ///
    /// ```
    /// use crm_admin_client::CrmAdmin;
    ///
    /// let admin = CrmAdmin::new("http://localhost:3001/api").unwrap();
    /// assert!(!admin.session().is_authenticated());
    /// ```
    pub fn new(api_url: &str) -> Result<Self> {
        Self::new_with_options(ClientOptions::default().with_api_url(api_url))
    }

    /// Create a client from the environment; see [`ClientOptions::from_env`]
    pub fn from_env() -> Result<Self> {
        Self::new_with_options(ClientOptions::from_env()?)
    }

    /// Create a client with custom options
    pub fn new_with_options(options: ClientOptions) -> Result<Self> {
        let store = Arc::new(LocalStore::from_options(&options));
        Self::with_parts(options, store, Arc::new(SystemClock))
    }

    /// Create a client over an explicit store and clock
    pub fn with_parts(options: ClientOptions, store: Arc<LocalStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let api = ApiClient::new(&options)?;
        let service = DataService::new(api, store, clock, &options);
        let session = SessionContext::mount(service.clone());

        Ok(Self {
            options,
            service,
            session,
        })
    }

    /// Data-access façade for every domain operation
    pub fn service(&self) -> &DataService {
        &self.service
    }

    /// Session and identity state
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Claim helper acting as the given identity
    pub fn claims_for(&self, identity: Identity) -> NumberClaims {
        NumberClaims::new(self.service.clone(), identity)
    }

    /// Claim helper acting as the signed-in user, if any
    pub fn claims(&self) -> Option<NumberClaims> {
        self.session
            .current_user()
            .map(|user| self.claims_for(Identity::new(&user.id, Some(&user.name))))
    }

    /// Start the offline probe and the daily reset check.
    ///
    /// Both stop when the returned handles are dropped.
    pub fn start_background_tasks(&self) -> Vec<PollHandle> {
        vec![
            self.service.spawn_offline_probe(),
            self.session.spawn_daily_reset(self.options.daily_reset_interval),
        ]
    }

    pub fn is_offline_mode(&self) -> bool {
        self.service.is_offline_mode()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::claims::{Identity, NumberClaims};
    pub use crate::config::{ClientOptions, RetryPolicy};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::service::DataService;
    pub use crate::session::{SessionContext, SessionState};
    pub use crate::CrmAdmin;
}
