//! Session and identity state
//!
//! The persisted identity is a plain JSON user object, not a credential.
//! The daily counter reset here is a best-effort client-side check; the
//! authoritative counters live on the backend.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use log::{info, warn};

use crate::clock::date_key;
use crate::local::keys;
use crate::models::{ApiResponse, AuditEntry, User};
use crate::poll::PollHandle;
use crate::service::DataService;

/// Whether someone is signed in
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Authenticated(User),
}

/// Signed-in identity and the local daily call counter.
///
/// Shared behind an `Arc`; background checks hold a clone.
pub struct SessionContext {
    service: DataService,
    state: RwLock<SessionState>,
    calls_today: AtomicU32,
    reset_guard: Mutex<()>,
}

impl SessionContext {
    /// Restore any persisted identity and run the daily reset check once
    pub fn mount(service: DataService) -> Arc<Self> {
        let store = service.store();
        let state = match store.get::<Option<User>>(keys::CURRENT_USER, None) {
            Some(user) => SessionState::Authenticated(user),
            None => SessionState::Anonymous,
        };
        let calls_today = store.get(keys::CALLS_TODAY, 0u32);

        let session = Arc::new(Self {
            service,
            state: RwLock::new(state),
            calls_today: AtomicU32::new(calls_today),
            reset_guard: Mutex::new(()),
        });
        session.check_daily_reset();
        session
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn current_user(&self) -> Option<User> {
        match self.state() {
            SessionState::Authenticated(user) => Some(user),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated(_))
    }

    pub fn has_permission(&self, capability: &str) -> bool {
        self.current_user().is_some_and(|u| u.has_permission(capability))
    }

    /// Sign in against the backend, or the local snapshot when it is unreachable.
    ///
    /// Only a successful attempt persists the identity; every attempt is audited.
    pub async fn login(&self, username: &str, password: &str) -> ApiResponse<User> {
        let response = self.service.login(username, password).await;

        if let (true, Some(user)) = (response.success, response.data.as_ref()) {
            if let Err(e) = self.service.store().set(keys::CURRENT_USER, user) {
                warn!("Signed in but could not persist the session: {}", e);
            }
            *self.state.write().unwrap_or_else(PoisonError::into_inner) = SessionState::Authenticated(user.clone());
            info!("{} signed in", user.username);
        }

        self.audit("login", username, response.success, response.error.clone());
        response
    }

    /// Forget the signed-in identity; counters and caches are kept
    pub fn logout(&self) {
        let previous = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, SessionState::Anonymous)
        };
        if let Err(e) = self.service.store().remove(keys::CURRENT_USER) {
            warn!("Could not clear the persisted session: {}", e);
        }
        if let SessionState::Authenticated(user) = previous {
            info!("{} signed out", user.username);
            self.audit("logout", &user.username, true, None);
        }
    }

    /// Calls counted locally since the last daily reset
    pub fn calls_today(&self) -> u32 {
        self.calls_today.load(Ordering::SeqCst)
    }

    /// Count one call in the local per-day counter.
    ///
    /// Serialized with the daily reset so a reset is never overwritten by a stale count.
    pub fn record_call(&self) -> u32 {
        let _guard = self.reset_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let count = self.calls_today.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if let Err(e) = self.service.store().set(keys::CALLS_TODAY, &count) {
            warn!("Could not persist call counter: {}", e);
        }
        count
    }

    /// Zero the counter if the stored reset date is not today. Returns whether it reset.
    pub fn check_daily_reset(&self) -> bool {
        let _guard = self.reset_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let store = self.service.store();
        let today = date_key(self.service.clock().today());
        let last_reset: Option<String> = store.get(keys::LAST_RESET_DATE, None);

        if last_reset.as_deref() == Some(today.as_str()) {
            return false;
        }

        self.calls_today.store(0, Ordering::SeqCst);
        if let Err(e) = store.set(keys::CALLS_TODAY, &0u32) {
            warn!("Could not persist reset call counter: {}", e);
        }
        if let Err(e) = store.set(keys::LAST_RESET_DATE, &today) {
            warn!("Could not persist reset date: {}", e);
        }
        info!("Daily call counter reset for {}", today);
        true
    }

    /// Run the daily reset check on a timer until the handle is dropped
    pub fn spawn_daily_reset(self: &Arc<Self>, period: Duration) -> PollHandle {
        let session = Arc::clone(self);
        PollHandle::spawn(period, move || {
            let session = Arc::clone(&session);
            async move {
                session.check_daily_reset();
            }
        })
    }

    /// Reset every counter on the backend and zero the local one on success
    pub async fn reset_all_counters(&self) -> ApiResponse<()> {
        let response = self.service.reset_all_counters().await;
        if response.success {
            self.calls_today.store(0, Ordering::SeqCst);
        }
        response
    }

    fn audit(&self, action: &str, username: &str, success: bool, detail: Option<String>) {
        let entry = AuditEntry {
            timestamp: self.service.clock().now(),
            action: action.to_string(),
            username: username.to_string(),
            success,
            detail,
        };
        if let Err(e) = self.service.store().append_audit(entry) {
            warn!("Could not write audit entry: {}", e);
        }
    }
}
