//! Local persistence used when the backend cannot be reached
//!
//! Values are whole-value JSON documents under namespaced keys. Writers do a
//! read-modify-write with no locking, so concurrent writers race and the last
//! one wins.

mod backend;

pub use backend::*;

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::ClientOptions;
use crate::error::Result;
use crate::models::{AuditEntry, Role, StoredUser, User};

/// Storage key names, before namespacing
pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const CALLS_TODAY: &str = "callsToday";
    pub const LAST_RESET_DATE: &str = "lastResetDate";
    pub const USERS: &str = "users";
    pub const EMAIL_RECIPIENTS: &str = "emailRecipients";
    pub const SPECIAL_DATABASE: &str = "specialDatabase";
    pub const AUDIT_LOG: &str = "auditLog";
    pub const DAILY_PROGRESS: &str = "dailyProgress";
}

/// Oldest audit entries are dropped beyond this many
pub const AUDIT_LOG_LIMIT: usize = 500;

/// Username and password of the administrator seeded into an empty store
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Namespaced JSON store over a [`StorageBackend`]
pub struct LocalStore {
    namespace: String,
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    /// Open a store and seed its defaults
    pub fn new(namespace: &str, backend: Arc<dyn StorageBackend>) -> Self {
        let store = Self {
            namespace: namespace.to_string(),
            backend,
        };
        store.seed_defaults();
        store
    }

    /// In-memory store, mostly for tests
    pub fn in_memory(namespace: &str) -> Self {
        Self::new(namespace, Arc::new(MemoryBackend::new()))
    }

    /// File-backed when `storage_dir` is set, in memory otherwise
    pub fn from_options(options: &ClientOptions) -> Self {
        let backend: Arc<dyn StorageBackend> = match &options.storage_dir {
            Some(dir) => Arc::new(FileBackend::new(dir.clone())),
            None => Arc::new(MemoryBackend::new()),
        };
        Self::new(&options.storage_namespace, backend)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}.{}", self.namespace, key)
    }

    /// Read a value, falling back to `default` when absent or unparsable
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let full_key = self.full_key(key);
        match self.backend.read(&full_key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Ignoring unparsable local value for {}: {}", full_key, e);
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read local value {}: {}", full_key, e);
                default
            }
        }
    }

    /// Overwrite a value
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(&self.full_key(key), &raw)
    }

    /// Delete a value; deleting a missing key is not an error
    pub fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(&self.full_key(key))
    }

    /// Whether a value is stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.backend.read(&self.full_key(key)), Ok(Some(_)))
    }

    /// Read-modify-write a value and return what was written
    pub fn update<T, F>(&self, key: &str, default: T, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut value = self.get(key, default);
        f(&mut value);
        self.set(key, &value)?;
        Ok(value)
    }

    /// The legacy user snapshot, passwords included
    pub fn users(&self) -> Vec<StoredUser> {
        self.get(keys::USERS, Vec::new())
    }

    /// Overwrite the legacy user snapshot
    pub fn set_users(&self, users: &[StoredUser]) -> Result<()> {
        self.set(keys::USERS, users)
    }

    /// Replace the cached user list with a fresh backend copy, keeping known passwords
    pub fn cache_users(&self, fresh: &[User]) -> Result<()> {
        let previous = self.users();
        let merged: Vec<StoredUser> = fresh
            .iter()
            .map(|user| StoredUser {
                user: user.clone(),
                password: previous
                    .iter()
                    .find(|p| p.user.id == user.id)
                    .map(|p| p.password.clone())
                    .unwrap_or_default(),
            })
            .collect();
        self.set_users(&merged)
    }

    /// Append to the audit log, trimming the oldest entries
    pub fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.update(keys::AUDIT_LOG, Vec::<AuditEntry>::new(), |log| {
            log.push(entry);
            if log.len() > AUDIT_LOG_LIMIT {
                let excess = log.len() - AUDIT_LOG_LIMIT;
                log.drain(..excess);
            }
        })?;
        Ok(())
    }

    /// Audit entries, oldest first
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.get(keys::AUDIT_LOG, Vec::new())
    }

    /// Insert the default administrator when the user collection is empty
    pub fn seed_defaults(&self) {
        if !self.users().is_empty() {
            return;
        }

        let admin = StoredUser {
            user: User {
                id: "admin-default".to_string(),
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                name: "Administrator".to_string(),
                email: None,
                role: Role::Admin,
                permissions: None,
                daily_target: None,
                created_at: Some(Utc::now()),
            },
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        };

        match self.set_users(&[admin]) {
            Ok(()) => info!("Seeded default administrator into local store '{}'", self.namespace),
            Err(e) => warn!("Could not seed default administrator: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_single_admin_once() {
        let store = LocalStore::in_memory("t");
        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user.username, DEFAULT_ADMIN_USERNAME);
        assert!(users[0].user.is_admin());

        store.seed_defaults();
        assert_eq!(store.users().len(), 1);
    }

    #[test]
    fn unparsable_value_yields_default() {
        let backend = Arc::new(MemoryBackend::new());
        backend.write("t.callsToday", "{not json").unwrap();
        let store = LocalStore::new("t", backend);
        assert_eq!(store.get(keys::CALLS_TODAY, 7u32), 7);
    }

    #[test]
    fn keys_are_namespaced() {
        let backend = Arc::new(MemoryBackend::new());
        let a = LocalStore::new("a", backend.clone());
        let b = LocalStore::new("b", backend.clone());
        a.set(keys::CALLS_TODAY, &3u32).unwrap();
        assert_eq!(a.get(keys::CALLS_TODAY, 0u32), 3);
        assert_eq!(b.get(keys::CALLS_TODAY, 0u32), 0);
        assert_eq!(backend.read("a.callsToday").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn audit_log_is_capped() {
        let store = LocalStore::in_memory("t");
        for n in 0..(AUDIT_LOG_LIMIT + 5) {
            store
                .append_audit(AuditEntry {
                    timestamp: Utc::now(),
                    action: "login".to_string(),
                    username: format!("user{n}"),
                    success: true,
                    detail: None,
                })
                .unwrap();
        }
        let log = store.audit_log();
        assert_eq!(log.len(), AUDIT_LOG_LIMIT);
        assert_eq!(log[0].username, "user5");
    }

    #[test]
    fn cache_users_keeps_known_passwords() {
        let store = LocalStore::in_memory("t");
        let mut fresh: Vec<User> = store.users().into_iter().map(|s| s.user).collect();
        let mut agent = fresh[0].clone();
        agent.id = "u2".to_string();
        agent.username = "agent".to_string();
        agent.role = Role::Agent;
        fresh.push(agent);

        store.cache_users(&fresh).unwrap();
        let cached = store.users();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].password, DEFAULT_ADMIN_PASSWORD);
        assert_eq!(cached[1].password, "");
    }
}
