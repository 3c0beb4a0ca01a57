use log::warn;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::{segment, DataService, Mode};
use crate::error::{Error, Result};
use crate::models::{admin_remains, ApiResponse, NewUser, Role, StoredUser, User, UserUpdate};

const LAST_ADMIN: &str = "At least one administrator must remain";

impl DataService {
    /// List users; the cached copy is refreshed on every successful fetch
    pub async fn get_users(&self) -> ApiResponse<Vec<User>> {
        self.with_fallback(
            "get_users",
            Mode::Logged,
            async {
                let users: Vec<User> = self.api.get("/users").execute_field("users").await?;
                if let Err(e) = self.store.cache_users(&users) {
                    warn!("Could not cache user list: {}", e);
                }
                Ok(users)
            },
            || Ok(self.local_users()),
        )
        .await
    }

    pub async fn create_user(&self, new_user: NewUser) -> ApiResponse<User> {
        if let Err(e) = new_user.validate() {
            return ApiResponse::failed(Error::from(e).to_string());
        }

        self.write_with_fallback(
            "create_user",
            async {
                let user: User = self.api.post("/users").json(&new_user)?.execute_field("user").await?;
                self.cache_stored_user(StoredUser {
                    user: user.clone(),
                    password: new_user.password.clone(),
                });
                Ok(user)
            },
            || self.create_user_locally(&new_user),
        )
        .await
    }

    pub async fn update_user(&self, id: &str, update: UserUpdate) -> ApiResponse<User> {
        if let Err(e) = update.validate() {
            return ApiResponse::failed(Error::from(e).to_string());
        }
        if let Some(role) = update.role.filter(|r| *r != Role::Admin) {
            if !self.admin_would_remain(id, Some(role)).await {
                return ApiResponse::failed(LAST_ADMIN);
            }
        }

        let path = format!("/users/{}", segment(id));
        self.write_with_fallback(
            "update_user",
            async {
                let user: User = self.api.put(&path).json(&update)?.execute_field("user").await?;
                let mut users = self.store.users();
                if let Some(stored) = users.iter_mut().find(|s| s.user.id == id) {
                    update.apply(stored);
                    stored.user = user.clone();
                    if let Err(e) = self.store.set_users(&users) {
                        warn!("Could not cache updated user: {}", e);
                    }
                }
                Ok(user)
            },
            || self.update_user_locally(id, &update),
        )
        .await
    }

    pub async fn delete_user(&self, id: &str) -> ApiResponse<()> {
        if !self.admin_would_remain(id, None).await {
            return ApiResponse::failed(LAST_ADMIN);
        }

        let path = format!("/users/{}", segment(id));
        self.write_with_fallback(
            "delete_user",
            async {
                self.api.delete(&path).execute_value().await?;
                let mut users = self.store.users();
                users.retain(|s| s.user.id != id);
                if let Err(e) = self.store.set_users(&users) {
                    warn!("Could not drop deleted user from cache: {}", e);
                }
                Ok(())
            },
            || self.delete_user_locally(id),
        )
        .await
    }

    /// Check credentials against the backend, or the local legacy snapshot when it is unreachable
    pub async fn login(&self, username: &str, password: &str) -> ApiResponse<User> {
        self.write_with_fallback(
            "login",
            async {
                self.api
                    .post("/users/login")
                    .json(&json!({ "username": username, "password": password }))?
                    .execute_field::<User>("user")
                    .await
            },
            || self.login_locally(username, password),
        )
        .await
    }

    fn local_users(&self) -> Vec<User> {
        self.store.users().into_iter().map(|s| s.user).collect()
    }

    async fn admin_would_remain(&self, id: &str, new_role: Option<Role>) -> bool {
        let users = self.get_users().await.data.unwrap_or_default();
        admin_remains(&users, id, new_role)
    }

    fn cache_stored_user(&self, stored: StoredUser) {
        let mut users = self.store.users();
        users.retain(|s| s.user.id != stored.user.id);
        users.push(stored);
        if let Err(e) = self.store.set_users(&users) {
            warn!("Could not cache new user: {}", e);
        }
    }

    fn create_user_locally(&self, new_user: &NewUser) -> Result<User> {
        let mut users = self.store.users();
        if users
            .iter()
            .any(|s| s.user.username.eq_ignore_ascii_case(&new_user.username))
        {
            return Err(Error::rejected("Username already exists"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username.clone(),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            role: new_user.role,
            permissions: new_user.permissions.clone(),
            daily_target: new_user.daily_target,
            created_at: Some(self.clock.now()),
        };
        users.push(StoredUser {
            user: user.clone(),
            password: new_user.password.clone(),
        });
        self.store.set_users(&users)?;
        Ok(user)
    }

    fn update_user_locally(&self, id: &str, update: &UserUpdate) -> Result<User> {
        let mut users = self.store.users();
        let stored = users
            .iter_mut()
            .find(|s| s.user.id == id)
            .ok_or_else(|| Error::rejected("User not found"))?;
        update.apply(stored);
        let user = stored.user.clone();
        self.store.set_users(&users)?;
        Ok(user)
    }

    fn delete_user_locally(&self, id: &str) -> Result<()> {
        let mut users = self.store.users();
        let before = users.len();
        users.retain(|s| s.user.id != id);
        if users.len() == before {
            return Err(Error::rejected("User not found"));
        }
        self.store.set_users(&users)
    }

    fn login_locally(&self, username: &str, password: &str) -> Result<User> {
        self.store
            .users()
            .into_iter()
            .find(|s| s.user.username == username && !s.password.is_empty() && s.password == password)
            .map(|s| s.user)
            .ok_or_else(|| Error::rejected("Invalid username or password"))
    }
}
