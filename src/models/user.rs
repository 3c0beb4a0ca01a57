//! Users, roles and capabilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Console role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
        };
        f.write_str(name)
    }
}

/// A console user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins hold every capability; other roles need it listed explicitly
    pub fn has_permission(&self, capability: &str) -> bool {
        self.is_admin()
            || self
                .permissions
                .as_ref()
                .is_some_and(|caps| caps.iter().any(|c| c == capability))
    }
}

/// A user as kept in the local legacy snapshot, password included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub password: String,
}

/// Form input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub name: String,
    #[validate(email(message = "email address is not valid"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_target: Option<u32>,
}

/// Partial update for an existing user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(email(message = "email address is not valid"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_target: Option<u32>,
}

impl UserUpdate {
    /// Apply the patch to a stored user
    pub fn apply(&self, stored: &mut StoredUser) {
        if let Some(name) = &self.name {
            stored.user.name = name.clone();
        }
        if let Some(email) = &self.email {
            stored.user.email = Some(email.clone());
        }
        if let Some(role) = self.role {
            stored.user.role = role;
        }
        if let Some(password) = &self.password {
            stored.password = password.clone();
        }
        if let Some(permissions) = &self.permissions {
            stored.user.permissions = Some(permissions.clone());
        }
        if let Some(target) = self.daily_target {
            stored.user.daily_target = Some(target);
        }
    }
}

/// Whether at least one admin is left once `user_id` is removed or given `new_role`
pub fn admin_remains(users: &[User], user_id: &str, new_role: Option<Role>) -> bool {
    users.iter().any(|u| {
        if u.id == user_id {
            new_role == Some(Role::Admin)
        } else {
            u.is_admin()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            name: String::new(),
            email: None,
            role,
            permissions: None,
            daily_target: None,
            created_at: None,
        }
    }

    #[test]
    fn last_admin_cannot_go() {
        let users = vec![user("a", Role::Admin), user("b", Role::Agent)];
        assert!(!admin_remains(&users, "a", None));
        assert!(!admin_remains(&users, "a", Some(Role::Manager)));
        assert!(admin_remains(&users, "a", Some(Role::Admin)));
        assert!(admin_remains(&users, "b", None));
    }

    #[test]
    fn stored_user_flattens_password() {
        let stored = StoredUser {
            user: user("u1", Role::Agent),
            password: "secret1".to_string(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["password"], "secret1");
        assert_eq!(json["role"], "agent");
        let back: StoredUser = serde_json::from_value(json).unwrap();
        assert_eq!(back, stored);
    }

    #[test]
    fn permissions_for_non_admins() {
        let mut agent = user("b", Role::Agent);
        assert!(!agent.has_permission("export"));
        agent.permissions = Some(vec!["export".to_string()]);
        assert!(agent.has_permission("export"));
        assert!(user("a", Role::Admin).has_permission("anything"));
    }
}
