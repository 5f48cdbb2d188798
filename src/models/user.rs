use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::default_true;

pub const COLLECTION: &str = "users";

pub const MAX_LOGIN_ATTEMPTS: i32 = 5;
pub const LOCK_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Elevated roles bypass ownership and edit-window checks.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// Bcrypt hash, never the raw password.
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime>,
    #[serde(default)]
    pub login_attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_until: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Safe projection of a user for JSON responses; credential material and
/// token hashes never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub created_at: DateTime,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            avatar: self.avatar.clone(),
            role: self.role,
            is_active: self.is_active,
            is_blocked: self.is_blocked,
            language: self.language.clone(),
            address: self.address.clone(),
            created_at: self.created_at,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock_until
            .map(|until| until.to_chrono() > chrono::Utc::now())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serialization_matches_document_values() {
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"super_admin\"");
        assert!(Role::Admin.is_elevated());
        assert!(!Role::User.is_elevated());
    }

    #[test]
    fn public_projection_omits_credentials() {
        let user = User {
            id: Some(ObjectId::new()),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "$2b$12$hash".to_string(),
            phone: None,
            avatar: None,
            role: Role::User,
            is_active: true,
            is_deleted: false,
            is_blocked: false,
            language: None,
            address: None,
            refresh_token_hash: Some("abc".to_string()),
            reset_password_token: None,
            reset_password_expires: None,
            login_attempts: 0,
            lock_until: None,
            password_changed_at: None,
            last_active: None,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };

        let json = serde_json::to_value(user.public()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("refreshTokenHash").is_none());
        assert_eq!(json["email"], "asha@example.com");
    }
}
