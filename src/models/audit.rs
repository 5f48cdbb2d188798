use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const COLLECTION: &str = "audits";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    Logout,
    RefreshToken,
    PasswordChange,
    ProfileAccess,
    UpdateProfile,
    GetAllUsers,
    BlockUser,
    UnblockUser,
}

/// Append-only record of a security-relevant action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(rename = "type")]
    pub action: AuditAction,
    pub ip_address: String,
    pub location: String,
    pub device_info: String,
    #[serde(default)]
    pub refresh_token_hash: String,
    #[serde(default)]
    pub is_revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_at: Option<DateTime>,
    pub created_at: DateTime,
}
