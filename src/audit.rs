//! Append-only audit trail for security-relevant actions. Recording is
//! best-effort: a failed insert is logged and never fails the request that
//! triggered it.

use actix_web::HttpRequest;
use mongodb::bson::{oid::ObjectId, DateTime};
use mongodb::Database;
use tracing::warn;

use crate::models::audit::{self, AuditAction, AuditRecord};

/// Request metadata captured alongside every audit record.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip_address: String,
    pub device_info: String,
    pub location: String,
}

impl RequestMeta {
    pub fn from_request(req: &HttpRequest, location: Option<&str>) -> Self {
        let ip_address = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("Unknown")
            .to_string();
        let device_info = req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        RequestMeta {
            ip_address,
            device_info,
            location: location.unwrap_or("Unknown").to_string(),
        }
    }
}

pub async fn record(
    db: &Database,
    user_id: ObjectId,
    action: AuditAction,
    meta: &RequestMeta,
    refresh_token_hash: Option<String>,
) {
    let entry = AuditRecord {
        id: None,
        user_id,
        action,
        ip_address: meta.ip_address.clone(),
        location: meta.location.clone(),
        device_info: meta.device_info.clone(),
        refresh_token_hash: refresh_token_hash.unwrap_or_default(),
        is_revoked: false,
        logout_at: None,
        created_at: DateTime::now(),
    };

    if let Err(e) = db
        .collection::<AuditRecord>(audit::COLLECTION)
        .insert_one(entry, None)
        .await
    {
        warn!("failed to write audit record for {}: {}", user_id, e);
    }
}
