use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::Collection;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::audit::{self, RequestMeta};
use crate::auth::{
    self, access_cookie, expired_cookie, hash_token, refresh_cookie, require_admin, AuthUser,
    ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::config::{MongoConfig, Settings};
use crate::error::ApiError;
use crate::models::audit::AuditAction;
use crate::models::user::{self, Address, Role, User, LOCK_MINUTES, MAX_LOGIN_ATTEMPTS};
use crate::repo::{parse_object_id, scoped, Page, Pagination};

const RESET_TOKEN_MINUTES: i64 = 10;

fn collection(db: &MongoConfig) -> Collection<User> {
    db.database.collection(user::COLLECTION)
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            errs.first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is invalid", field))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

async fn load_user(db: &MongoConfig, id: mongodb::bson::oid::ObjectId) -> Result<User, ApiError> {
    collection(db)
        .find_one(scoped(doc! { "_id": id }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub language: Option<String>,
}

pub async fn register(
    db: web::Data<MongoConfig>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;

    let email = body.email.trim().to_lowercase();
    let exists = collection(&db)
        .count_documents(scoped(doc! { "email": &email }, false), None)
        .await?;
    if exists > 0 {
        return Err(ApiError::validation(
            "User with this email already exists",
        ));
    }

    let now = DateTime::now();
    let mut new_user = User {
        id: None,
        name: body.name.trim().to_string(),
        email,
        password: bcrypt::hash(&body.password, bcrypt::DEFAULT_COST)?,
        phone: body.phone,
        avatar: None,
        role: Role::User,
        is_active: true,
        is_deleted: false,
        is_blocked: false,
        language: body.language,
        address: None,
        refresh_token_hash: None,
        reset_password_token: None,
        reset_password_expires: None,
        login_attempts: 0,
        lock_until: None,
        password_changed_at: None,
        last_active: None,
        created_at: now,
        updated_at: now,
    };

    let result = collection(&db).insert_one(&new_user, None).await?;
    new_user.id = result.inserted_id.as_object_id();

    info!("user registered: {}", new_user.email);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Registration successful. Please login.",
        "user": new_user.public(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    req: HttpRequest,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim().to_lowercase();
    let found = collection(&db)
        .find_one(scoped(doc! { "email": &email }, false), None)
        .await?;

    // A missing account and a wrong password read the same to the caller.
    let user = match found {
        Some(u) => u,
        None => return Err(ApiError::unauthorized("Invalid email or password")),
    };

    if user.is_blocked {
        return Err(ApiError::forbidden(
            "Account blocked. Contact support.",
        ));
    }
    if !user.is_active {
        return Err(ApiError::forbidden(
            "Account inactive or deleted. Contact support.",
        ));
    }
    if user.is_locked() {
        return Err(ApiError::forbidden(
            "Account locked due to too many failed attempts. Try again later.",
        ));
    }

    if !bcrypt::verify(&body.password, &user.password)? {
        let attempts = user.login_attempts + 1;
        let update = if attempts >= MAX_LOGIN_ATTEMPTS {
            warn!("locking account {} after {} failed attempts", email, attempts);
            let until = Utc::now() + Duration::minutes(LOCK_MINUTES);
            doc! { "$set": {
                "loginAttempts": 0,
                "lockUntil": DateTime::from_chrono(until),
            } }
        } else {
            doc! { "$set": { "loginAttempts": attempts } }
        };
        collection(&db)
            .update_one(doc! { "_id": user.id }, update, None)
            .await?;
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let access_token = auth::generate_access_token(&user, &settings.access_token_secret)?;
    let refresh_token = auth::generate_refresh_token(&user, &settings.refresh_token_secret)?;
    let refresh_hash = hash_token(&refresh_token);

    collection(&db)
        .update_one(
            doc! { "_id": user.id },
            doc! {
                "$set": {
                    "refreshTokenHash": &refresh_hash,
                    "loginAttempts": 0,
                    "lastActive": DateTime::now(),
                },
                "$unset": { "lockUntil": "" },
            },
            None,
        )
        .await?;

    if let Some(id) = user.id {
        let meta = RequestMeta::from_request(&req, None);
        audit::record(&db.database, id, AuditAction::Login, &meta, Some(refresh_hash)).await;
    }

    info!("user logged in: {}", user.email);
    Ok(HttpResponse::Ok()
        .cookie(access_cookie(access_token))
        .cookie(refresh_cookie(refresh_token))
        .json(json!({
            "success": true,
            "message": "Login successful",
            "user": user.public(),
        })))
}

/// Rotates the session: the presented refresh token must match the stored
/// hash, and both the cookie pair and the hash are replaced.
pub async fn refresh_token(
    db: web::Data<MongoConfig>,
    settings: web::Data<Settings>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let token = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Refresh token missing. Please login."))?;

    let claims = auth::verify_token(&token, &settings.refresh_token_secret)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token. Please login."))?;
    let user_id = parse_object_id(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token. Please login."))?;

    let user = load_user(&db, user_id).await?;
    if user.is_blocked || !user.is_active {
        return Err(ApiError::forbidden(
            "Account inactive or deleted. Contact support.",
        ));
    }
    if user.refresh_token_hash.as_deref() != Some(hash_token(&token).as_str()) {
        return Err(ApiError::unauthorized("Invalid refresh token. Please login."));
    }

    let access_token = auth::generate_access_token(&user, &settings.access_token_secret)?;
    let new_refresh = auth::generate_refresh_token(&user, &settings.refresh_token_secret)?;
    let refresh_hash = hash_token(&new_refresh);

    collection(&db)
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "refreshTokenHash": &refresh_hash, "lastActive": DateTime::now() } },
            None,
        )
        .await?;

    let meta = RequestMeta::from_request(&req, None);
    audit::record(
        &db.database,
        user_id,
        AuditAction::RefreshToken,
        &meta,
        Some(refresh_hash),
    )
    .await;

    Ok(HttpResponse::Ok()
        .cookie(access_cookie(access_token))
        .cookie(refresh_cookie(new_refresh))
        .json(json!({
            "success": true,
            "message": "Session refreshed",
        })))
}

pub async fn logout(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    collection(&db)
        .update_one(
            doc! { "_id": user.id },
            doc! { "$unset": { "refreshTokenHash": "" } },
            None,
        )
        .await?;

    // Mark this session's audit records as ended.
    if let Err(e) = db
        .database
        .collection::<mongodb::bson::Document>(crate::models::audit::COLLECTION)
        .update_many(
            doc! { "userId": user.id, "isRevoked": false },
            doc! { "$set": { "isRevoked": true, "logoutAt": DateTime::now() } },
            None,
        )
        .await
    {
        warn!("failed to revoke audit sessions for {}: {}", user.id, e);
    }

    let meta = RequestMeta::from_request(&req, None);
    audit::record(&db.database, user.id, AuditAction::Logout, &meta, None).await;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_COOKIE))
        .cookie(expired_cookie(REFRESH_COOKIE))
        .json(json!({
            "success": true,
            "message": "Logged out successfully",
        })))
}

pub async fn get_profile(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let found = load_user(&db, user.id).await?;

    let meta = RequestMeta::from_request(&req, None);
    audit::record(&db.database, user.id, AuditAction::ProfileAccess, &meta, None).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": found.public(),
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub address: Option<Address>,
}

pub async fn update_profile(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;

    let mut updates = doc! { "updatedAt": DateTime::now() };
    if let Some(name) = body.name {
        updates.insert("name", name.trim());
    }
    if let Some(phone) = body.phone {
        updates.insert("phone", phone);
    }
    if let Some(avatar) = body.avatar {
        updates.insert("avatar", avatar);
    }
    if let Some(language) = body.language {
        updates.insert("language", language);
    }
    if let Some(address) = body.address {
        let address = mongodb::bson::to_bson(&address)
            .map_err(|e| ApiError::internal(format!("Address encoding failed: {}", e)))?;
        updates.insert("address", address);
    }

    collection(&db)
        .update_one(doc! { "_id": user.id }, doc! { "$set": updates }, None)
        .await?;

    let meta = RequestMeta::from_request(&req, None);
    audit::record(&db.database, user.id, AuditAction::UpdateProfile, &meta, None).await;

    let updated = load_user(&db, user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": updated.public(),
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

/// Changing the password ends every session; the client must login again.
pub async fn change_password(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;

    let found = load_user(&db, user.id).await?;
    if !bcrypt::verify(&body.current_password, &found.password)? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hashed = bcrypt::hash(&body.new_password, bcrypt::DEFAULT_COST)?;
    collection(&db)
        .update_one(
            doc! { "_id": user.id },
            doc! {
                "$set": {
                    "password": hashed,
                    "passwordChangedAt": DateTime::now(),
                    "updatedAt": DateTime::now(),
                },
                "$unset": { "refreshTokenHash": "" },
            },
            None,
        )
        .await?;

    let meta = RequestMeta::from_request(&req, None);
    audit::record(&db.database, user.id, AuditAction::PasswordChange, &meta, None).await;

    Ok(HttpResponse::Ok()
        .cookie(expired_cookie(ACCESS_COOKIE))
        .cookie(expired_cookie(REFRESH_COOKIE))
        .json(json!({
            "success": true,
            "message": "Password changed. Please login again.",
        })))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Issues a short-lived reset token. Only its hash is stored; the raw token
/// is returned in the response for the caller to deliver out of band.
pub async fn forgot_password(
    db: web::Data<MongoConfig>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim().to_lowercase();
    let found = collection(&db)
        .find_one(scoped(doc! { "email": &email }, false), None)
        .await?
        .ok_or_else(|| ApiError::not_found("No account found with this email"))?;

    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect();
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);

    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! { "$set": {
                "resetPasswordToken": hash_token(&token),
                "resetPasswordExpires": DateTime::from_chrono(expires),
            } },
            None,
        )
        .await?;

    info!("password reset token issued for {}", email);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Reset token valid for {} minutes", RESET_TOKEN_MINUTES),
        "resetToken": token,
    })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

pub async fn reset_password(
    db: web::Data<MongoConfig>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    body.validate()
        .map_err(|e| ApiError::validation(validation_message(&e)))?;

    let found = collection(&db)
        .find_one(
            scoped(
                doc! {
                    "resetPasswordToken": hash_token(&body.token),
                    "resetPasswordExpires": { "$gt": DateTime::now() },
                },
                false,
            ),
            None,
        )
        .await?
        .ok_or_else(|| ApiError::validation("Reset token is invalid or has expired"))?;

    let hashed = bcrypt::hash(&body.new_password, bcrypt::DEFAULT_COST)?;
    collection(&db)
        .update_one(
            doc! { "_id": found.id },
            doc! {
                "$set": {
                    "password": hashed,
                    "passwordChangedAt": DateTime::now(),
                    "updatedAt": DateTime::now(),
                },
                "$unset": {
                    "resetPasswordToken": "",
                    "resetPasswordExpires": "",
                    "refreshTokenHash": "",
                    "lockUntil": "",
                },
            },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Password reset successful. Please login.",
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub blocked: Option<bool>,
}

pub async fn list_users(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };

    let mut filter = scoped(doc! {}, false);
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = regex::escape(search);
        filter.insert(
            "$or",
            vec![
                doc! { "name": { "$regex": &pattern, "$options": "i" } },
                doc! { "email": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }
    if let Some(role) = query.role {
        let role = mongodb::bson::to_bson(&role)
            .map_err(|e| ApiError::internal(format!("Role encoding failed: {}", e)))?;
        filter.insert("role", role);
    }
    if let Some(blocked) = query.blocked {
        filter.insert("isBlocked", blocked);
    }

    let coll = collection(&db);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll.find(filter, pagination.find_options("createdAt")).await?;

    let mut items = Vec::new();
    while let Some(u) = cursor.try_next().await? {
        items.push(u.public());
    }

    let meta = RequestMeta::from_request(&req, None);
    audit::record(&db.database, user.id, AuditAction::GetAllUsers, &meta, None).await;

    Ok(HttpResponse::Ok().json(Page::new(&pagination, total, items)))
}

pub async fn get_user(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let found = load_user(&db, parse_object_id(&id)?).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": found.public(),
    })))
}

async fn set_blocked(
    db: &MongoConfig,
    admin: &AuthUser,
    req: &HttpRequest,
    id: &str,
    blocked: bool,
) -> Result<HttpResponse, ApiError> {
    require_admin(admin)?;

    let target_id = parse_object_id(id)?;
    if target_id == admin.id {
        return Err(ApiError::validation("You cannot block your own account"));
    }

    let target = load_user(db, target_id).await?;
    if target.role == Role::SuperAdmin {
        return Err(ApiError::forbidden("Super admin accounts cannot be blocked"));
    }

    let mut update = doc! {
        "$set": { "isBlocked": blocked, "updatedAt": DateTime::now() },
    };
    if blocked {
        // A blocked user's session must not survive the block.
        update.insert("$unset", doc! { "refreshTokenHash": "" });
    }

    collection(db)
        .update_one(doc! { "_id": target_id }, update, None)
        .await?;

    let action = if blocked {
        AuditAction::BlockUser
    } else {
        AuditAction::UnblockUser
    };
    let meta = RequestMeta::from_request(req, None);
    audit::record(&db.database, admin.id, action, &meta, None).await;

    let message = if blocked {
        "User blocked successfully"
    } else {
        "User unblocked successfully"
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
    })))
}

pub async fn block_user(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_blocked(&db, &user, &req, &id, true).await
}

pub async fn unblock_user(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    req: HttpRequest,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    set_blocked(&db, &user, &req, &id, false).await
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// Role changes are reserved for the super admin.
pub async fn update_role(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
    body: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse, ApiError> {
    if user.role != Role::SuperAdmin {
        return Err(ApiError::forbidden(
            "Access denied. Allowed roles: super_admin",
        ));
    }

    let target_id = parse_object_id(&id)?;
    if target_id == user.id {
        return Err(ApiError::validation("You cannot change your own role"));
    }
    load_user(&db, target_id).await?;

    let role = mongodb::bson::to_bson(&body.role)
        .map_err(|e| ApiError::internal(format!("Role encoding failed: {}", e)))?;
    collection(&db)
        .update_one(
            doc! { "_id": target_id },
            doc! { "$set": { "role": role, "updatedAt": DateTime::now() } },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User role updated successfully",
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub action: Option<AuditAction>,
}

/// Admin view over the security audit trail.
pub async fn list_audit_logs(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    query: web::Query<AuditLogQuery>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
        sort_by: query.sort_by.clone(),
        sort_order: query.sort_order.clone(),
    };

    let mut filter = doc! {};
    if let Some(user_id) = &query.user_id {
        filter.insert("userId", parse_object_id(user_id)?);
    }
    if let Some(action) = query.action {
        let action = mongodb::bson::to_bson(&action)
            .map_err(|e| ApiError::internal(format!("Action encoding failed: {}", e)))?;
        filter.insert("type", action);
    }

    let coll = db
        .database
        .collection::<crate::models::audit::AuditRecord>(crate::models::audit::COLLECTION);
    let total = coll.count_documents(filter.clone(), None).await?;
    let mut cursor = coll
        .find(filter, pagination.find_options("createdAt"))
        .await?;

    let mut items = Vec::new();
    while let Some(entry) = cursor.try_next().await? {
        items.push(entry);
    }

    Ok(HttpResponse::Ok().json(Page::new(&pagination, total, items)))
}

pub async fn soft_delete_user(
    db: web::Data<MongoConfig>,
    user: AuthUser,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&user)?;

    let target_id = parse_object_id(&id)?;
    if target_id == user.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }
    let target = load_user(&db, target_id).await?;
    if target.role == Role::SuperAdmin {
        return Err(ApiError::forbidden("Super admin accounts cannot be deleted"));
    }

    collection(&db)
        .update_one(
            doc! { "_id": target_id },
            doc! {
                "$set": { "isDeleted": true, "isActive": false, "updatedAt": DateTime::now() },
                "$unset": { "refreshTokenHash": "" },
            },
            None,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User soft deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_validation_rules() {
        let ok = RegisterRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
            phone: None,
            language: None,
        };
        assert!(ok.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..ok
        };
        let err = bad_email.validate().unwrap_err();
        assert!(validation_message(&err).contains("valid email"));
    }

    #[test]
    fn short_password_is_rejected() {
        let req = ResetPasswordRequest {
            token: "t".to_string(),
            new_password: "abc".to_string(),
        };
        let err = req.validate().unwrap_err();
        assert!(validation_message(&err).contains("at least 6"));
    }
}
