use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{MongoConfig, Settings};
use crate::error::ApiError;
use crate::models::user::{self, Role, User};

pub const ACCESS_TOKEN_HOURS: i64 = 2;
pub const REFRESH_TOKEN_DAYS: i64 = 3;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

pub fn generate_access_token(user: &User, secret: &str) -> Result<String, ApiError> {
    sign_token(user, secret, Duration::hours(ACCESS_TOKEN_HOURS))
}

pub fn generate_refresh_token(user: &User, secret: &str) -> Result<String, ApiError> {
    sign_token(user, secret, Duration::days(REFRESH_TOKEN_DAYS))
}

fn sign_token(user: &User, secret: &str, lifetime: Duration) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        exp: (now + lifetime).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("Token generation failed: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// SHA-256 hex digest used for refresh-token and reset-token storage; only
/// hashes ever hit the database.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn access_cookie(token: String) -> Cookie<'static> {
    session_cookie(ACCESS_COOKIE, token, CookieDuration::hours(ACCESS_TOKEN_HOURS))
}

pub fn refresh_cookie(token: String) -> Cookie<'static> {
    session_cookie(REFRESH_COOKIE, token, CookieDuration::days(REFRESH_TOKEN_DAYS))
}

pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), CookieDuration::seconds(0))
}

fn session_cookie(name: &'static str, value: String, max_age: CookieDuration) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .finish()
}

/// The authenticated caller. Extraction verifies the access cookie and
/// re-reads the user so deactivated or blocked accounts lose access
/// immediately; a handler that takes this parameter is a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(&req).await })
    }
}

pub fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.role.is_elevated() {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Access denied. Allowed roles: admin, super_admin",
        ))
    }
}

async fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or_else(|| ApiError::internal("Settings not configured"))?;
    let db = req
        .app_data::<web::Data<MongoConfig>>()
        .ok_or_else(|| ApiError::internal("Database not configured"))?;

    let token = req
        .cookie(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Please login to access this resource"))?;

    let claims = verify_token(&token, &settings.access_token_secret).map_err(|e| {
        if matches!(e.kind(), ErrorKind::ExpiredSignature) {
            ApiError::unauthorized("Session expired. Please login again.")
        } else {
            ApiError::unauthorized("Invalid token. Please login.")
        }
    })?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid token. Please login."))?;

    let user = db
        .database
        .collection::<User>(user::COLLECTION)
        .find_one(doc! { "_id": user_id }, None)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !user.is_active || user.is_deleted || user.is_blocked {
        return Err(ApiError::forbidden(
            "Account inactive or deleted. Contact support.",
        ));
    }

    Ok(AuthUser {
        id: user_id,
        name: user.name,
        email: user.email,
        role: user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;

    fn sample_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "hash".to_string(),
            phone: None,
            avatar: None,
            role,
            is_active: true,
            is_deleted: false,
            is_blocked: false,
            language: None,
            address: None,
            refresh_token_hash: None,
            reset_password_token: None,
            reset_password_expires: None,
            login_attempts: 0,
            lock_until: None,
            password_changed_at: None,
            last_active: None,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn token_round_trip_carries_role() {
        let user = sample_user(Role::Admin);
        let token = generate_access_token(&user, "secret").unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.role, Role::Admin);
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let a = hash_token("refresh-token");
        let b = hash_token("refresh-token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_token("different"));
    }

    #[test]
    fn admin_gate() {
        let admin = AuthUser {
            id: ObjectId::new(),
            name: "a".to_string(),
            email: "a@x.com".to_string(),
            role: Role::SuperAdmin,
        };
        assert!(require_admin(&admin).is_ok());

        let user = AuthUser { role: Role::User, ..admin };
        assert!(require_admin(&user).is_err());
    }

    #[test]
    fn session_cookies_are_http_only() {
        let cookie = access_cookie("tok".to_string());
        assert_eq!(cookie.name(), ACCESS_COOKIE);
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.path(), Some("/"));

        let gone = expired_cookie(REFRESH_COOKIE);
        assert_eq!(gone.max_age(), Some(CookieDuration::seconds(0)));
    }
}
