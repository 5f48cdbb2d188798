use mongodb::{Client, Database};
use std::env;
use std::path::PathBuf;
use dotenv::dotenv;

pub struct MongoConfig {
    pub database: Database,
}

impl MongoConfig {
    pub async fn init(settings: &Settings) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(&settings.mongo_uri).await?;
        let database = client.database(&settings.database_name);

        Ok(MongoConfig { database })
    }
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct Settings {
    pub mongo_uri: String,
    pub database_name: String,
    pub bind_addr: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub upload_dir: PathBuf,
    /// Remote image store endpoint; when unset the in-memory store is used.
    pub media_base_url: Option<String>,
    pub media_api_key: String,
    pub media_upload_preset: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv().ok();

        Settings {
            mongo_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "pooja_path".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-access-secret".to_string()),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .unwrap_or_else(|_| "dev-refresh-secret".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            media_base_url: env::var("MEDIA_BASE_URL").ok(),
            media_api_key: env::var("MEDIA_API_KEY").unwrap_or_default(),
            media_upload_preset: env::var("MEDIA_UPLOAD_PRESET").unwrap_or_default(),
        }
    }
}
