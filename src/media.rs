//! Remote image store client and the upload/replace/cleanup discipline
//! around it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::StoredMedia;
use crate::upload::TempUpload;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Media store rejected the request: {0}")]
    Rejected(String),
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        ApiError::internal(e.to_string())
    }
}

/// Remote image store. Uploads return a durable URL plus the opaque
/// identifier later needed for deletion.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, path: &Path, folder: &str) -> Result<StoredMedia, MediaError>;
    async fn delete(&self, media_id: &str) -> Result<(), MediaError>;
}

/// HTTP-backed store speaking the hosted image CDN's upload/destroy API.
pub struct RemoteMediaStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct RemoteUploadResponse {
    secure_url: String,
    public_id: String,
}

impl RemoteMediaStore {
    pub fn new(base_url: String, api_key: String, upload_preset: String) -> Self {
        RemoteMediaStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            upload_preset,
        }
    }
}

#[async_trait]
impl MediaStore for RemoteMediaStore {
    async fn upload(&self, path: &Path, folder: &str) -> Result<StoredMedia, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("api_key", self.api_key.clone())
            .text("folder", folder.to_string())
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(format!("{}/image/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Rejected(format!(
                "upload returned {}",
                response.status()
            )));
        }

        let body: RemoteUploadResponse = response.json().await?;
        Ok(StoredMedia {
            url: body.secure_url,
            media_id: body.public_id,
        })
    }

    async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
        let response = self
            .client
            .post(format!("{}/image/destroy", self.base_url))
            .form(&[("public_id", media_id), ("api_key", &self.api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Rejected(format!(
                "destroy returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// In-process store used when no remote endpoint is configured, and by
/// tests. Remembers every upload and deletion.
#[derive(Default)]
pub struct MemoryMediaStore {
    assets: Mutex<HashMap<String, String>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_ids(&self) -> Vec<String> {
        self.assets.lock().unwrap().keys().cloned().collect()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, path: &Path, folder: &str) -> Result<StoredMedia, MediaError> {
        // Reading keeps parity with the remote store's failure modes.
        tokio::fs::read(path).await?;

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let media_id = format!("{}/{}", folder, token);
        let url = format!("memory://{}", media_id);

        self.assets
            .lock()
            .unwrap()
            .insert(media_id.clone(), url.clone());
        Ok(StoredMedia { url, media_id })
    }

    async fn delete(&self, media_id: &str) -> Result<(), MediaError> {
        self.assets.lock().unwrap().remove(media_id);
        self.deleted.lock().unwrap().push(media_id.to_string());
        Ok(())
    }
}

/// Uploads every buffered file under the entity's folder. Fails fast on the
/// first upload error; temp files are cleaned up by their own guards either
/// way. Media already pushed to the store before a later failure is left
/// orphaned (known gap, there is no compensating deletion).
pub async fn upload_all(
    store: &dyn MediaStore,
    uploads: &[&TempUpload],
    folder: &str,
) -> Result<Vec<StoredMedia>, ApiError> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        info!("uploading {} to {}", upload.original_name, folder);
        stored.push(store.upload(upload.path(), folder).await?);
    }
    Ok(stored)
}

/// Deletes every identifier, logging and swallowing individual failures.
/// Used on hard-delete cascades and after media replacement, where a stale
/// remote asset must never fail the primary request.
pub async fn delete_all(store: &dyn MediaStore, media: &[StoredMedia]) {
    for item in media {
        if let Err(e) = store.delete(&item.media_id).await {
            warn!("failed to delete remote media {}: {}", item.media_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_image() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not really a jpeg").unwrap();
        f
    }

    #[tokio::test]
    async fn memory_store_records_uploads_and_deletes() {
        let store = MemoryMediaStore::new();
        let file = temp_image();

        let media = store.upload(file.path(), "product_images").await.unwrap();
        assert!(media.media_id.starts_with("product_images/"));
        assert_eq!(store.stored_ids().len(), 1);

        store.delete(&media.media_id).await.unwrap();
        assert!(store.stored_ids().is_empty());
        assert_eq!(store.deleted_ids(), vec![media.media_id]);
    }

    #[tokio::test]
    async fn delete_all_swallows_failures() {
        struct FailingStore;

        #[async_trait]
        impl MediaStore for FailingStore {
            async fn upload(&self, _: &Path, _: &str) -> Result<StoredMedia, MediaError> {
                Err(MediaError::Rejected("down".to_string()))
            }
            async fn delete(&self, _: &str) -> Result<(), MediaError> {
                Err(MediaError::Rejected("down".to_string()))
            }
        }

        let media = vec![StoredMedia {
            url: "u".to_string(),
            media_id: "m".to_string(),
        }];
        // Must not panic or propagate.
        delete_all(&FailingStore, &media).await;
    }

    #[tokio::test]
    async fn upload_fails_on_missing_file() {
        let store = MemoryMediaStore::new();
        let err = store
            .upload(Path::new("/nonexistent/file.jpg"), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
