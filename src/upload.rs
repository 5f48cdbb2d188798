//! Multipart intake: buffers file fields to disk with extension and size
//! limits, collects text fields, and decodes JSON-encoded fields once at
//! the boundary.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ApiError;

pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf", "doc", "docx", "zip"];
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// A file buffered locally for the duration of one request. The backing
/// temp file is removed when the guard drops, on every exit path.
pub struct TempUpload {
    file: NamedTempFile,
    pub field: String,
    pub original_name: String,
    pub size: usize,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn create(
        field: String,
        original_name: String,
        extension: &str,
        upload_dir: &Path,
    ) -> Result<Self, ApiError> {
        let file = tempfile::Builder::new()
            .suffix(&format!(".{}", extension))
            .tempfile_in(upload_dir)
            .map_err(|e| ApiError::internal(format!("Failed to buffer upload: {}", e)))?;
        Ok(TempUpload {
            file,
            field,
            original_name,
            size: 0,
        })
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), ApiError> {
        self.size += chunk.len();
        if self.size > MAX_FILE_SIZE {
            return Err(ApiError::validation("File too large. Max size is 10MB."));
        }
        self.file
            .write_all(chunk)
            .map_err(|e| ApiError::internal(format!("Failed to buffer upload: {}", e)))
    }
}

fn allowed_extension(filename: &str) -> Result<String, ApiError> {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ApiError::validation(format!(
            "Unsupported file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

/// Text fields plus buffered files from one multipart request body.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<TempUpload>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::validation(format!("{} is required", name)))
    }

    /// Decode-at-the-boundary for structured fields arriving as JSON text
    /// inside the multipart body. Internal logic only ever sees the typed
    /// value.
    pub fn json_field<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|_| ApiError::validation(format!("Invalid JSON in field '{}'", name))),
        }
    }

    pub fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ApiError::validation(format!("Invalid value for '{}'", name))),
        }
    }

    pub fn files_for(&self, field: &str) -> Vec<&TempUpload> {
        self.files.iter().filter(|f| f.field == field).collect()
    }
}

/// Streams a multipart body into a [`MultipartForm`], enforcing the
/// extension allow-list and size cap per file. Any error drops the form,
/// which removes every already-buffered temp file.
pub async fn read_multipart(
    mut payload: Multipart,
    upload_dir: &Path,
) -> Result<MultipartForm, ApiError> {
    std::fs::create_dir_all(upload_dir)
        .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {}", e)))?;

    let mut form = MultipartForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|_| ApiError::validation("Malformed multipart body"))?
    {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(|f| f.to_string());

        match filename {
            Some(filename) if !filename.is_empty() => {
                let ext = allowed_extension(&filename)?;
                let mut upload = TempUpload::create(name, filename, &ext, upload_dir)?;
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|_| ApiError::validation("Malformed multipart body"))?
                {
                    upload.write_chunk(&chunk)?;
                }
                debug!("buffered upload {} ({} bytes)", upload.original_name, upload.size);
                form.files.push(upload);
            }
            _ => {
                let mut value = Vec::new();
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|_| ApiError::validation("Malformed multipart body"))?
                {
                    value.extend_from_slice(&chunk);
                }
                let value = String::from_utf8(value)
                    .map_err(|_| ApiError::validation(format!("Field '{}' is not valid UTF-8", name)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("diya.JPG").unwrap(), "jpg");
        assert_eq!(allowed_extension("manual.pdf").unwrap(), "pdf");

        let err = allowed_extension("script.exe").unwrap_err().to_string();
        assert!(err.contains("jpg, jpeg, png"));
        assert!(allowed_extension("noextension").is_err());
    }

    #[test]
    fn temp_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let mut upload = TempUpload::create(
                "images".to_string(),
                "diya.jpg".to_string(),
                "jpg",
                dir.path(),
            )
            .unwrap();
            upload.write_chunk(b"bytes").unwrap();
            path = upload.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn size_cap_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut upload = TempUpload::create(
            "images".to_string(),
            "big.png".to_string(),
            "png",
            dir.path(),
        )
        .unwrap();

        let chunk = vec![0u8; MAX_FILE_SIZE];
        upload.write_chunk(&chunk).unwrap();
        let err = upload.write_chunk(b"x").unwrap_err().to_string();
        assert!(err.contains("too large"));
    }

    #[test]
    fn json_fields_decode_once_at_boundary() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Name {
            english: String,
            hindi: String,
        }

        let mut form = MultipartForm::default();
        form.fields.insert(
            "name".to_string(),
            r#"{"english":"Brass Diya","hindi":"पीतल दीया"}"#.to_string(),
        );
        form.fields.insert("bad".to_string(), "{not json".to_string());

        let name: Name = form.json_field("name").unwrap().unwrap();
        assert_eq!(name.english, "Brass Diya");
        assert!(form.json_field::<Name>("bad").is_err());
        assert_eq!(form.json_field::<Name>("absent").unwrap(), None);
    }

    #[test]
    fn parsed_and_required_text() {
        let mut form = MultipartForm::default();
        form.fields.insert("price".to_string(), "99.5".to_string());
        form.fields.insert("stock".to_string(), "ten".to_string());

        assert_eq!(form.parsed::<f64>("price").unwrap(), Some(99.5));
        assert!(form.parsed::<i64>("stock").is_err());
        assert!(form.require_text("name").is_err());
    }
}
