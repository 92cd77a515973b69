//! Storage for listing photographs.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage rejected object with {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The first failed file of a batch; files after it were not attempted.
#[derive(Debug, thiserror::Error)]
#[error("Failed to upload {file}")]
pub struct UploadError {
    pub file: String,
    #[source]
    pub source: MediaError,
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the object under `name` and returns its public URL.
    async fn put(&self, name: &str, content_type: &str, bytes: Bytes) -> Result<String, MediaError>;
}

/// `<uuid>-<name>` with the name reduced to a safe file name.
pub fn object_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    clean = clean.trim_matches(|c| c == '.' || c == '-').to_string();
    if clean.is_empty() {
        clean = "image".to_string();
    }
    format!("{}-{}", Uuid::new_v4(), clean)
}

/// Uploads files in order and returns their URLs. Stops at the first failure.
pub async fn upload_all<S>(store: &S, files: Vec<UploadFile>) -> Result<Vec<String>, UploadError>
where
    S: ImageStore + ?Sized,
{
    let mut urls = Vec::with_capacity(files.len());
    for file in files {
        let name = object_name(&file.file_name);
        match store.put(&name, &file.content_type, file.bytes).await {
            Ok(url) => urls.push(url),
            Err(source) => {
                warn!("upload of {} failed: {}", file.file_name, source);
                return Err(UploadError {
                    file: file.file_name,
                    source,
                });
            }
        }
    }
    Ok(urls)
}

/// Files on local disk, served by the app under `public_path`.
pub struct LocalImageStore {
    dir: PathBuf,
    public_path: String,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_path: &str) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, name: &str, _content_type: &str, bytes: Bytes) -> Result<String, MediaError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(name), &bytes).await?;
        info!("stored {} ({} bytes)", name, bytes.len());
        Ok(format!("{}/{}", self.public_path, name))
    }
}

/// Supabase-style storage bucket with public read access.
pub struct BucketStore {
    client: Client,
    base_url: String,
    key: String,
    bucket: String,
}

impl BucketStore {
    pub fn new(base_url: &str, key: &str, bucket: &str) -> Result<Self, MediaError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, name)
    }
}

#[async_trait]
impl ImageStore for BucketStore {
    async fn put(&self, name: &str, content_type: &str, bytes: Bytes) -> Result<String, MediaError> {
        let resp = self
            .client
            .post(format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name))
            .bearer_auth(&self.key)
            .header("apikey", &self.key)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        info!("uploaded {} to bucket {}", name, self.bucket);
        Ok(self.public_url(name))
    }
}
