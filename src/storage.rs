//! Publishing framed photos.
//!
//! Photos are encoded once as JPEG and written under a generated key to GCS,
//! or to a local directory during development. Either way the caller gets
//! back a public URL for the object.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use google_cloud_storage::client::Storage;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use std::path::PathBuf;

use crate::constants::{OUTPUT_QUALITY, STORAGE_PREFIX};
use crate::models::Verdict;

pub const OUTPUT_EXTENSION: &str = "jpg";
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Local write failed for {path:?}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GCS write failed: {0}")]
    Gcs(String),
}

/// Write-once blob storage that hands back a public URL.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, key: &str, data: Bytes, content_type: &str)
    -> Result<String, StorageError>;
}

/// `framed_photos/<YYYYMMDD_HHMMSS>_<8 hex>_<verdict>.jpg`
pub fn storage_key(now: DateTime<Utc>, verdict: Verdict) -> String {
    let unique: u32 = rand::random();
    format!(
        "{}/{}_{:08x}_{}.{}",
        STORAGE_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        unique,
        verdict,
        OUTPUT_EXTENSION
    )
}

/// Encode a finished photo for publishing.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, StorageError> {
    let mut output = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut output, OUTPUT_QUALITY);
    image.write_with_encoder(encoder)?;
    Ok(output.into_inner())
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

pub struct GcsPublisher {
    gcs: Storage,
    bucket_name: String,
    public_base_url: String,
}

impl GcsPublisher {
    pub fn new(gcs: Storage, bucket_name: &str, public_base_url: &str) -> Self {
        Self {
            gcs,
            bucket_name: bucket_name.to_string(),
            public_base_url: public_base_url.to_string(),
        }
    }
}

#[async_trait]
impl Publisher for GcsPublisher {
    async fn publish(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let bucket = format!("projects/_/buckets/{}", self.bucket_name);
        self.gcs
            .write_object(&bucket, key, data)
            .set_content_type(content_type)
            .set_predefined_acl("publicRead")
            .send_buffered()
            .await
            .map_err(|e| StorageError::Gcs(e.to_string()))?;

        tracing::info!(bucket = %self.bucket_name, key, "GCS: Uploaded framed photo");
        Ok(public_url(&self.public_base_url, key))
    }
}

/// Writes objects below a directory; for running without GCS credentials.
pub struct LocalPublisher {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPublisher {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.to_string(),
        }
    }
}

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let full_path = self.root.join(key);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Local {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&full_path, &data)
            .await
            .map_err(|source| StorageError::Local {
                path: full_path.clone(),
                source,
            })?;

        tracing::info!("LOCAL: Saved framed photo to {:?}", full_path);
        Ok(public_url(&self.public_base_url, key))
    }
}
