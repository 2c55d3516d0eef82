//! # Local media storage
//!
//! Filesystem implementation of `MediaStorage`.
//! Content-addressable: the SHA-256 of the bytes is the key, so identical
//! uploads share one file. Files are sharded into `ab/cd/<hash>` directories.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{DomainError, MediaStorage, Result, StoredMedia};
use mime::Mime;
use sha2::{Digest, Sha256};
use tokio::fs;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix: String = url_prefix.into();
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded path: "ab/cd/abcd...hash"
    fn sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(hash);
        path
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, data: Bytes, content_type: &Mime) -> Result<StoredMedia> {
        let hash = hex::encode(Sha256::digest(&data));
        let target = self.sharded_path(&hash);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(DomainError::internal)?;
        }

        if fs::try_exists(&target).await.map_err(DomainError::internal)? {
            tracing::debug!(key = %hash, "upload already stored");
        } else {
            fs::write(&target, &data).await.map_err(DomainError::internal)?;
            tracing::info!(key = %hash, bytes = data.len(), %content_type, "stored upload");
        }

        Ok(StoredMedia { url: self.url_for(&hash), key: hash })
    }

    fn url_for(&self, key: &str) -> String {
        if key.len() < 4 {
            return format!("{}/{}", self.url_prefix, key);
        }
        format!("{}/{}/{}/{}", self.url_prefix, &key[0..2], &key[2..4], key)
    }
}
