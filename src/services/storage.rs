use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::EvidenceConfig;

/// Where a saved file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub url: String,
    pub stored_name: String,
    pub path: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredFile>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Time-limited URL for `path`, or `None` when the backend cannot sign
    async fn signed_url(&self, path: &str, minutes: i64) -> Result<Option<String>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct DownloadClaims {
    path: String,
    exp: usize,
}

/// Stores files under a directory and signs download links with HS256 tokens.
pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
    signing_secret: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, signing_secret: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_secret: signing_secret.to_string(),
        }
    }

    pub fn from_config(config: &EvidenceConfig, signing_secret: &str) -> Self {
        Self::new(&config.storage_root, &config.public_base_url, signing_secret)
    }

    /// Check a download token and return the path it grants
    pub fn verify_download_token(&self, token: &str) -> Result<String> {
        let data = decode::<DownloadClaims>(
            token,
            &DecodingKey::from_secret(self.signing_secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .context("Invalid download token")?;

        Ok(data.claims.path)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<StoredFile> {
        let directory = self.root.join(folder);
        tokio::fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("Failed to create {}", directory.display()))?;

        let target = directory.join(name);
        tokio::fs::write(&target, content)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        log::debug!(
            "Stored {} ({} bytes, {}) at {}",
            name,
            content.len(),
            content_type,
            target.display()
        );

        let path = format!("{}/{}", folder, name);
        Ok(StoredFile {
            url: self.public_url(&path),
            stored_name: name.to_string(),
            path,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.root.join(path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", target.display())),
        }
    }

    async fn signed_url(&self, path: &str, minutes: i64) -> Result<Option<String>> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::minutes(minutes))
            .context("Signed URL expiry out of range")?
            .timestamp() as usize;

        let token = encode(
            &Header::default(),
            &DownloadClaims {
                path: path.to_string(),
                exp: expiration,
            },
            &EncodingKey::from_secret(self.signing_secret.as_ref()),
        )?;

        Ok(Some(format!("{}?token={}", self.public_url(path), token)))
    }
}

/// Keeps file contents in process. Signing can be switched off to exercise URL fallbacks.
pub struct MemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    public_base_url: String,
    can_sign: bool,
}

impl Default for MemoryFileStorage {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            public_base_url: "memory://files".to_string(),
            can_sign: true,
        }
    }
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_signing() -> Self {
        Self {
            can_sign: false,
            ..Self::default()
        }
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.lock().await.contains_key(path)
    }

    pub async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn save(
        &self,
        folder: &str,
        name: &str,
        content: &[u8],
        _content_type: &str,
    ) -> Result<StoredFile> {
        let path = format!("{}/{}", folder, name);
        self.files
            .lock()
            .await
            .insert(path.clone(), content.to_vec());

        Ok(StoredFile {
            url: format!("{}/{}", self.public_base_url, path),
            stored_name: name.to_string(),
            path,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files.lock().await.remove(path);
        Ok(())
    }

    async fn signed_url(&self, path: &str, minutes: i64) -> Result<Option<String>> {
        if !self.can_sign {
            return Ok(None);
        }
        let expires = Utc::now() + Duration::minutes(minutes);
        Ok(Some(format!(
            "{}/{}?expires={}",
            self.public_base_url,
            path,
            expires.timestamp()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_round_trips_signed_download_tokens() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalFileStorage::new(dir.path(), "http://files.test/", "secret");

        let stored = storage
            .save("evidence/abc", "note.txt", b"hello", "text/plain")
            .await
            .unwrap();
        assert_eq!(stored.path, "evidence/abc/note.txt");
        assert_eq!(stored.url, "http://files.test/evidence/abc/note.txt");
        assert!(dir.path().join("evidence/abc/note.txt").exists());

        let url = storage.signed_url(&stored.path, 30).await.unwrap().unwrap();
        let token = url.split("?token=").nth(1).unwrap();
        assert_eq!(storage.verify_download_token(token).unwrap(), stored.path);

        storage.delete(&stored.path).await.unwrap();
        assert!(!dir.path().join("evidence/abc/note.txt").exists());
        // Deleting twice is fine
        storage.delete(&stored.path).await.unwrap();
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let storage = LocalFileStorage::new("/tmp", "http://files.test", "secret");
        let other = LocalFileStorage::new("/tmp", "http://files.test", "other");
        let token = encode(
            &Header::default(),
            &DownloadClaims {
                path: "evidence/x".to_string(),
                exp: (Utc::now().timestamp() + 600) as usize,
            },
            &EncodingKey::from_secret(b"other"),
        )
        .unwrap();

        assert!(other.verify_download_token(&token).is_ok());
        assert!(storage.verify_download_token(&token).is_err());
    }
}
