//! Persisted snapshot tier for case content.
//!
//! Each key is one JSON file `{ "storedAt": ..., "value": ... }` inside the
//! cache directory. A snapshot is honoured only while younger than the TTL.
//! Every I/O or decode failure is logged and treated as a miss.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read `key` if present and younger than `ttl`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let path = self.path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache snapshot");
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt cache snapshot");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(envelope.stored_at);
        let fresh = age
            .to_std()
            .map(|age| age < ttl)
            .unwrap_or(true);
        if !fresh {
            tracing::debug!(key, "Cache snapshot expired");
            return None;
        }
        Some(envelope.value)
    }

    /// Write `value` under `key`, stamped with the current time.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) {
        self.write_at(key, value, Utc::now()).await;
    }

    pub(crate) async fn write_at<T: Serialize>(&self, key: &str, value: &T, stored_at: DateTime<Utc>) {
        let envelope = Envelope { stored_at, value };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to encode cache snapshot");
                return;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to create cache directory");
            return;
        }
        let path = self.path(key);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write cache snapshot");
        }
    }

    pub async fn remove(&self, key: &str) {
        let path = self.path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        cache.write("numbers", &vec![1, 2, 3]).await;
        assert_eq!(cache.read::<Vec<i32>>("numbers", TTL).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        assert_eq!(cache.read::<u32>("absent", TTL).await, None);
    }

    #[tokio::test]
    async fn expired_snapshot_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let old = Utc::now() - chrono::Duration::seconds(301);
        cache.write_at("stale", &7u32, old).await;
        assert_eq!(cache.read::<u32>("stale", TTL).await, None);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("bad.json"), b"{not json").await.unwrap();
        let cache = DiskCache::new(dir.path());
        assert_eq!(cache.read::<u32>("bad", TTL).await, None);
    }

    #[tokio::test]
    async fn remove_deletes_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"));
        cache.write("k", &1u8).await;
        cache.remove("k").await;
        cache.remove("k").await;
        assert_eq!(cache.read::<u8>("k", TTL).await, None);
    }
}
