use std::{collections::HashMap, sync::Mutex};

use anyhow::{anyhow, Context};
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;

use crate::config::StorageConfig;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    fn public_url(&self, key: &str) -> String;

    /// Inverse of [`public_url`](Self::public_url); `None` for foreign URLs.
    fn key_from_url(&self, url: &str) -> Option<String>;
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn strip_base(base: &str, url: &str) -> Option<String> {
    url.strip_prefix(base.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        let public_base = if cfg.public_url.is_empty() {
            join_url(&cfg.endpoint, &cfg.bucket)
        } else {
            cfg.public_url.clone()
        };

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base,
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        strip_base(&self.public_base, url)
    }
}

/// In-process object store for tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

const MEMORY_BASE: &str = "https://files.test";

impl MemoryStorage {
    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let mut objects = self.objects.lock().map_err(|_| anyhow!("storage lock poisoned"))?;
        objects.insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let mut objects = self.objects.lock().map_err(|_| anyhow!("storage lock poisoned"))?;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow!("no such object: {key}"))
    }

    fn public_url(&self, key: &str) -> String {
        join_url(MEMORY_BASE, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        strip_base(MEMORY_BASE, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_round_trips_through_key() {
        let storage = MemoryStorage::default();
        let url = storage.public_url("blog/abc-cover.png");
        assert_eq!(url, "https://files.test/blog/abc-cover.png");
        assert_eq!(storage.key_from_url(&url).as_deref(), Some("blog/abc-cover.png"));
        assert_eq!(storage.key_from_url("https://elsewhere.example/x.png"), None);
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let storage = MemoryStorage::default();
        storage
            .put_object("projects/a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert!(storage.contains("projects/a.png"));
        storage.delete_object("projects/a.png").await.unwrap();
        assert_eq!(storage.len(), 0);
        assert!(storage.delete_object("projects/a.png").await.is_err());
    }
}
