use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use super::patch::Patch;
use crate::{
    error::{AppError, AppResult},
    storage::StorageClient,
};

const MIB: usize = 1024 * 1024;

/// A file part received in a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    fn accepts(self, content_type: &str) -> bool {
        match self {
            FileKind::Image => matches!(
                content_type,
                "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp"
            ),
            FileKind::Pdf => content_type == "application/pdf",
        }
    }

    fn max_bytes(self) -> usize {
        match self {
            FileKind::Image => 10 * MIB,
            FileKind::Pdf => 20 * MIB,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FileKind::Image => "an image (jpeg, png, gif, webp)",
            FileKind::Pdf => "a PDF",
        }
    }
}

impl Upload {
    pub fn ensure(&self, kind: FileKind) -> AppResult<()> {
        if !kind.accepts(&self.content_type) {
            return Err(AppError::validation(format!(
                "{} must be {}",
                self.field,
                kind.label()
            )));
        }
        if self.bytes.is_empty() {
            return Err(AppError::validation(format!("{} is empty", self.field)));
        }
        if self.bytes.len() > kind.max_bytes() {
            return Err(AppError::validation(format!(
                "{} exceeds {} MB",
                self.field,
                kind.max_bytes() / MIB
            )));
        }
        Ok(())
    }

    fn object_key(&self, folder: &str) -> String {
        let name: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        format!("{folder}/{}-{name}", Uuid::new_v4())
    }
}

/// Validates and stores the file under `folder`, returning its public URL.
pub async fn store(
    storage: &dyn StorageClient,
    folder: &str,
    upload: &Upload,
    kind: FileKind,
) -> AppResult<String> {
    upload.ensure(kind)?;
    let key = upload.object_key(folder);
    storage
        .put_object(&key, upload.bytes.clone(), &upload.content_type)
        .await?;
    info!(key = %key, size = upload.bytes.len(), "file stored");
    Ok(storage.public_url(&key))
}

/// Best-effort removal of a previously stored file. Failures are logged only.
pub async fn discard(storage: &dyn StorageClient, url: Option<&str>) {
    let Some(url) = url else { return };
    let Some(key) = storage.key_from_url(url) else {
        warn!(url = %url, "file url not owned by storage; skipping delete");
        return;
    };
    if let Err(e) = storage.delete_object(&key).await {
        warn!(error = %e, key = %key, "failed to delete stored file");
    }
}

/// File bookkeeping around one row write: a new upload is discarded if the
/// write fails, the replaced file is discarded once it succeeds.
#[derive(Debug, Default)]
pub struct FileSwap {
    new_url: Option<String>,
    old_url: Option<String>,
}

impl FileSwap {
    /// Applies an uploaded file (which wins) or an explicit URL/null from the
    /// body to `slot`, remembering what has to be cleaned up afterwards.
    pub async fn stage(
        storage: &dyn StorageClient,
        folder: &str,
        kind: FileKind,
        file: Option<&Upload>,
        requested: Patch<String>,
        slot: &mut Option<String>,
    ) -> AppResult<Self> {
        let new_url = match file {
            Some(file) => Some(store(storage, folder, file, kind).await?),
            None => None,
        };
        let replaced = match (&new_url, requested) {
            (Some(url), _) => slot.replace(url.clone()),
            (None, Patch::Missing) => None,
            (None, Patch::Null) => slot.take(),
            (None, Patch::Value(url)) => slot.replace(url),
        };
        let old_url = replaced.filter(|old| Some(old) != slot.as_ref());
        Ok(Self { new_url, old_url })
    }

    pub async fn finish<R>(
        self,
        storage: &dyn StorageClient,
        written: anyhow::Result<R>,
    ) -> AppResult<R> {
        match written {
            Ok(row) => {
                discard(storage, self.old_url.as_deref()).await;
                Ok(row)
            }
            Err(e) => {
                discard(storage, self.new_url.as_deref()).await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn upload(content_type: &str, size: usize) -> Upload {
        Upload {
            field: "image".into(),
            file_name: "my cover.png".into(),
            content_type: content_type.into(),
            bytes: Bytes::from(vec![7u8; size]),
        }
    }

    #[test]
    fn rejects_wrong_type_and_oversize() {
        assert!(upload("image/png", 10).ensure(FileKind::Image).is_ok());
        assert!(upload("text/html", 10).ensure(FileKind::Image).is_err());
        assert!(upload("image/png", 10).ensure(FileKind::Pdf).is_err());
        assert!(upload("image/png", 10 * MIB + 1).ensure(FileKind::Image).is_err());
        assert!(upload("application/pdf", 10 * MIB + 1).ensure(FileKind::Pdf).is_ok());
    }

    #[tokio::test]
    async fn store_then_discard() {
        let storage = MemoryStorage::default();
        let url = store(&storage, "projects", &upload("image/png", 4), FileKind::Image)
            .await
            .unwrap();
        assert!(url.starts_with("https://files.test/projects/"));
        assert!(url.ends_with("-my_cover.png"));
        assert_eq!(storage.len(), 1);

        discard(&storage, Some(&url)).await;
        assert_eq!(storage.len(), 0);

        // already gone: logged, not raised
        discard(&storage, Some(&url)).await;
    }

    #[tokio::test]
    async fn swap_keeps_old_file_until_write_succeeds() {
        let storage = MemoryStorage::default();
        let old = store(&storage, "blog", &upload("image/png", 4), FileKind::Image)
            .await
            .unwrap();
        let mut slot = Some(old.clone());

        let new_file = upload("image/webp", 8);
        let swap = FileSwap::stage(&storage, "blog", FileKind::Image, Some(&new_file), Patch::Missing, &mut slot)
            .await
            .unwrap();
        assert_ne!(slot.as_deref(), Some(old.as_str()));
        assert_eq!(storage.len(), 2);

        let failed: anyhow::Result<()> = Err(anyhow::anyhow!("db down"));
        assert!(swap.finish(&storage, failed).await.is_err());
        // new upload rolled back, old file untouched
        assert_eq!(storage.len(), 1);
        assert!(storage.contains(&storage.key_from_url(&old).unwrap()));
    }

    #[tokio::test]
    async fn swap_with_explicit_null_drops_file_after_write() {
        let storage = MemoryStorage::default();
        let old = store(&storage, "projects", &upload("image/png", 4), FileKind::Image)
            .await
            .unwrap();
        let mut slot = Some(old);

        let swap = FileSwap::stage(&storage, "projects", FileKind::Image, None, Patch::Null, &mut slot)
            .await
            .unwrap();
        assert_eq!(slot, None);
        swap.finish(&storage, Ok(())).await.unwrap();
        assert_eq!(storage.len(), 0);
    }
}
