//! Local directory backend adapter.
//!
//! Treats a local filesystem directory as the bucket. Uses atomic
//! write (temp file → fsync → rename) to prevent partial writes.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use logship_common::backend::{BackendAdapter, Grant, UploadHeaders};

pub struct DirectoryAdapter {
    base_path: PathBuf,
}

impl DirectoryAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    /// Resolve `key` under the base directory. Keys must be relative and
    /// may not contain `..` components; the name itself is never rewritten.
    fn full_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let mut path = self.base_path.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    bail!("Key escapes the target directory: {:?}", key);
                }
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl BackendAdapter for DirectoryAdapter {
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let search_dir = self.full_path(prefix)?;
        let base = &self.base_path;

        let mut keys = Vec::new();
        if !search_dir.exists() {
            return Ok(keys);
        }

        let mut stack = vec![search_dir];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to read directory {}", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let meta = entry.metadata().await?;

                if meta.is_dir() {
                    stack.push(path);
                } else if meta.is_file() {
                    // Compute key relative to base_path
                    if let Ok(relative) = path.strip_prefix(base) {
                        keys.push(relative.to_string_lossy().to_string());
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn upload(
        &self,
        remote_key: &str,
        data: Bytes,
        headers: &UploadHeaders,
    ) -> anyhow::Result<()> {
        let dest = self.full_path(remote_key)?;
        if dest == self.base_path {
            bail!("Empty key {:?}", remote_key);
        }

        // Ensure parent directory exists
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create parent directory")?;
        }

        // Write to temp file, then rename (atomic)
        let mut tmp_name = dest.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        tokio::fs::write(&tmp_path, &data)
            .await
            .context("Failed to write temp file")?;

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&tmp_path)
            .await
            .context("Failed to open temp file for fsync")?;
        file.sync_all().await.context("fsync failed")?;
        drop(file);

        tokio::fs::rename(&tmp_path, &dest)
            .await
            .context("Atomic rename failed")?;

        debug!(
            key = %remote_key,
            content_type = %headers.content_type,
            content_encoding = ?headers.content_encoding,
            "Directory upload complete"
        );
        Ok(())
    }

    async fn grant(&self, remote_key: &str, grant: &Grant) -> anyhow::Result<()> {
        // Plain directories carry no ACLs
        debug!(
            key = %remote_key,
            grantee = %grant.grantee_id,
            permission = %grant.permission,
            "Directory backend ignores grant"
        );
        Ok(())
    }
}
