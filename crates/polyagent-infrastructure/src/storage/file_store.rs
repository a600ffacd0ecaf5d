use super::atomic_file::{AtomicFileError, AtomicTextFile};
use async_trait::async_trait;
use polyagent_core::conversation::KeyValueStore;
use polyagent_core::error::{PolyError, Result};
use std::path::{Path, PathBuf};
use tokio::task;

/// Key/value store keeping one file per key inside a namespace directory.
///
/// Every save replaces the file atomically.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> AtomicTextFile {
        AtomicTextFile::new(self.dir.join(file_name_for(key)))
    }
}

/// Maps a key onto a safe file name.
fn file_name_for(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    format!("{}.dat", sanitized)
}

/// Runs blocking file I/O off the async worker threads.
async fn blocking<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, AtomicFileError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(operation)
        .await
        .map_err(|e| PolyError::storage(format!("Failed to spawn blocking task: {}", e)))?
        .map_err(PolyError::from)
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let file = self.file_for(key);
        blocking(move || file.load()).await
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let file = self.file_for(key);
        let owned = value.to_string();
        blocking(move || file.save(&owned)).await?;
        tracing::trace!("[FileKeyValueStore] Saved '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let file = self.file_for(key);
        blocking(move || file.remove()).await
    }
}
