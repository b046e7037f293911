//! On-disk dataset directories.
//!
//! A dataset is a directory `<root>/<name>/` holding the files uploaded for it,
//! plus an optional `links.url` list of web pages to index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::DatasetError;
use crate::models::DatasetsConfig;
use crate::utils::{is_valid_component, sanitize_filename};

/// File inside a dataset that collects uploaded URLs, one per line.
pub const LINKS_FILE: &str = "links.url";

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name as sent by the client; sanitized before use.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

type TrainLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

pub struct DatasetStore {
    root: PathBuf,
    train_locks: TrainLocks,
}

/// Exclusive hold on a dataset for one training run.
///
/// The dataset's lock entry is forgotten when the last holder or waiter is gone.
pub struct TrainingGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<AsyncMutex<()>>,
    locks: TrainLocks,
    name: String,
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // One reference in the map, one here: nobody else is waiting
        let idle = Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.name)
                .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock));
        if idle {
            locks.remove(&self.name);
        }
    }
}

impl DatasetStore {
    pub fn new(config: &DatasetsConfig) -> Self {
        Self::with_root(config.dir.clone())
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            train_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate_name(name: &str) -> Result<(), DatasetError> {
        if is_valid_component(name) {
            Ok(())
        } else {
            Err(DatasetError::InvalidName(name.to_string()))
        }
    }

    /// Directory of dataset `name`, whether or not it exists yet.
    pub fn dataset_dir(&self, name: &str) -> Result<PathBuf, DatasetError> {
        Self::validate_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> Result<bool, DatasetError> {
        Ok(self.dataset_dir(name)?.is_dir())
    }

    /// Write uploaded files into the dataset, creating it if needed.
    ///
    /// Existing files with the same name are overwritten. Returns the written paths.
    pub async fn save_files(
        &self,
        name: &str,
        files: &[UploadedFile],
    ) -> Result<Vec<PathBuf>, DatasetError> {
        let dir = self.dataset_dir(name)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(DatasetError::Write)?;

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let filename = sanitize_filename(&file.filename);
            if filename.is_empty() {
                warn!("ignoring upload with unusable name {:?}", file.filename);
                continue;
            }

            let path = dir.join(&filename);
            tokio::fs::write(&path, &file.bytes)
                .await
                .map_err(DatasetError::Write)?;
            debug!("saved {} ({} bytes)", path.display(), file.bytes.len());
            written.push(path);
        }

        Ok(written)
    }

    /// Append newline-separated URLs to the dataset's link list.
    ///
    /// Blank lines are dropped. Returns the number of URLs appended.
    pub async fn append_urls(&self, name: &str, urls: &str) -> Result<usize, DatasetError> {
        let lines: Vec<&str> = urls
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            return Ok(0);
        }

        let dir = self.dataset_dir(name)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(DatasetError::Write)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LINKS_FILE))
            .await
            .map_err(DatasetError::Write)?;

        let mut content = lines.join("\n");
        content.push('\n');
        file.write_all(content.as_bytes())
            .await
            .map_err(DatasetError::Write)?;
        file.flush().await.map_err(DatasetError::Write)?;

        Ok(lines.len())
    }

    /// Regular files directly inside the dataset, sorted by name.
    pub fn list_files(&self, name: &str) -> Result<Vec<PathBuf>, DatasetError> {
        let dir = self.dataset_dir(name)?;
        if !dir.is_dir() {
            return Err(DatasetError::NotFound(name.to_string()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DatasetError::Io(e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Serialize training runs on the same dataset.
    pub async fn lock_for_training(&self, name: &str) -> TrainingGuard {
        let lock = {
            let mut locks = self
                .train_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        TrainingGuard {
            guard: Some(guard),
            lock,
            locks: Arc::clone(&self.train_locks),
            name: name.to_string(),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.train_locks.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn store() -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::with_root(dir.path().join("datasets"));
        (dir, store)
    }

    #[test]
    fn test_validate_name() {
        assert!(DatasetStore::validate_name("reports-2024").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "x\ny"] {
            assert!(
                matches!(DatasetStore::validate_name(bad), Err(DatasetError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_save_files_strips_directories() {
        let (_tmp, store) = store();
        let files = vec![
            UploadedFile::new("../../escape.txt", b"nope".to_vec()),
            UploadedFile::new("docs/report.pdf", b"%PDF".to_vec()),
        ];

        let written = store.save_files("set", &files).await.unwrap();

        let dir = store.root().join("set");
        assert_eq!(written, vec![dir.join("escape.txt"), dir.join("report.pdf")]);
        assert_eq!(std::fs::read(dir.join("escape.txt")).unwrap(), b"nope");
        assert!(!store.root().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_appends_to_existing_dataset() {
        let (_tmp, store) = store();
        store
            .save_files("set", &[UploadedFile::new("a.txt", b"a".to_vec())])
            .await
            .unwrap();
        store
            .save_files("set", &[UploadedFile::new("b.txt", b"b".to_vec())])
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_files("set")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_append_urls() {
        let (_tmp, store) = store();
        assert_eq!(
            store
                .append_urls("set", "https://a.example\n\n  https://b.example  \n")
                .await
                .unwrap(),
            2
        );
        store.append_urls("set", "https://c.example").await.unwrap();
        assert_eq!(store.append_urls("set", "  \n").await.unwrap(), 0);

        let content = std::fs::read_to_string(store.root().join("set").join(LINKS_FILE)).unwrap();
        assert_eq!(content, "https://a.example\nhttps://b.example\nhttps://c.example\n");
    }

    #[test]
    fn test_list_files_missing_dataset() {
        let (_tmp, store) = store();
        assert!(matches!(store.list_files("ghost"), Err(DatasetError::NotFound(_))));
        assert!(!store.exists("ghost").unwrap());
    }

    #[test]
    fn test_list_files_skips_subdirectories() {
        let (_tmp, store) = store();
        let dir = store.root().join("set");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested").join("inner.txt"), "x").unwrap();
        std::fs::write(dir.join("top.txt"), "y").unwrap();

        assert_eq!(store.list_files("set").unwrap(), vec![dir.join("top.txt")]);
    }

    #[tokio::test]
    async fn test_training_lock_is_per_dataset() {
        let (_tmp, store) = store();
        let _held = store.lock_for_training("a").await;

        // A different dataset is not blocked
        let other =
            tokio::time::timeout(Duration::from_millis(100), store.lock_for_training("b")).await;
        assert!(other.is_ok());

        // The same dataset is
        let same =
            tokio::time::timeout(Duration::from_millis(50), store.lock_for_training("a")).await;
        assert!(same.is_err());
    }

    #[tokio::test]
    async fn test_training_lock_entries_are_released() {
        let (_tmp, store) = store();
        let store = Arc::new(store);

        let held = store.lock_for_training("a").await;
        assert_eq!(store.tracked_locks(), 1);

        let waiter_store = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            let _guard = waiter_store.lock_for_training("a").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter still needs the entry
        drop(held);
        assert_eq!(store.tracked_locks(), 1);

        waiter.await.unwrap();
        assert_eq!(store.tracked_locks(), 0);

        drop(store.lock_for_training("b").await);
        assert_eq!(store.tracked_locks(), 0);
    }
}
