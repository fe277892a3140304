use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use game_types::ScoreEntry;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::store::{PersistBackend, ScoreStore, check_entry, top_n};

/// Leaderboard kept as a JSON array in a single file.
///
/// Writers serialise on an exclusive lock of a sibling `<file>.lock` and
/// replace the data file atomically, so readers see either the old or the
/// new sequence and never a partial write.
#[derive(Debug, Clone)]
pub struct JsonScoreStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = OsString::from(path.as_os_str());
        lock_name.push(".lock");

        Self {
            path,
            lock_path: PathBuf::from(lock_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs blocking file work off the async runtime
    async fn blocking<T, F>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Path, &Path) -> Result<T, StorageError> + Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || work(&path, &lock_path)).await?
    }
}

/// Advisory lock on the lock file, released when dropped
struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    fn exclusive(path: &Path) -> Result<Self, StorageError> {
        let file = Self::open(path)?;
        file.lock().map_err(|e| StorageError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn shared(path: &Path) -> Result<Self, StorageError> {
        let file = Self::open(path)?;
        file.lock_shared().map_err(|e| StorageError::io(path, e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    fn open(path: &Path) -> Result<File, StorageError> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| StorageError::io(path, e))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Missing and blank files are an empty leaderboard; anything else must parse.
fn read_entries(path: &Path) -> Result<Vec<ScoreEntry>, StorageError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&contents).map_err(|source| StorageError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_entries_atomically(path: &Path, entries: &[ScoreEntry]) -> Result<(), StorageError> {
    let dir = parent_dir(path);
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;

    serde_json::to_writer_pretty(&mut temp, entries)
        .map_err(|e| StorageError::io(temp.path(), e.into()))?;
    temp.write_all(b"\n")
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| StorageError::io(temp.path(), e))?;

    // The temporary file starts out private; keep the leaderboard's own mode
    match fs::metadata(path) {
        Ok(existing) => temp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| StorageError::io(temp.path(), e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StorageError::io(path, e)),
    }

    // An early return above drops `temp`, which deletes the temporary file
    temp.persist(path).map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

fn append_entry(path: &Path, lock_path: &Path, entry: ScoreEntry) -> Result<usize, StorageError> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let _lock = FileLock::exclusive(lock_path)?;
    let mut entries = read_entries(path)?;
    entries.push(entry);
    write_entries_atomically(path, &entries)?;

    Ok(entries.len())
}

fn load_entries(path: &Path, lock_path: &Path) -> Result<Vec<ScoreEntry>, StorageError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let _lock = FileLock::shared(lock_path)?;
    read_entries(path)
}

#[async_trait]
impl ScoreStore for JsonScoreStore {
    fn backend(&self) -> PersistBackend {
        PersistBackend::Json
    }

    async fn insert(&self, entry: ScoreEntry) -> Result<ScoreEntry, StorageError> {
        check_entry(&entry)?;

        let stored = entry.clone();
        let total = self
            .blocking(move |path, lock_path| append_entry(path, lock_path, stored))
            .await?;
        debug!(
            "Recorded score for {} ({} attempts), {} entries in {}",
            entry.name,
            entry.attempts,
            total,
            self.path.display()
        );

        Ok(entry)
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreEntry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.blocking(load_entries).await?;
        Ok(top_n(entries, limit))
    }

    async fn top_scores_for(
        &self,
        difficulty: &str,
        limit: usize,
    ) -> Result<Vec<ScoreEntry>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let entries = self.blocking(load_entries).await?;
        let matching = entries
            .into_iter()
            .filter(|entry| entry.difficulty == difficulty)
            .collect();
        Ok(top_n(matching, limit))
    }

    async fn difficulties(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.blocking(load_entries).await?;
        let mut labels: Vec<String> = entries.into_iter().map(|entry| entry.difficulty).collect();
        labels.sort();
        labels.dedup();
        Ok(labels)
    }
}
