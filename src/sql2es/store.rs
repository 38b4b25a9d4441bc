use crate::error::StorageError;
use crate::sql2es::history::HistoryRecord;
use crate::sql2es::warn;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::Builder;

pub trait HistoryBackend {
    type Guard;

    /// Exclusive lock held for the duration of one read-modify-write.
    fn lock_exclusive(&self) -> Result<Self::Guard, StorageError>;

    /// Missing or unparsable data loads as empty; only I/O failures error.
    fn load(&self) -> Result<Vec<HistoryRecord>, StorageError>;

    /// Load ahead of a `replace`, called with the lock held.
    fn load_for_update(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.load()
    }

    fn replace(&self, records: &[HistoryRecord]) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    lock_path: PathBuf,
    corrupt_path: PathBuf,
}

pub struct FileLockGuard {
    file: File,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "history".into());
    name.push(suffix);
    path.with_file_name(name)
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = sibling_with_suffix(&path, ".lock");
        let corrupt_path = sibling_with_suffix(&path, ".corrupt");
        Self {
            path,
            lock_path,
            corrupt_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<&Path, StorageError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| StorageError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
        Ok(parent)
    }

    fn read_raw(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// `Ok(None)` when the file exists but does not parse.
    fn parse(&self, raw: &str, action: &str) -> Option<Vec<HistoryRecord>> {
        match serde_json::from_str(raw) {
            Ok(records) => Some(records),
            Err(err) => {
                warn::emit(
                    "W201_HISTORY_CORRUPT",
                    "history",
                    action,
                    &self.path.display().to_string(),
                    &err.to_string(),
                );
                None
            }
        }
    }
}

impl HistoryBackend for FileBackend {
    type Guard = FileLockGuard;

    fn lock_exclusive(&self) -> Result<FileLockGuard, StorageError> {
        self.ensure_parent()?;
        let lock_err = |source| StorageError::Lock {
            path: self.lock_path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        Ok(FileLockGuard { file })
    }

    fn load(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        Ok(self
            .read_raw()?
            .and_then(|raw| self.parse(&raw, "treat-as-empty"))
            .unwrap_or_default())
    }

    fn load_for_update(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let Some(raw) = self.read_raw()? else {
            return Ok(Vec::new());
        };
        if let Some(records) = self.parse(&raw, "move-aside") {
            return Ok(records);
        }
        // Keep the unreadable bytes; the caller is about to overwrite the file.
        fs::rename(&self.path, &self.corrupt_path).map_err(|source| StorageError::Write {
            path: self.corrupt_path.clone(),
            source,
        })?;
        Ok(Vec::new())
    }

    fn replace(&self, records: &[HistoryRecord]) -> Result<(), StorageError> {
        let parent = self.ensure_parent()?;
        let data = serde_json::to_string_pretty(records)?;
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        let mut tmp = Builder::new()
            .prefix(".history")
            .tempfile_in(parent)
            .map_err(write_err)?;
        tmp.write_all(data.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.into_temp_path()
            .persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Process-local backend; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<HistoryRecord>>,
}

impl HistoryBackend for MemoryBackend {
    type Guard = ();

    fn lock_exclusive(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn load(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn replace(&self, records: &[HistoryRecord]) -> Result<(), StorageError> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }
}
