//! File backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A backend stored in a single file.
///
/// `flush` hands buffered bytes to the OS; `sync` calls `File::sync_all`.
/// The cached length is kept next to the handle under one lock so that an
/// append and its offset can never be observed out of step.
///
/// ```no_run
/// use feedsync_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("journal.log")).unwrap();
/// backend.append(b"record").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    len: u64,
}

impl FileBackend {
    /// Opens `path`, creating the file when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its size read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileState { file, len }),
        })
    }

    /// Like [`FileBackend::open`], creating missing parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the file cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.inner.lock();
        let size = state.len;
        match offset.checked_add(len as u64) {
            Some(end) if end <= size => {}
            _ => return Err(StorageError::OutOfBounds { offset, len, size }),
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; len];
        state.file.seek(SeekFrom::Start(offset))?;
        state.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = self.inner.get_mut();
        let offset = state.len;
        if data.is_empty() {
            return Ok(offset);
        }

        state.file.seek(SeekFrom::End(0))?;
        state.file.write_all(data)?;
        state.len += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().len)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let state = self.inner.get_mut();
        if new_size > state.len {
            return Err(StorageError::InvalidTruncate {
                requested: new_size,
                size: state.len,
            });
        }
        state.file.set_len(new_size)?;
        state.file.sync_all()?;
        state.len = new_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let backend = FileBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.path(), path);
    }

    #[test]
    fn append_then_read() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("j")).unwrap();

        assert_eq!(backend.append(b"first").unwrap(), 0);
        assert_eq!(backend.append(b"second").unwrap(), 5);
        assert_eq!(backend.read_at(5, 6).unwrap(), b"second");
        assert!(matches!(
            backend.read_at(8, 10),
            Err(StorageError::OutOfBounds { size: 11, .. })
        ));
    }

    #[test]
    fn contents_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"durable").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 7);
        assert_eq!(backend.read_at(0, 7).unwrap(), b"durable");
    }

    #[test]
    fn truncate_drops_the_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"keep-drop").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.size().unwrap(), 4);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4);
        assert!(backend.truncate(5).is_err());

        assert_eq!(backend.append(b"!").unwrap(), 4);
        assert_eq!(backend.read_at(0, 5).unwrap(), b"keep!");
    }

    #[test]
    fn nested_directories_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("journal.log");
        FileBackend::open_with_create_dirs(&path).unwrap();
        assert!(path.exists());
    }
}
