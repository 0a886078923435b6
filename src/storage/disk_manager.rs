//! Disk manager: byte-level persistence of fixed-size pages to a single file.
//!
//! All four operations serialize on a single mutex around the file handle —
//! the file has one seek cursor, and concurrent seeks on it would race.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Result, StorageError};
use crate::types::{PageId, PAGE_SIZE};

/// Trait for page-granular disk I/O.
///
/// Abstracting this behind a trait lets the buffer pool be exercised against
/// a mock in tests without touching the filesystem.
pub trait DiskManager: Send + Sync {
    /// Read exactly `PAGE_SIZE` bytes for `page_id` into `buf`.
    ///
    /// Fails with [`StorageError::OutOfBounds`] if the offset is at or past
    /// the current file length.
    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()>;

    /// Write `buf` to `page_id`'s offset and flush to the OS.
    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Append a zero-filled page to the file and return its newly assigned id.
    fn allocate_page(&self) -> Result<PageId>;

    /// Close the file handle. Idempotent.
    fn shutdown(&self);
}

/// File-backed [`DiskManager`].
///
/// The file has no header, no checksums, and no metadata: its length is
/// always a multiple of `PAGE_SIZE`, and page `p` lives at byte range
/// `[p * PAGE_SIZE, (p + 1) * PAGE_SIZE)`.
pub struct FileDiskManager {
    file: Mutex<Option<File>>,
    /// Flush writes through to stable storage (`sync_data`) in addition to
    /// the OS-level flush every write already performs.
    sync_on_write: bool,
}

impl FileDiskManager {
    /// Open `path` for read/write, creating it empty if it does not exist.
    pub fn open(path: impl AsRef<Path>, sync_on_write: bool) -> Result<Self> {
        let path = path.as_ref();
        let existed = path.exists();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StorageError::OpenFailure {
                path: path.display().to_string(),
                source,
            })?;

        if !existed {
            log::info!("created new database file: {}", path.display());
        } else {
            log::debug!("opened existing database file: {}", path.display());
        }

        Ok(Self {
            file: Mutex::new(Some(file)),
            sync_on_write,
        })
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or_else(|| {
            StorageError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "disk manager has been shut down",
            ))
        })?;
        f(file)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        self.with_file(|file| {
            let offset = page_id.file_offset(PAGE_SIZE);
            let file_len = file.metadata()?.len();
            if offset >= file_len {
                return Err(StorageError::OutOfBounds(page_id));
            }

            file.seek(SeekFrom::Start(offset))?;
            if let Err(e) = file.read_exact(buf) {
                log::error!("I/O error reading page {}: {}", page_id, e);
                return Err(StorageError::IoFailure(e));
            }
            Ok(())
        })
    }

    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        self.with_file(|file| {
            let offset = page_id.file_offset(PAGE_SIZE);
            file.seek(SeekFrom::Start(offset))?;
            if let Err(e) = file.write_all(buf) {
                log::error!("I/O error writing page {}: {}", page_id, e);
                return Err(StorageError::IoFailure(e));
            }
            file.flush()?;
            if self.sync_on_write {
                file.sync_data()?;
            }
            Ok(())
        })
    }

    fn allocate_page(&self) -> Result<PageId> {
        self.with_file(|file| {
            let file_len = file.seek(SeekFrom::End(0))?;
            let next_id = PageId::new((file_len / PAGE_SIZE as u64) as u32);

            let zeros = [0u8; PAGE_SIZE];
            file.write_all(&zeros)?;
            file.flush()?;
            if self.sync_on_write {
                file.sync_data()?;
            }

            Ok(next_id)
        })
    }

    fn shutdown(&self) {
        let mut guard = self.file.lock();
        if guard.take().is_some() {
            log::debug!("disk manager shut down");
        }
    }
}
