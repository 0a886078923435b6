//! # paged-storage
//!
//! The core of an on-disk relational storage engine: a fixed-size paged
//! store backed by a single file, a buffer pool with LRU eviction and
//! pin-based concurrency control, and a slotted-page row format for
//! variable-size tuples with soft-deletion semantics.
//!
//! This crate is the foundational layer on which higher-level database
//! functionality (tables, indexes, query execution, transactions, recovery)
//! would be built — none of that lives here.
//!
//! ## Architecture
//!
//! - [`storage`] — the disk manager: byte-level persistence of fixed-size
//!   pages to a single file.
//! - [`buffer`] — the buffer pool manager: an LRU-backed cache of pages in
//!   memory, with pin-counted concurrency control.
//! - [`page`] — the slotted page view: variable-length tuples packed into a
//!   page's byte buffer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paged_storage::{Config, StorageEngine};
//!
//! let config = Config::new("my_database.db").pool_size(64);
//! let engine = StorageEngine::open(config)?;
//!
//! let (page_id, frame) = engine.pool().new_page().expect("pool exhausted");
//! frame.write()[0..5].copy_from_slice(b"hello");
//! drop(frame);
//! engine.pool().unpin_page(page_id, true);
//! # Ok::<(), paged_storage::StorageError>(())
//! ```

pub mod buffer;
pub mod error;
pub mod page;
pub mod storage;
pub mod types;

pub use buffer::{BufferPoolManager, FrameRef};
pub use error::{Result, StorageError};
pub use page::SlottedPage;
pub use storage::{DiskManager, FileDiskManager};
pub use types::{FrameId, PageId, PAGE_SIZE};

use std::path::PathBuf;
use std::sync::Arc;

/// Tunables for opening a store: a file path, how many frames the buffer
/// pool holds, and whether writes flush through to stable storage
/// immediately.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the backing file.
    pub path: PathBuf,
    /// Number of frames in the buffer pool.
    pub pool_size: usize,
    /// Whether the disk manager calls `sync_data` after every write, on top
    /// of the OS-level flush every write already performs.
    pub sync_on_write: bool,
}

impl Config {
    /// Start from a path with sensible defaults (64 frames, no extra sync).
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            pool_size: 64,
            sync_on_write: false,
        }
    }

    /// Set the number of frames in the buffer pool.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Enable `sync_data` after every write.
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }
}

/// A thin facade wiring a [`DiskManager`] and [`BufferPoolManager`] together
/// behind a [`Config`], so callers don't have to hand-assemble the two
/// components. Adds no table, schema, or query layer — that stays out of
/// scope for this crate.
pub struct StorageEngine {
    pool: BufferPoolManager,
    disk_manager: Arc<dyn DiskManager>,
}

impl StorageEngine {
    /// Open (creating if necessary) the file named in `config` and build a
    /// buffer pool over it.
    pub fn open(config: Config) -> Result<Self> {
        let disk_manager: Arc<dyn DiskManager> = Arc::new(FileDiskManager::open(
            &config.path,
            config.sync_on_write,
        )?);
        let pool = BufferPoolManager::new(disk_manager.clone(), config.pool_size);
        Ok(Self { pool, disk_manager })
    }

    /// The buffer pool, through which all page access happens.
    pub fn pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    /// Flush every dirty page and close the backing file handle.
    pub fn shutdown(&self) {
        self.pool.flush_all();
        self.disk_manager.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file_and_serves_pages() {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::open(Config::new(dir.path().join("test.db"))).unwrap();

        let (page_id, frame) = engine.pool().new_page().unwrap();
        frame.write()[0..5].copy_from_slice(b"hello");
        drop(frame);
        assert!(engine.pool().unpin_page(page_id, true));

        engine.shutdown();
    }

    #[test]
    fn data_survives_a_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let page_id = {
            let engine = StorageEngine::open(Config::new(&path).pool_size(2)).unwrap();
            let (page_id, frame) = engine.pool().new_page().unwrap();
            frame.write()[0..5].copy_from_slice(b"world");
            drop(frame);
            engine.pool().unpin_page(page_id, true);
            engine.shutdown();
            page_id
        };

        let engine = StorageEngine::open(Config::new(&path).pool_size(2)).unwrap();
        let frame = engine.pool().fetch_page(page_id).unwrap();
        assert_eq!(&frame.read()[0..5], b"world");
    }
}
