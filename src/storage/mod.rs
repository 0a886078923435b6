//! Storage layer: synchronous, page-granular disk I/O.
//!
//! A single binary file backs the store. Its length is always a multiple of
//! [`PAGE_SIZE`](crate::types::PAGE_SIZE); there is no file header, no
//! checksums, and no multi-file support — the byte range
//! `[page_id * PAGE_SIZE, (page_id + 1) * PAGE_SIZE)` *is* the page.

mod disk_manager;

pub use disk_manager::{DiskManager, FileDiskManager};
