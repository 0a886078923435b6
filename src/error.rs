//! Error types for the storage engine.
//!
//! Most public operations follow a "no exceptions propagate" policy and
//! return `bool`/`Option` rather than `Result` (see the operation docs on
//! [`crate::buffer::BufferPoolManager`] and [`crate::page::SlottedPage`]).
//! `StorageError` covers the genuinely fatal failure (opening the backing
//! file) and is also used internally to carry I/O failures up to the point
//! where they get folded into a negative result.

use thiserror::Error;

use crate::types::PageId;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors produced by the storage core.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A page id was not present in the buffer pool's page table.
    #[error("page {0} not found in buffer pool")]
    NotFound(PageId),

    /// The buffer pool had no free frame and no evictable frame to give up.
    #[error("no evictable frame available: all frames pinned")]
    NoVictim,

    /// `unpin_page` was called on a frame whose pin count was already zero.
    #[error("pin count underflow for page {0}")]
    PinCountUnderflow(PageId),

    /// A read was attempted at or past the end of the backing file.
    #[error("page {0} is out of bounds of the backing file")]
    OutOfBounds(PageId),

    /// The underlying file read or write failed.
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// `insert_tuple` requested more space than the page has free.
    #[error("insufficient space: needed {needed} bytes, {available} available")]
    InsufficientSpace { needed: usize, available: usize },

    /// The disk manager could not create or open its backing file.
    #[error("failed to open database file {path}: {source}")]
    OpenFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A page's header was read and its fields violate the slotted-page
    /// invariants (e.g. `free_space_pointer` outside `[header_size +
    /// num_slots * slot_size, PAGE_SIZE]`). Surfaced by
    /// [`crate::page::SlottedPage::open`] so a malformed or garbage page
    /// can never be interpreted as one with a larger free span than it
    /// actually has.
    #[error("corrupt page header: {0}")]
    Corruption(String),
}
