//! Buffer pool: the cache coherency point between clients and disk.
//!
//! Caches pages in a fixed set of in-memory frames, tracks pin counts,
//! writes dirty pages back on eviction, and picks victims via an
//! [`lru::LruReplacer`].

mod lru;
mod pool;

pub use lru::LruReplacer;
pub use pool::{BufferPoolManager, FrameRef};
