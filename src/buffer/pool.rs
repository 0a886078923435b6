//! Buffer pool manager.
//!
//! Owns a fixed array of frames (never reallocated or moved for the life of
//! the pool), a page-id → frame-id map, a free-frame list, and an
//! [`LruReplacer`] for victim selection. Pool metadata (the map and free
//! list) is protected by a single mutex; each frame additionally carries its
//! own read/write latch so that a client holding a [`FrameRef`] can read or
//! write its bytes without serializing on the pool-wide lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::buffer::lru::LruReplacer;
use crate::storage::DiskManager;
use crate::types::{FrameId, PageId, PAGE_SIZE};

struct Frame {
    data: [u8; PAGE_SIZE],
    page_id: PageId,
    pin_count: u32,
    dirty: bool,
}

impl Frame {
    fn empty() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
            page_id: PageId::INVALID,
            pin_count: 0,
            dirty: false,
        }
    }
}

/// Pool metadata guarded by the pool-wide mutex: which page lives in which
/// frame, and which frames are currently unused.
struct PoolTable {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

/// A fixed-size in-memory cache of pages, backed by a [`DiskManager`].
pub struct BufferPoolManager {
    frames: Vec<RwLock<Frame>>,
    table: Mutex<PoolTable>,
    replacer: LruReplacer,
    disk_manager: Arc<dyn DiskManager>,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames backed by `disk_manager`.
    pub fn new(disk_manager: Arc<dyn DiskManager>, pool_size: usize) -> Self {
        let frames = (0..pool_size).map(|_| RwLock::new(Frame::empty())).collect();
        let free_list = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            table: Mutex::new(PoolTable {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
            }),
            replacer: LruReplacer::new(pool_size),
            disk_manager,
        }
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Acquire a frame to hold a new page identity: a free frame if one
    /// exists, otherwise an LRU victim (written back first if dirty).
    ///
    /// Does **not** remove the victim's old page id from the page table;
    /// callers decide the frame's new identity and must do that themselves.
    fn acquire_frame(&self, table: &mut PoolTable) -> Option<FrameId> {
        if let Some(frame_id) = table.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.victim()?;
        let mut frame = self.frames[frame_id.value()].write();
        if frame.dirty {
            match self.disk_manager.write_page(frame.page_id, &frame.data) {
                Ok(()) => frame.dirty = false,
                Err(e) => {
                    log::error!(
                        "eviction write-back failed for page {}: {}",
                        frame.page_id,
                        e
                    );
                    drop(frame);
                    // Leave the frame's identity untouched and put it back;
                    // it stays dirty and is not reused until a write-back
                    // succeeds.
                    self.replacer.unpin(frame_id);
                    return None;
                }
            }
        }
        Some(frame_id)
    }

    /// Fetch a page into the pool, pinning it. Returns `None` if the page
    /// is not already cached and no frame (free or evictable) is available,
    /// or if reading it from disk fails.
    pub fn fetch_page(&self, page_id: PageId) -> Option<FrameRef<'_>> {
        let mut table = self.table.lock();

        if let Some(&frame_id) = table.page_table.get(&page_id) {
            self.frames[frame_id.value()].write().pin_count += 1;
            self.replacer.pin(frame_id);
            return Some(FrameRef {
                pool: self,
                frame_id,
                page_id,
            });
        }

        let frame_id = self.acquire_frame(&mut table)?;
        let mut frame = self.frames[frame_id.value()].write();
        if frame.page_id.is_valid() {
            table.page_table.remove(&frame.page_id);
        }

        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.dirty = false;

        if let Err(e) = self.disk_manager.read_page(page_id, &mut frame.data) {
            log::warn!("fetch_page({}) failed to read from disk: {}", page_id, e);
            frame.page_id = PageId::INVALID;
            frame.pin_count = 0;
            drop(frame);
            table.free_list.push_back(frame_id);
            return None;
        }

        drop(frame);
        table.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Some(FrameRef {
            pool: self,
            frame_id,
            page_id,
        })
    }

    /// Allocate a new page on disk and pin it into the pool.
    pub fn new_page(&self) -> Option<(PageId, FrameRef<'_>)> {
        let mut table = self.table.lock();
        let frame_id = self.acquire_frame(&mut table)?;

        // Evict the frame's old identity from the page table up front, before
        // attempting the disk I/O that can fail — mirroring `fetch_page`.
        // Otherwise a failed `allocate_page` below would leave this frame on
        // the free list while `page_table` still mapped its old page id to
        // it, putting the frame in two states (free and evictable) at once.
        {
            let mut frame = self.frames[frame_id.value()].write();
            if frame.page_id.is_valid() {
                table.page_table.remove(&frame.page_id);
            }
            frame.page_id = PageId::INVALID;
        }

        let page_id = match self.disk_manager.allocate_page() {
            Ok(id) => id,
            Err(e) => {
                log::error!("new_page failed to allocate on disk: {}", e);
                table.free_list.push_back(frame_id);
                return None;
            }
        };

        let mut frame = self.frames[frame_id.value()].write();
        frame.data.fill(0);
        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.dirty = false;
        drop(frame);

        table.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        Some((
            page_id,
            FrameRef {
                pool: self,
                frame_id,
                page_id,
            },
        ))
    }

    /// Release one pin on `page_id`. `is_dirty` is OR-ed onto the frame's
    /// sticky dirty flag. Returns `false` if the page isn't in the pool or
    /// its pin count is already zero (a client logic error).
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let table = self.table.lock();
        let Some(&frame_id) = table.page_table.get(&page_id) else {
            return false;
        };

        let mut frame = self.frames[frame_id.value()].write();
        if frame.pin_count == 0 {
            return false;
        }

        frame.dirty |= is_dirty;
        frame.pin_count -= 1;
        let became_evictable = frame.pin_count == 0;
        drop(frame);
        drop(table);

        if became_evictable {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Force a page's frame to disk, regardless of pin state. Does not
    /// affect pin count or replacer membership. Returns `false` if the page
    /// isn't in the pool, or if the write fails.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let table = self.table.lock();
        let Some(&frame_id) = table.page_table.get(&page_id) else {
            return false;
        };

        let mut frame = self.frames[frame_id.value()].write();
        debug_assert_eq!(frame.page_id, page_id, "frame no longer holds this page");
        match self.disk_manager.write_page(page_id, &frame.data) {
            Ok(()) => {
                frame.dirty = false;
                true
            }
            Err(e) => {
                log::error!("flush_page({}) failed: {}", page_id, e);
                false
            }
        }
    }

    /// Flush every dirty frame currently in the pool.
    pub fn flush_all(&self) -> bool {
        let table = self.table.lock();
        let page_ids: Vec<PageId> = table.page_table.keys().copied().collect();
        drop(table);

        let mut all_ok = true;
        for page_id in page_ids {
            if !self.flush_page(page_id) {
                all_ok = false;
            }
        }
        all_ok
    }

    /// Remove a page from the in-memory pool only (the on-disk contents are
    /// untouched). Rejects the request while the page is pinned, and
    /// returns `false` if the page is not in the pool.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut table = self.table.lock();
        let Some(&frame_id) = table.page_table.get(&page_id) else {
            return false;
        };

        let mut frame = self.frames[frame_id.value()].write();
        if frame.pin_count > 0 {
            return false;
        }

        self.replacer.pin(frame_id); // drop any evictable-set membership
        table.page_table.remove(&page_id);
        frame.page_id = PageId::INVALID;
        frame.dirty = false;
        drop(frame);
        table.free_list.push_back(frame_id);
        true
    }
}

/// A pinned reference to a frame's bytes, returned by `fetch_page`/`new_page`.
///
/// Holding a `FrameRef` does not by itself release the pin — callers must
/// call [`BufferPoolManager::unpin_page`] exactly once per successful fetch,
/// mirroring the pin/unpin discipline exercised directly by callers. Byte access goes through guarded, bounds-checked views rather
/// than a raw pointer into the frame.
pub struct FrameRef<'a> {
    pool: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
}

impl<'a> FrameRef<'a> {
    /// The page id this frame currently holds.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The frame slot backing this page.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Borrow the frame's bytes for reading.
    pub fn read(&self) -> MappedRwLockReadGuard<'_, [u8; PAGE_SIZE]> {
        RwLockReadGuard::map(self.pool.frames[self.frame_id.value()].read(), |f| &f.data)
    }

    /// Borrow the frame's bytes for writing.
    ///
    /// This does not itself mark the frame dirty — dirtiness is announced
    /// through `unpin_page`'s `is_dirty` argument.
    pub fn write(&self) -> MappedRwLockWriteGuard<'_, [u8; PAGE_SIZE]> {
        RwLockWriteGuard::map(self.pool.frames[self.frame_id.value()].write(), |f| {
            &mut f.data
        })
    }
}
