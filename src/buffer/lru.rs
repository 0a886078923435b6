//! LRU replacer: the ordered set of frames currently eligible for eviction.
//!
//! Insertion order into the replacer *is* the LRU order — there is no
//! reference-bit update on repeated access to an already-pinned frame.
//! Pinned frames are simply outside the replacer's universe; a frame
//! re-entering after a pin/unpin cycle is treated as most recently used.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::FrameId;

struct Node {
    frame_id: FrameId,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    capacity: usize,
    arena: Vec<Node>,
    index: HashMap<FrameId, usize>,
    free_slots: Vec<usize>,
    head: Option<usize>, // least recently used
    tail: Option<usize>, // most recently used
}

impl Inner {
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.arena[slot].prev, self.arena[slot].next);
        match prev {
            Some(p) => self.arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.arena[n].prev = prev,
            None => self.tail = prev,
        }
    }
}

/// Tracks evictable frames in least-recently-used order with O(1)
/// `pin`/`unpin`/`victim`/`size`.
///
/// Guarded by its own mutex; the buffer pool additionally
/// serializes through its own mutex in normal use, so contention on this
/// lock in practice is never more than two threads deep.
pub struct LruReplacer {
    inner: Mutex<Inner>,
}

impl LruReplacer {
    /// Create a replacer that tracks at most `capacity` frames at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                capacity,
                arena: Vec::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
                free_slots: Vec::new(),
                head: None,
                tail: None,
            }),
        }
    }

    /// Mark `frame_id` evictable. No-op if already tracked or if the
    /// replacer is already at capacity (should not occur when capacity
    /// equals the pool size, since a frame can't be double-unpinned past
    /// zero without the buffer pool rejecting it first).
    pub fn unpin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if inner.index.contains_key(&frame_id) {
            return;
        }
        if inner.index.len() >= inner.capacity {
            return;
        }

        let slot = if let Some(slot) = inner.free_slots.pop() {
            inner.arena[slot] = Node {
                frame_id,
                prev: inner.tail,
                next: None,
            };
            slot
        } else {
            let slot = inner.arena.len();
            inner.arena.push(Node {
                frame_id,
                prev: inner.tail,
                next: None,
            });
            slot
        };

        if let Some(tail) = inner.tail {
            inner.arena[tail].next = Some(slot);
        } else {
            inner.head = Some(slot);
        }
        inner.tail = Some(slot);
        inner.index.insert(frame_id, slot);
    }

    /// Remove `frame_id` from the evictable set, if present. No-op otherwise.
    pub fn pin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.index.remove(&frame_id) {
            inner.unlink(slot);
            inner.free_slots.push(slot);
        }
    }

    /// Remove and return the least recently used frame, or `None` if empty.
    pub fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let slot = inner.head?;
        let frame_id = inner.arena[slot].frame_id;
        inner.unlink(slot);
        inner.index.remove(&frame_id);
        inner.free_slots.push(slot);
        Some(frame_id)
    }

    /// Number of frames currently tracked as evictable.
    pub fn size(&self) -> usize {
        self.inner.lock().index.len()
    }
}
