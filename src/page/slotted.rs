//! Slotted page: variable-length tuples packed into a fixed-size buffer.
//!
//! ```text
//!  byte 0                                                         byte 16384
//!  ┌─────────┬────────────────────┬ ... free ... ┬────────────────┐
//!  │ Header  │ Slot[0] Slot[1] …  │              │ ... tuples ... │
//!  └─────────┴────────────────────┴──────────────┴────────────────┘
//!            ^ grows forward                                   ^ grows backward
//!                                  free_space_pointer ────────┘
//! ```
//!
//! This is a *view*, not an owning type: it borrows a frame's byte buffer
//! for the duration of a single operation rather than wrapping a "page
//! object" of its own, so layout concerns here stay separate from the
//! buffer pool's caching concerns.

use crate::error::{Result, StorageError};
use crate::page::header::{PageHeader, HEADER_SIZE};
use crate::types::{PageId, PAGE_SIZE};

/// Size in bytes of one slot-directory entry: a `u16` offset and a `u16`
/// length (0 ⇒ soft-deleted).
pub const SLOT_SIZE: usize = 4;

/// A slotted-page view over a borrowed page-sized byte buffer.
pub struct SlottedPage<'a> {
    data: &'a mut [u8],
}

impl<'a> SlottedPage<'a> {
    /// Wrap an existing page buffer (already initialized, or about to be
    /// via [`Self::init`]).
    ///
    /// Does not validate the header. Use this right after a caller has
    /// handed in a freshly zeroed frame for [`Self::init`] to write into —
    /// a zeroed buffer has `free_space_pointer = 0`, which is not itself a
    /// valid (post-`init`) header, so an up-front check here would reject
    /// every page before it has been initialized. To load a page that is
    /// expected to already hold a valid header (e.g. one fetched back from
    /// disk), use [`Self::open`] instead.
    pub fn new(data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= PAGE_SIZE);
        Self { data }
    }

    /// Wrap a page buffer that is expected to already hold a valid slotted
    /// page header, validating it first.
    ///
    /// Returns [`StorageError::Corruption`] if `header_size + num_slots *
    /// slot_size > free_space_pointer` or `free_space_pointer > PAGE_SIZE`
    /// — the invariant that every live slot's data lies strictly between
    /// the slot directory and the end of the page. This
    /// is the crate's only defense against a page that was never
    /// initialized, or whose bytes were otherwise corrupted, being
    /// interpreted as having a free span it doesn't actually have (there
    /// are no on-disk checksums to catch that earlier).
    pub fn open(data: &'a mut [u8]) -> Result<Self> {
        debug_assert!(data.len() >= PAGE_SIZE);
        let page = Self { data };
        page.validate()?;
        Ok(page)
    }

    fn validate(&self) -> Result<()> {
        let header = self.header();
        let slot_array_end = HEADER_SIZE + header.num_slots as usize * SLOT_SIZE;
        if header.free_space_pointer as usize > PAGE_SIZE {
            return Err(StorageError::Corruption(format!(
                "free_space_pointer {} exceeds page size {}",
                header.free_space_pointer, PAGE_SIZE
            )));
        }
        if slot_array_end > header.free_space_pointer as usize {
            return Err(StorageError::Corruption(format!(
                "slot directory end {} overruns free_space_pointer {}",
                slot_array_end, header.free_space_pointer
            )));
        }
        Ok(())
    }

    /// Write a fresh header: zero slots, a full page of free space, and the
    /// given neighbor links. Does not zero the rest of the buffer — the
    /// caller is expected to hand in an already-zeroed page, as
    /// `BufferPoolManager::new_page` does.
    pub fn init(&mut self, prev_page_id: PageId, next_page_id: PageId) {
        let header = PageHeader {
            next_page_id,
            prev_page_id,
            num_slots: 0,
            free_space_pointer: PAGE_SIZE as u16,
        };
        header.write(self.data);
    }

    fn header(&self) -> PageHeader {
        PageHeader::read(self.data)
    }

    fn write_header(&mut self, header: &PageHeader) {
        header.write(self.data);
    }

    /// Number of slots ever assigned on this page (including deleted ones).
    pub fn num_slots(&self) -> u16 {
        self.header().num_slots
    }

    /// Byte offset of the start of the most recently inserted tuple.
    pub fn free_space_pointer(&self) -> u16 {
        self.header().free_space_pointer
    }

    pub fn prev_page_id(&self) -> PageId {
        self.header().prev_page_id
    }

    pub fn next_page_id(&self) -> PageId {
        self.header().next_page_id
    }

    pub fn set_prev_page_id(&mut self, page_id: PageId) {
        let mut header = self.header();
        header.prev_page_id = page_id;
        self.write_header(&header);
    }

    pub fn set_next_page_id(&mut self, page_id: PageId) {
        let mut header = self.header();
        header.next_page_id = page_id;
        self.write_header(&header);
    }

    fn slot_offset_of(index: u16) -> usize {
        HEADER_SIZE + index as usize * SLOT_SIZE
    }

    /// `(offset, length)` of slot `index`. Panics if `index >= num_slots`;
    /// callers must bounds-check first (all public accessors below do).
    fn read_slot(&self, index: u16) -> (u16, u16) {
        let at = Self::slot_offset_of(index);
        let offset = u16::from_le_bytes(self.data[at..at + 2].try_into().unwrap());
        let length = u16::from_le_bytes(self.data[at + 2..at + 4].try_into().unwrap());
        (offset, length)
    }

    fn write_slot(&mut self, index: u16, offset: u16, length: u16) {
        let at = Self::slot_offset_of(index);
        self.data[at..at + 2].copy_from_slice(&offset.to_le_bytes());
        self.data[at + 2..at + 4].copy_from_slice(&length.to_le_bytes());
    }

    /// Bytes free for a new tuple plus its slot entry.
    pub fn free_space_remaining(&self) -> usize {
        let header = self.header();
        let slot_array_end = HEADER_SIZE + header.num_slots as usize * SLOT_SIZE;
        (header.free_space_pointer as usize).saturating_sub(slot_array_end)
    }

    /// Append `bytes` as a new tuple. Returns the newly assigned (stable)
    /// slot id, or `None` if the page doesn't have `bytes.len() + SLOT_SIZE`
    /// bytes free.
    pub fn insert_tuple(&mut self, bytes: &[u8]) -> Option<u16> {
        let needed = bytes.len() + SLOT_SIZE;
        if needed > self.free_space_remaining() {
            return None;
        }

        let mut header = self.header();
        let new_fsp = header.free_space_pointer - bytes.len() as u16;
        let start = new_fsp as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);

        let slot_id = header.num_slots;
        self.write_slot(slot_id, new_fsp, bytes.len() as u16);

        header.free_space_pointer = new_fsp;
        header.num_slots += 1;
        self.write_header(&header);

        Some(slot_id)
    }

    /// Fetch a copy of the tuple at `slot_id`, or `None` if the slot id is
    /// out of range or the slot has been soft-deleted.
    pub fn get_tuple(&self, slot_id: u16) -> Option<Vec<u8>> {
        if slot_id >= self.num_slots() {
            return None;
        }
        let (offset, length) = self.read_slot(slot_id);
        if length == 0 {
            return None;
        }
        let start = offset as usize;
        Some(self.data[start..start + length as usize].to_vec())
    }

    /// Soft-delete `slot_id`: zero its offset/length without moving or
    /// compacting tuple data, and without reusing the slot id. Returns
    /// `false` if the slot id is out of range or already deleted.
    pub fn mark_delete(&mut self, slot_id: u16) -> bool {
        if slot_id >= self.num_slots() {
            return false;
        }
        let (_offset, length) = self.read_slot(slot_id);
        if length == 0 {
            return false;
        }
        self.write_slot(slot_id, 0, 0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_page() -> [u8; PAGE_SIZE] {
        [0u8; PAGE_SIZE]
    }

    /// Insert/read on an empty page.
    #[test]
    fn insert_and_read_on_empty_page() {
        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::INVALID, PageId::INVALID);

        let slot0 = page.insert_tuple(b"Hello World!\0").unwrap();
        assert_eq!(slot0, 0);
        assert_eq!(page.num_slots(), 1);
        assert_eq!(page.free_space_pointer(), (PAGE_SIZE - 13) as u16);
        assert_eq!(page.read_slot(0), ((PAGE_SIZE - 13) as u16, 13));

        let slot1 = page.insert_tuple(b"Second Tuple\0").unwrap();
        assert_eq!(slot1, 1);
        assert_eq!(page.read_slot(1).0, (PAGE_SIZE - 13 - 13) as u16);

        assert_eq!(page.get_tuple(0).unwrap(), b"Hello World!\0");
        assert_eq!(page.get_tuple(1).unwrap(), b"Second Tuple\0");
    }

    /// Soft delete preserves other slots.
    #[test]
    fn soft_delete_preserves_other_slots() {
        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::INVALID, PageId::INVALID);

        page.insert_tuple(b"Data 1\0").unwrap();
        page.insert_tuple(b"Data 222\0").unwrap();
        page.insert_tuple(b"Data 33333\0").unwrap();

        assert!(page.mark_delete(1));
        assert_eq!(page.get_tuple(1), None);
        assert_eq!(page.get_tuple(0).unwrap(), b"Data 1\0");
        assert_eq!(page.get_tuple(2).unwrap(), b"Data 33333\0");

        assert!(!page.mark_delete(1));
    }

    #[test]
    fn open_accepts_a_freshly_initialized_page() {
        let mut buf = fresh_page();
        {
            let mut page = SlottedPage::new(&mut buf);
            page.init(PageId::INVALID, PageId::INVALID);
            page.insert_tuple(b"hi\0").unwrap();
        }
        assert!(SlottedPage::open(&mut buf).is_ok());
    }

    #[test]
    fn open_rejects_an_unitialized_zeroed_page() {
        let mut buf = fresh_page();
        let err = SlottedPage::open(&mut buf).unwrap_err();
        assert!(matches!(err, crate::error::StorageError::Corruption(_)));
    }

    #[test]
    fn open_rejects_free_space_pointer_past_page_size() {
        let mut buf = fresh_page();
        {
            let mut page = SlottedPage::new(&mut buf);
            page.init(PageId::INVALID, PageId::INVALID);
        }
        // Corrupt the header directly: free_space_pointer beyond PAGE_SIZE.
        buf[10..12].copy_from_slice(&(PAGE_SIZE as u16 + 1).to_le_bytes());
        let err = SlottedPage::open(&mut buf).unwrap_err();
        assert!(matches!(err, crate::error::StorageError::Corruption(_)));
    }

    #[test]
    fn get_tuple_out_of_range_is_none() {
        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::INVALID, PageId::INVALID);
        assert_eq!(page.get_tuple(0), None);
    }

    #[test]
    fn insert_fails_when_page_is_full() {
        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::INVALID, PageId::INVALID);

        let tuple = vec![0u8; 100];
        let mut inserted = 0;
        while page.insert_tuple(&tuple).is_some() {
            inserted += 1;
        }
        assert!(inserted > 0);
        assert!(page.insert_tuple(&tuple).is_none());

        // header invariant still holds
        let slot_array_end = HEADER_SIZE + page.num_slots() as usize * SLOT_SIZE;
        assert!(page.free_space_pointer() as usize >= slot_array_end);
    }

    #[test]
    fn init_does_not_clobber_neighbor_links_after_set() {
        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::new(3), PageId::new(5));
        assert_eq!(page.prev_page_id(), PageId::new(3));
        assert_eq!(page.next_page_id(), PageId::new(5));

        page.set_next_page_id(PageId::new(9));
        assert_eq!(page.next_page_id(), PageId::new(9));
        assert_eq!(page.prev_page_id(), PageId::new(3));
    }

    #[test]
    fn stress_random_insert_delete_preserves_live_slot_contents() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::HashMap;

        let mut buf = fresh_page();
        let mut page = SlottedPage::new(&mut buf);
        page.init(PageId::INVALID, PageId::INVALID);

        let mut rng = StdRng::seed_from_u64(42);
        let mut live: HashMap<u16, Vec<u8>> = HashMap::new();

        for _ in 0..500 {
            if live.is_empty() || rng.gen_bool(0.6) {
                let len = rng.gen_range(1..64);
                let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
                if let Some(slot_id) = page.insert_tuple(&bytes) {
                    live.insert(slot_id, bytes);
                }
            } else {
                let slot_id = *live.keys().next().unwrap();
                assert!(page.mark_delete(slot_id));
                live.remove(&slot_id);
            }

            for (&slot_id, expected) in &live {
                assert_eq!(page.get_tuple(slot_id).as_ref(), Some(expected));
            }
            let slot_array_end = HEADER_SIZE + page.num_slots() as usize * SLOT_SIZE;
            assert!(page.free_space_pointer() as usize >= slot_array_end);
        }
    }
}
