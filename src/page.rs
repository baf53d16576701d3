use byteorder::{ByteOrder, LittleEndian};

use crate::key_value_pair::KeyValuePair;
use crate::node_type::NodeType;
use crate::page_layout::{
    HEADER_SIZE, KEY_COUNT_OFFSET, KV_HEADER_SIZE, NODE_TYPE_OFFSET, OFFSET_SIZE, PTR_SIZE,
};

/// Opaque page identifier handed out by a page store. Zero never names a page.
pub type PageId = u64;

/// Page is a wrapper for a single node's bytes providing bounds-checked
/// access to the header, pointer table, offset table and key-value area.
///
/// Every accessor panics when an index exceeds the key count or a computed
/// position falls outside the buffer: either means the page is corrupt or the
/// caller is broken, and carrying on would corrupt the tree.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// A zeroed buffer of `size` bytes.
    pub fn new(size: usize) -> Page {
        Page {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn from_bytes(data: impl Into<Box<[u8]>>) -> Page {
        Page { data: data.into() }
    }

    /// Buffer length, which bounds `used_bytes`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.data
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::from(LittleEndian::read_u16(&self.data[NODE_TYPE_OFFSET..]))
    }

    pub fn key_count(&self) -> usize {
        LittleEndian::read_u16(&self.data[KEY_COUNT_OFFSET..]) as usize
    }

    /// Writes the header. The rest of the buffer must be filled in to match.
    pub fn set_header(&mut self, node_type: NodeType, key_count: usize) {
        assert!(key_count <= u16::MAX as usize, "key count {} overflows", key_count);
        LittleEndian::write_u16(&mut self.data[NODE_TYPE_OFFSET..], node_type.into());
        LittleEndian::write_u16(&mut self.data[KEY_COUNT_OFFSET..], key_count as u16);
    }

    pub fn child_pointer(&self, idx: usize) -> PageId {
        self.check_index(idx);
        LittleEndian::read_u64(&self.data[Self::pointer_position(idx)..])
    }

    pub fn set_child_pointer(&mut self, idx: usize, id: PageId) {
        self.check_index(idx);
        let pos = Self::pointer_position(idx);
        LittleEndian::write_u64(&mut self.data[pos..], id);
    }

    /// Cumulative KV-area offset of entry `idx`; entry 0 starts at offset 0.
    pub fn offset(&self, idx: usize) -> usize {
        if idx == 0 {
            return 0;
        }
        LittleEndian::read_u16(&self.data[self.offset_position(idx)..]) as usize
    }

    pub fn set_offset(&mut self, idx: usize, offset: usize) {
        assert!(offset <= u16::MAX as usize, "offset {} overflows", offset);
        let pos = self.offset_position(idx);
        LittleEndian::write_u16(&mut self.data[pos..], offset as u16);
    }

    /// Byte position where entry `idx`'s length-prefixed payload begins.
    /// `entry_position(key_count())` marks the end of the used KV area.
    pub fn entry_position(&self, idx: usize) -> usize {
        let nkeys = self.key_count();
        assert!(idx <= nkeys, "entry {} out of range for {} keys", idx, nkeys);
        self.kv_area_start() + self.offset(idx)
    }

    pub fn key(&self, idx: usize) -> &[u8] {
        self.check_index(idx);
        let pos = self.entry_position(idx);
        let klen = LittleEndian::read_u16(&self.data[pos..]) as usize;
        let start = pos + KV_HEADER_SIZE;
        &self.data[start..start + klen]
    }

    pub fn value(&self, idx: usize) -> &[u8] {
        self.check_index(idx);
        let pos = self.entry_position(idx);
        let klen = LittleEndian::read_u16(&self.data[pos..]) as usize;
        let vlen = LittleEndian::read_u16(&self.data[pos + 2..]) as usize;
        let start = pos + KV_HEADER_SIZE + klen;
        &self.data[start..start + vlen]
    }

    /// Total bytes consumed by a well-formed page.
    pub fn used_bytes(&self) -> usize {
        self.entry_position(self.key_count())
    }

    /// Returns the largest index whose key is <= `key`.
    ///
    /// Index 0 is never compared: it is either the sentinel or the key that
    /// routed the search into this page, so it is always <= `key`.
    pub fn lookup_le(&self, key: &[u8]) -> usize {
        // Keys in [1, lo) are <= key, keys in [hi, nkeys) are > key.
        let (mut lo, mut hi) = (1, self.key_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo - 1
    }

    pub fn key_value_pairs(&self) -> Vec<KeyValuePair> {
        (0..self.key_count())
            .map(|idx| KeyValuePair::new(self.key(idx), self.value(idx)))
            .collect()
    }

    /// Shrinks a scratch buffer to `len` bytes, the size of a committed page.
    pub fn truncate(self, len: usize) -> Page {
        let used = self.used_bytes();
        assert!(used <= len, "page uses {} bytes, cannot truncate to {}", used, len);
        let mut data = self.data.into_vec();
        data.resize(len, 0);
        Page::from_bytes(data)
    }

    /// Writes a length-prefixed key and value at `pos`.
    pub(crate) fn write_kv(&mut self, pos: usize, key: &[u8], value: &[u8]) {
        LittleEndian::write_u16(&mut self.data[pos..], key.len() as u16);
        LittleEndian::write_u16(&mut self.data[pos + 2..], value.len() as u16);
        let start = pos + KV_HEADER_SIZE;
        self.data[start..start + key.len()].copy_from_slice(key);
        self.data[start + key.len()..start + key.len() + value.len()].copy_from_slice(value);
    }

    /// Copies the child pointers of `src[src_idx..src_idx + count]`.
    pub(crate) fn copy_pointers(&mut self, dst_idx: usize, src: &Page, src_idx: usize, count: usize) {
        let from = Self::pointer_position(src_idx);
        let to = Self::pointer_position(dst_idx);
        let len = count * PTR_SIZE;
        self.data[to..to + len].copy_from_slice(&src.data[from..from + len]);
    }

    /// Copies `len` raw bytes starting at `src_pos` in `src` to `dst_pos`.
    pub(crate) fn copy_bytes(&mut self, dst_pos: usize, src: &Page, src_pos: usize, len: usize) {
        self.data[dst_pos..dst_pos + len].copy_from_slice(&src.data[src_pos..src_pos + len]);
    }

    fn check_index(&self, idx: usize) {
        let nkeys = self.key_count();
        assert!(idx < nkeys, "index {} out of range for {} keys", idx, nkeys);
    }

    fn pointer_position(idx: usize) -> usize {
        HEADER_SIZE + PTR_SIZE * idx
    }

    fn offset_position(&self, idx: usize) -> usize {
        let nkeys = self.key_count();
        assert!(
            1 <= idx && idx <= nkeys,
            "offset {} out of range for {} keys",
            idx,
            nkeys
        );
        HEADER_SIZE + PTR_SIZE * nkeys + OFFSET_SIZE * (idx - 1)
    }

    fn kv_area_start(&self) -> usize {
        HEADER_SIZE + (PTR_SIZE + OFFSET_SIZE) * self.key_count()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("node_type", &self.node_type())
            .field("key_count", &self.key_count())
            .field("len", &self.len())
            .finish()
    }
}
