//! Copy-on-write page construction.
//!
//! Every builder reads from an immutable source page and writes into a fresh
//! output page; sources are never modified.

use crate::key_value_pair::KeyValuePair;
use crate::node_type::NodeType;
use crate::page::{Page, PageId};
use crate::page_layout::{HEADER_SIZE, KV_HEADER_SIZE, OFFSET_SIZE, PTR_SIZE};
use crate::pager::PageStore;

/// Writes entry `idx` of `dst`. Entries must be appended in increasing index
/// order into a page whose header already carries the final key count.
pub fn append_entry(dst: &mut Page, idx: usize, child: PageId, key: &[u8], value: &[u8]) {
    dst.set_child_pointer(idx, child);
    let pos = dst.entry_position(idx);
    dst.write_kv(pos, key, value);
    dst.set_offset(idx + 1, dst.offset(idx) + KV_HEADER_SIZE + key.len() + value.len());
}

/// Copies `count` consecutive entries of `src` starting at `src_idx` into
/// `dst` starting at `dst_idx`.
pub fn append_range(dst: &mut Page, src: &Page, dst_idx: usize, src_idx: usize, count: usize) {
    assert!(
        dst_idx + count <= dst.key_count() && src_idx + count <= src.key_count(),
        "range out of bounds"
    );
    if count == 0 {
        return;
    }

    dst.copy_pointers(dst_idx, src, src_idx, count);

    // Offsets are rebased onto what dst already holds.
    let dst_base = dst.offset(dst_idx);
    let src_base = src.offset(src_idx);
    for i in 1..=count {
        dst.set_offset(dst_idx + i, dst_base + src.offset(src_idx + i) - src_base);
    }

    let src_pos = src.entry_position(src_idx);
    let len = src.entry_position(src_idx + count) - src_pos;
    let dst_pos = dst.entry_position(dst_idx);
    dst.copy_bytes(dst_pos, src, src_pos, len);
}

/// Builds a leaf with `key`/`value` inserted at position `idx`.
pub fn leaf_insert(dst: &mut Page, src: &Page, idx: usize, key: &[u8], value: &[u8]) {
    let nkeys = src.key_count();
    dst.set_header(NodeType::Leaf, nkeys + 1);
    append_range(dst, src, 0, 0, idx);
    append_entry(dst, idx, 0, key, value);
    append_range(dst, src, idx + 1, idx, nkeys - idx);
}

/// Builds a leaf with entry `idx` replaced by `key`/`value`.
pub fn leaf_update(dst: &mut Page, src: &Page, idx: usize, key: &[u8], value: &[u8]) {
    let nkeys = src.key_count();
    dst.set_header(NodeType::Leaf, nkeys);
    append_range(dst, src, 0, 0, idx);
    append_entry(dst, idx, 0, key, value);
    append_range(dst, src, idx + 1, idx + 1, nkeys - idx - 1);
}

/// Builds an internal node where child `idx` of `src` is replaced by
/// `children`, each allocated through `store` and keyed by its first key.
pub fn replace_child_with_many<S: PageStore + ?Sized>(
    store: &mut S,
    dst: &mut Page,
    src: &Page,
    idx: usize,
    children: Vec<Page>,
) {
    let inc = children.len();
    assert!((1..=3).contains(&inc), "cannot replace a child with {} pages", inc);
    let nkeys = src.key_count();
    dst.set_header(NodeType::Internal, nkeys + inc - 1);
    append_range(dst, src, 0, 0, idx);
    for (i, child) in children.into_iter().enumerate() {
        let key = child.key(0).to_vec();
        let id = store.allocate(child);
        append_entry(dst, idx + i, id, &key, &[]);
    }
    append_range(dst, src, idx + inc, idx + 1, nkeys - (idx + 1));
}

/// Size a page holding exactly `entries` would occupy.
fn page_bytes<'a>(entries: impl Iterator<Item = (&'a [u8], &'a [u8])>) -> usize {
    entries.fold(HEADER_SIZE, |acc, (key, value)| {
        acc + PTR_SIZE + OFFSET_SIZE + KV_HEADER_SIZE + key.len() + value.len()
    })
}

pub trait PageBuilder {
    fn build(self) -> Page;
}

/// Builds a fresh leaf page from a list of pairs already in key order.
pub struct LeafNodePageBuilder {
    page_size: usize,
    key_value_pairs: Vec<KeyValuePair>,
}

impl LeafNodePageBuilder {
    pub fn new(page_size: usize) -> LeafNodePageBuilder {
        LeafNodePageBuilder {
            page_size,
            key_value_pairs: Vec::new(),
        }
    }

    pub fn key_value_pairs(mut self, key_value_pairs: Vec<KeyValuePair>) -> Self {
        self.key_value_pairs = key_value_pairs;
        self
    }
}

impl PageBuilder for LeafNodePageBuilder {
    fn build(self) -> Page {
        let needed = page_bytes(
            self.key_value_pairs
                .iter()
                .map(|pair| (pair.key.as_slice(), pair.value.as_slice())),
        );
        assert!(needed <= self.page_size, "leaf needs {} bytes", needed);

        let mut page = Page::new(self.page_size);
        page.set_header(NodeType::Leaf, self.key_value_pairs.len());
        for (idx, pair) in self.key_value_pairs.iter().enumerate() {
            append_entry(&mut page, idx, 0, &pair.key, &pair.value);
        }
        page
    }
}

/// Builds a fresh internal page from `(first key, child id)` pairs.
pub struct InternalNodePageBuilder {
    page_size: usize,
    children: Vec<(Vec<u8>, PageId)>,
}

impl InternalNodePageBuilder {
    pub fn new(page_size: usize) -> InternalNodePageBuilder {
        InternalNodePageBuilder {
            page_size,
            children: Vec::new(),
        }
    }

    pub fn children(mut self, children: Vec<(Vec<u8>, PageId)>) -> Self {
        self.children = children;
        self
    }
}

impl PageBuilder for InternalNodePageBuilder {
    fn build(self) -> Page {
        let needed = page_bytes(self.children.iter().map(|(key, _)| (key.as_slice(), &[][..])));
        assert!(needed <= self.page_size, "internal node needs {} bytes", needed);

        let mut page = Page::new(self.page_size);
        page.set_header(NodeType::Internal, self.children.len());
        for (idx, (key, child)) in self.children.iter().enumerate() {
            append_entry(&mut page, idx, *child, key, &[]);
        }
        page
    }
}
