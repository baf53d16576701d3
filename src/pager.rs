use byteorder::{ByteOrder, LittleEndian};
use memmap::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::BTreeConfig;
use crate::error::{Error, Result};
use crate::node_type::NodeType;
use crate::page::{Page, PageId};
use crate::persist::{self, SaveMode};

/// Maps page ids to immutable page bytes.
///
/// Pages handed to `allocate` are never modified afterwards, so a fetched
/// `Arc<Page>` stays valid and unchanged even once its id is freed.
pub trait PageStore {
    /// Page size and entry limits every page in this store obeys.
    fn config(&self) -> &BTreeConfig;

    /// Returns the page previously allocated under `id`.
    /// Panics if `id` is unknown or has been freed.
    fn fetch(&self, id: PageId) -> Arc<Page>;

    /// Stores a page of exactly `config().page_size` bytes under a fresh id.
    fn allocate(&mut self, page: Page) -> PageId;

    /// Releases `id`; it may be handed out again by a later `allocate`.
    fn free(&mut self, id: PageId);
}

/// Meta page layout, stored in slot 0 of a database file.
const MAGIC: &[u8; 8] = b"COWBTREE";
const MAGIC_OFFSET: usize = 0;
const PAGE_SIZE_OFFSET: usize = 8;
const MAX_KEY_OFFSET: usize = 12;
const MAX_VALUE_OFFSET: usize = 16;
const ROOT_OFFSET: usize = 20;
const SLOT_COUNT_OFFSET: usize = 28;
const META_SIZE: usize = 36;

/// In-memory page store. Ids start at 1; freed ids are reused most recent
/// first.
///
/// A pager can be written to a single file where slot 0 holds a meta page
/// (page size, limits, root id) and slot `i` holds page `i`. Free slots are
/// zeroed.
#[derive(Debug)]
pub struct Pager {
    config: BTreeConfig,
    pages: HashMap<PageId, Arc<Page>>,
    free_ids: Vec<PageId>,
    next_id: PageId,
}

impl Pager {
    pub fn new(config: BTreeConfig) -> Result<Pager> {
        config.validate()?;
        Ok(Pager {
            config,
            pages: HashMap::new(),
            free_ids: Vec::new(),
            next_id: 1,
        })
    }

    /// Number of live pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Serializes every live page and `root` into a file image.
    pub fn to_bytes(&self, root: PageId) -> Vec<u8> {
        let page_size = self.config.page_size;
        let slots = self.next_id as usize;
        let mut data = vec![0u8; slots * page_size];

        data[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC.len()].copy_from_slice(MAGIC);
        LittleEndian::write_u32(&mut data[PAGE_SIZE_OFFSET..], page_size as u32);
        LittleEndian::write_u32(&mut data[MAX_KEY_OFFSET..], self.config.max_key_size as u32);
        LittleEndian::write_u32(&mut data[MAX_VALUE_OFFSET..], self.config.max_value_size as u32);
        LittleEndian::write_u64(&mut data[ROOT_OFFSET..], root);
        LittleEndian::write_u64(&mut data[SLOT_COUNT_OFFSET..], slots as u64);

        for (&id, page) in &self.pages {
            let start = id as usize * page_size;
            data[start..start + page_size].copy_from_slice(page.as_bytes());
        }
        data
    }

    /// Rebuilds a pager from a file image, returning it with the stored root.
    pub fn from_bytes(data: &[u8]) -> Result<(Pager, PageId)> {
        if data.len() < META_SIZE || &data[MAGIC_OFFSET..MAGIC_OFFSET + MAGIC.len()] != MAGIC {
            return Err(Error::Corrupted("missing meta page"));
        }
        let config = BTreeConfig {
            page_size: LittleEndian::read_u32(&data[PAGE_SIZE_OFFSET..]) as usize,
            max_key_size: LittleEndian::read_u32(&data[MAX_KEY_OFFSET..]) as usize,
            max_value_size: LittleEndian::read_u32(&data[MAX_VALUE_OFFSET..]) as usize,
        };
        config
            .validate()
            .map_err(|_| Error::Corrupted("invalid page size or limits"))?;
        let root = LittleEndian::read_u64(&data[ROOT_OFFSET..]);
        let slots = LittleEndian::read_u64(&data[SLOT_COUNT_OFFSET..]);

        let page_size = config.page_size;
        let expected_len = slots.checked_mul(page_size as u64);
        if slots == 0 || expected_len != Some(data.len() as u64) {
            return Err(Error::Corrupted("file length does not match slot count"));
        }

        let mut pager = Pager::new(config)?;
        pager.next_id = slots;
        for id in 1..slots {
            let start = id as usize * page_size;
            let page = Page::from_bytes(&data[start..start + page_size]);
            match page.node_type() {
                NodeType::Unexpected(0) => pager.free_ids.push(id),
                NodeType::Unexpected(_) => return Err(Error::Corrupted("unknown node type")),
                NodeType::Leaf | NodeType::Internal => {
                    pager.pages.insert(id, Arc::new(page));
                }
            }
        }
        // Reuse low ids first.
        pager.free_ids.reverse();

        if root != 0 && !pager.pages.contains_key(&root) {
            return Err(Error::Corrupted("root page is not allocated"));
        }
        Ok((pager, root))
    }

    /// Opens a database file written by `persist`.
    pub fn open(path: &Path) -> Result<(Pager, PageId)> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::Corrupted("empty file"));
        }
        // SAFETY: the mapping is only read while `from_bytes` copies pages
        // out of it and is dropped before returning. This relies on a single
        // writer per path: an in-place save truncating the file while it is
        // mapped would fault the read.
        let mmap = unsafe { Mmap::map(&file)? };
        let (pager, root) = Pager::from_bytes(&mmap)?;
        info!(
            path = %path.display(),
            pages = pager.len(),
            root,
            "opened page store"
        );
        Ok((pager, root))
    }

    /// Writes every live page and `root` to `path`.
    pub fn persist(&self, path: &Path, root: PageId, mode: SaveMode) -> Result<()> {
        let data = self.to_bytes(root);
        persist::save(path, &data, mode)?;
        info!(
            path = %path.display(),
            pages = self.len(),
            root,
            ?mode,
            "persisted page store"
        );
        Ok(())
    }
}

impl PageStore for Pager {
    fn config(&self) -> &BTreeConfig {
        &self.config
    }

    fn fetch(&self, id: PageId) -> Arc<Page> {
        match self.pages.get(&id) {
            Some(page) => Arc::clone(page),
            None => panic!("fetch of unknown page {}", id),
        }
    }

    fn allocate(&mut self, page: Page) -> PageId {
        assert_eq!(page.len(), self.config.page_size, "page has the wrong size");
        assert!(
            page.used_bytes() <= self.config.page_size,
            "page overflows its buffer"
        );
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                self.next_id += 1;
                self.next_id - 1
            }
        };
        self.pages.insert(id, Arc::new(page));
        id
    }

    fn free(&mut self, id: PageId) {
        if self.pages.remove(&id).is_none() {
            panic!("free of unknown page {}", id);
        }
        self.free_ids.push(id);
    }
}
