use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::key_value_pair::KeyValuePair;
use crate::node_type::NodeType;
use crate::page::{Page, PageId};
use crate::page_builder::{
    leaf_insert, leaf_update, replace_child_with_many, InternalNodePageBuilder,
    LeafNodePageBuilder, PageBuilder,
};
use crate::pager::{PageStore, Pager};
use crate::persist::SaveMode;
use crate::split::split_to_at_most_three;

/// A copy-on-write B-tree whose nodes live in a `PageStore`.
///
/// Every insert rebuilds the pages on the path from the root to the affected
/// leaf, allocating the new versions and freeing the old ones; an allocated
/// page is never written again. Insertion recurses once per level. A level is
/// only added when the root itself overflows, and with the default limits an
/// internal page holds at least four children, so the depth stays small.
pub struct BTree<S: PageStore> {
    root: PageId,
    store: S,
}

impl<S: PageStore> BTree<S> {
    /// An empty tree.
    pub fn new(store: S) -> BTree<S> {
        BTree { root: 0, store }
    }

    /// A tree over pages already in `store`, rooted at `root` (0 if empty).
    pub fn with_root(store: S, root: PageId) -> BTree<S> {
        BTree { root, store }
    }

    pub fn root(&self) -> PageId {
        self.root
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Inserts `key` or replaces its value.
    ///
    /// Fails only when the pair exceeds the store's size limits, in which
    /// case the tree is left as it was.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let config = *self.store.config();
        config.check_limit(key, value)?;

        if self.root == 0 {
            // The empty sentinel key makes the tree cover the whole key
            // space, so a lookup always finds a containing leaf.
            let root = LeafNodePageBuilder::new(config.page_size)
                .key_value_pairs(vec![KeyValuePair::sentinel(), KeyValuePair::new(key, value)])
                .build();
            self.root = self.store.allocate(root);
            debug!(root = self.root, "created root leaf");
            return Ok(());
        }

        let old_root = self.store.fetch(self.root);
        let node = self.tree_insert(&old_root, key, value);
        let mut split = split_to_at_most_three(node, config.page_size);
        self.store.free(self.root);

        if split.len() > 1 {
            let fanout = split.len();
            let children = split
                .into_iter()
                .map(|page| {
                    let key = page.key(0).to_vec();
                    (key, self.store.allocate(page))
                })
                .collect();
            let root = InternalNodePageBuilder::new(config.page_size)
                .children(children)
                .build();
            self.root = self.store.allocate(root);
            debug!(root = self.root, fanout, "grew a new root");
        } else {
            self.root = self.store.allocate(split.remove(0));
        }
        Ok(())
    }

    /// Returns the value stored under `key`.
    ///
    /// Once the tree holds anything, the empty key maps to the sentinel's
    /// empty value unless it was inserted explicitly.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if self.root == 0 {
            return None;
        }
        let mut page = self.store.fetch(self.root);
        loop {
            let idx = page.lookup_le(key);
            match page.node_type() {
                NodeType::Leaf => {
                    return if page.key(idx) == key {
                        Some(page.value(idx).to_vec())
                    } else {
                        None
                    };
                }
                NodeType::Internal => page = self.store.fetch(page.child_pointer(idx)),
                NodeType::Unexpected(tag) => panic!("invalid node type {}", tag),
            }
        }
    }

    /// Number of levels, 0 for an empty tree.
    pub fn height(&self) -> usize {
        if self.root == 0 {
            return 0;
        }
        let mut height = 1;
        let mut page = self.store.fetch(self.root);
        while page.node_type() == NodeType::Internal {
            page = self.store.fetch(page.child_pointer(0));
            height += 1;
        }
        height
    }

    /// Inserts into the subtree rooted at `node`, returning its new version.
    /// The result may be up to twice the page size.
    fn tree_insert(&mut self, node: &Page, key: &[u8], value: &[u8]) -> Page {
        let mut new = Page::new(2 * self.store.config().page_size);
        let idx = node.lookup_le(key);

        match node.node_type() {
            NodeType::Leaf => {
                if node.key(idx) == key {
                    leaf_update(&mut new, node, idx, key, value);
                } else {
                    leaf_insert(&mut new, node, idx + 1, key, value);
                }
            }
            NodeType::Internal => self.node_insert(&mut new, node, idx, key, value),
            NodeType::Unexpected(tag) => panic!("invalid node type {}", tag),
        }
        new
    }

    // Inserts into child `idx` of an internal node and relinks the result.
    fn node_insert(&mut self, new: &mut Page, node: &Page, idx: usize, key: &[u8], value: &[u8]) {
        let child_id = node.child_pointer(idx);
        let child = self.store.fetch(child_id);
        let updated = self.tree_insert(&child, key, value);
        let split = split_to_at_most_three(updated, self.store.config().page_size);
        self.store.free(child_id);
        replace_child_with_many(&mut self.store, new, node, idx, split);
    }
}

impl BTree<Pager> {
    /// Loads a tree persisted with `save`.
    pub fn open(path: &Path) -> Result<BTree<Pager>> {
        let (pager, root) = Pager::open(path)?;
        Ok(BTree::with_root(pager, root))
    }

    /// Commits the pages and the root id to `path`.
    pub fn save(&self, path: &Path, mode: SaveMode) -> Result<()> {
        self.store.persist(path, self.root, mode)
    }
}
