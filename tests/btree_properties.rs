use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use cowbtree::page_builder::{LeafNodePageBuilder, PageBuilder};
use cowbtree::split::split_to_at_most_three;
use cowbtree::{BTree, BTreeConfig, Error, KeyValuePair, NodeType, Page, PageId, PageStore, Pager};
use proptest::prelude::*;

/// A caller-supplied store that never reuses ids, so a fetch of a freed page
/// is caught instead of silently reading a newer page.
struct NoReuseStore {
    inner: Pager,
    freed: HashSet<PageId>,
    allocations: usize,
}

impl NoReuseStore {
    fn new(config: BTreeConfig) -> NoReuseStore {
        NoReuseStore {
            inner: Pager::new(config).expect("valid config"),
            freed: HashSet::new(),
            allocations: 0,
        }
    }
}

impl PageStore for NoReuseStore {
    fn config(&self) -> &BTreeConfig {
        self.inner.config()
    }

    fn fetch(&self, id: PageId) -> Arc<Page> {
        assert!(!self.freed.contains(&id), "fetched freed page {}", id);
        self.inner.fetch(id)
    }

    fn allocate(&mut self, page: Page) -> PageId {
        self.allocations += 1;
        self.inner.allocate(page)
    }

    fn free(&mut self, id: PageId) {
        // the inner pager keeps the bytes, so its ids are never recycled
        assert!(self.freed.insert(id), "double free of page {}", id);
    }
}

fn collect<S: PageStore>(store: &S, id: PageId, out: &mut Vec<KeyValuePair>) {
    let page = store.fetch(id);
    assert!(page.used_bytes() <= store.config().page_size);
    for i in 1..page.key_count() {
        assert!(page.key(i - 1) <= page.key(i), "keys out of order");
    }
    match page.node_type() {
        NodeType::Leaf => out.extend(page.key_value_pairs()),
        NodeType::Internal => {
            for i in 0..page.key_count() {
                collect(store, page.child_pointer(i), out);
            }
        }
        NodeType::Unexpected(tag) => panic!("unexpected node type {}", tag),
    }
}

fn entries<S: PageStore>(tree: &BTree<S>) -> Vec<KeyValuePair> {
    let mut out = Vec::new();
    if tree.root() != 0 {
        collect(tree.store(), tree.root(), &mut out);
    }
    out
}

fn count_pages<S: PageStore>(store: &S, id: PageId) -> usize {
    let page = store.fetch(id);
    match page.node_type() {
        NodeType::Internal => {
            1 + (0..page.key_count())
                .map(|i| count_pages(store, page.child_pointer(i)))
                .sum::<usize>()
        }
        _ => 1,
    }
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(b'a'..=b'e', 1..6),
        prop::collection::vec(any::<u8>(), 1..300),
    ]
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..1200)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn tree_matches_btreemap(ops in prop::collection::vec((key_strategy(), value_strategy()), 1..200)) {
        let mut tree = BTree::new(NoReuseStore::new(BTreeConfig::default()));
        let mut model = BTreeMap::new();
        for (key, value) in ops {
            tree.insert(&key, &value).expect("insert within limits");
            model.insert(key, value);
        }

        for (key, value) in &model {
            let got = tree.get(key);
            prop_assert_eq!(got.as_ref(), Some(value));
        }

        let expected: Vec<KeyValuePair> = std::iter::once(KeyValuePair::sentinel())
            .chain(model.into_iter().map(|(k, v)| KeyValuePair::new(k, v)))
            .collect();
        prop_assert_eq!(entries(&tree), expected);
    }

    #[test]
    fn replaced_pages_are_freed(ops in prop::collection::vec((0u16..3000, 0usize..200), 200..1500)) {
        let mut tree = BTree::new(Pager::new(BTreeConfig::default()).unwrap());
        let mut model = BTreeMap::new();
        for (n, len) in ops {
            let key = format!("{:016x}", n).into_bytes();
            let value = vec![b'x'; len];
            tree.insert(&key, &value).unwrap();
            model.insert(key, value);
            // every live page is reachable from the root
            prop_assert_eq!(count_pages(tree.store(), tree.root()), tree.store().len());
        }

        let expected: Vec<KeyValuePair> = std::iter::once(KeyValuePair::sentinel())
            .chain(model.into_iter().map(|(k, v)| KeyValuePair::new(k, v)))
            .collect();
        prop_assert_eq!(entries(&tree), expected);
    }

    #[test]
    fn reinsert_is_idempotent(
        ops in prop::collection::vec((key_strategy(), value_strategy()), 1..60),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut tree = BTree::new(Pager::new(BTreeConfig::default()).unwrap());
        for (key, value) in &ops {
            tree.insert(key, value).unwrap();
        }
        let before = entries(&tree);
        let (key, _) = &ops[pick.index(ops.len())];
        let current = tree.get(key).unwrap();
        tree.insert(key, &current).unwrap();
        prop_assert_eq!(entries(&tree), before);
    }

    #[test]
    fn oversize_leaves_root_unchanged(extra in 1usize..2000, seed in prop::collection::vec((key_strategy(), value_strategy()), 0..20)) {
        let config = BTreeConfig::default();
        let mut tree = BTree::new(Pager::new(config).unwrap());
        for (key, value) in &seed {
            tree.insert(key, value).unwrap();
        }
        let root = tree.root();
        let pages = tree.store().len();

        let key = vec![b'k'; 500];
        let value = vec![b'v'; config.max_kv_size() - key.len() + extra];
        let is_too_large = matches!(tree.insert(&key, &value), Err(Error::KeyTooLarge { .. }));
        prop_assert!(is_too_large);
        prop_assert_eq!(tree.root(), root);
        prop_assert_eq!(tree.store().len(), pages);
    }

    #[test]
    fn split_keeps_entries_and_bounds(sizes in prop::collection::vec(0usize..1500, 2..40)) {
        let page_size = 4096;
        // fill a scratch page up to twice the page size
        let mut pairs = Vec::new();
        let mut used = 4;
        for (i, size) in sizes.into_iter().enumerate() {
            let pair = KeyValuePair::new(format!("{:04}", i), vec![b'v'; size]);
            let entry = 14 + pair.key.len() + pair.value.len();
            if used + entry > 2 * page_size - 100 {
                break;
            }
            used += entry;
            pairs.push(pair);
        }
        prop_assume!(pairs.len() >= 2);

        let src = LeafNodePageBuilder::new(2 * page_size).key_value_pairs(pairs.clone()).build();
        let split = split_to_at_most_three(src, page_size);
        prop_assert!(!split.is_empty() && split.len() <= 3);
        for page in &split {
            prop_assert!(page.used_bytes() <= page_size);
            prop_assert_eq!(page.len(), page_size);
        }
        let joined: Vec<KeyValuePair> = split.iter().flat_map(|p| p.key_value_pairs()).collect();
        prop_assert_eq!(joined, pairs);
    }
}

#[test]
fn root_becomes_internal_and_every_leaf_stays_reachable() {
    let mut tree = BTree::new(NoReuseStore::new(BTreeConfig::default()));
    let value = vec![b'x'; 1500];
    let mut fanouts = Vec::new();
    for i in 0..200u32 {
        let key = format!("key{:05}", i);
        tree.insert(key.as_bytes(), &value).unwrap();
        let root = tree.store().fetch(tree.root());
        if root.node_type() == NodeType::Internal {
            fanouts.push(root.key_count());
        }
    }
    // the first internal root holds exactly the pages its leaf split into
    assert!(matches!(fanouts.first().copied(), Some(2) | Some(3)));
    assert!(tree.height() >= 2);
    for i in 0..200u32 {
        let key = format!("key{:05}", i);
        assert_eq!(tree.get(key.as_bytes()), Some(value.clone()), "{}", key);
    }
    assert!(tree.store().allocations > 200);
}
