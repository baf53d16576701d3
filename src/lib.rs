//! A copy-on-write B-tree over fixed-size pages.
//!
//! Nodes are encoded into pages (see [`page_layout`]) held by a [`PageStore`].
//! An insert never modifies an allocated page: it builds new versions of the
//! pages on the root-to-leaf path, splits those that outgrow a page, and frees
//! the old ones. A reader holding a fetched page therefore always sees
//! consistent bytes, while writers must be serialized.
//!
//! ```no_run
//! use cowbtree::{BTree, BTreeConfig, Pager, SaveMode};
//! use std::path::Path;
//!
//! # fn main() -> cowbtree::Result<()> {
//! let mut tree = BTree::new(Pager::new(BTreeConfig::default())?);
//! tree.insert(b"hello", b"world")?;
//! assert_eq!(tree.get(b"hello"), Some(b"world".to_vec()));
//! tree.save(Path::new("tree.db"), SaveMode::Atomic)?;
//! # Ok(())
//! # }
//! ```

pub mod btree;
pub mod config;
pub mod error;
pub mod key_value_pair;
pub mod node_type;
pub mod page;
pub mod page_builder;
pub mod page_layout;
pub mod pager;
pub mod persist;
pub mod split;

pub use btree::BTree;
pub use config::BTreeConfig;
pub use error::{Error, Result};
pub use key_value_pair::KeyValuePair;
pub use node_type::NodeType;
pub use page::{Page, PageId};
pub use pager::{PageStore, Pager};
pub use persist::SaveMode;
