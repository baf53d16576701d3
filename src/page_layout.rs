//! Byte layout of a single page.
//!
//! ```text
//! | type (2) | nkeys (2) | pointers (8 * nkeys) | offsets (2 * nkeys) | key-values |
//! ```
//!
//! Each key-value entry is `| klen (2) | vlen (2) | key | value |`.
//! All integers are little endian.

/// Default page size. Each page represents a node in the BTree.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest and largest page sizes a store accepts. Scratch pages are twice
/// the page size and their offsets must still fit in a u16.
pub const MIN_PAGE_SIZE: usize = 512;
pub const MAX_PAGE_SIZE: usize = 32768;

/// Common node header layout (four bytes in total).
pub const NODE_TYPE_OFFSET: usize = 0;
pub const NODE_TYPE_SIZE: usize = 2;
pub const KEY_COUNT_OFFSET: usize = NODE_TYPE_OFFSET + NODE_TYPE_SIZE;
pub const KEY_COUNT_SIZE: usize = 2;
pub const HEADER_SIZE: usize = NODE_TYPE_SIZE + KEY_COUNT_SIZE;

/// Child pointer slot, present for every entry.
pub const PTR_SIZE: usize = 8;

/// Cumulative KV-area offset, stored for entries 1..=nkeys.
pub const OFFSET_SIZE: usize = 2;

/// Key length and value length prefix of a KV entry.
pub const KV_HEADER_SIZE: usize = 4;

/// Bytes an entry costs on top of its key and value.
pub const ENTRY_OVERHEAD: usize = PTR_SIZE + OFFSET_SIZE + KV_HEADER_SIZE;

/// Slack subtracted from the page size when bounding a single key-value pair.
pub const KV_OVERHEAD: usize = 100;

/// Hard limit imposed by the u16 length prefixes.
pub const MAX_LEN_PREFIX: usize = u16::MAX as usize;

/// Key, Value limits for the default page size.
pub const DEFAULT_MAX_KEY_SIZE: usize = 1000;
pub const DEFAULT_MAX_VALUE_SIZE: usize = 3000;
