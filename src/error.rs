use thiserror::Error;

/// Recoverable errors surfaced by the tree and its page store.
///
/// Structural violations (bad indexes, unknown node types, unknown page ids)
/// are not represented here: they indicate corruption or misuse and panic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key or value too large (key: {key_len} bytes, value: {value_len} bytes)")]
    KeyTooLarge { key_len: usize, value_len: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("corrupted database file: {0}")]
    Corrupted(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
