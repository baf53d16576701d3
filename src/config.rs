use crate::error::{Error, Result};
use crate::page_layout::{
    DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, DEFAULT_PAGE_SIZE, ENTRY_OVERHEAD, HEADER_SIZE,
    KV_OVERHEAD, MAX_LEN_PREFIX, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};

/// Page size and entry limits shared by a page store and the trees built on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BTreeConfig {
    pub page_size: usize,
    pub max_key_size: usize,
    pub max_value_size: usize,
}

impl Default for BTreeConfig {
    fn default() -> BTreeConfig {
        BTreeConfig {
            page_size: DEFAULT_PAGE_SIZE,
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl BTreeConfig {
    /// Derives key and value limits proportional to `page_size`, matching the
    /// defaults at 4096 bytes.
    pub fn with_page_size(page_size: usize) -> BTreeConfig {
        let max_key_size = (page_size / 4).saturating_sub(24);
        BTreeConfig {
            page_size,
            max_key_size,
            max_value_size: 3 * max_key_size,
        }
    }

    /// Largest combined key and value length accepted by `check_limit`.
    pub fn max_kv_size(&self) -> usize {
        self.page_size - KV_OVERHEAD
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size < MIN_PAGE_SIZE || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "page size {} is outside [{}, {}]",
                self.page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        if self.max_key_size == 0 {
            return Err(Error::InvalidConfig("max key size must be positive".into()));
        }
        if self.max_key_size > MAX_LEN_PREFIX || self.max_value_size > MAX_LEN_PREFIX {
            return Err(Error::InvalidConfig(format!(
                "key and value limits must not exceed {}",
                MAX_LEN_PREFIX
            )));
        }
        // A page holding one maximal entry must fit.
        let single = HEADER_SIZE + ENTRY_OVERHEAD + self.max_key_size + self.max_value_size;
        if single > self.page_size {
            return Err(Error::InvalidConfig(format!(
                "a maximal entry needs {} bytes but pages hold {}",
                single, self.page_size
            )));
        }
        // Replacing one child by three adds up to three internal entries to a
        // full page; the result must leave the same slack below twice the
        // page size as a leaf insert does, or a three-way split may not fit.
        let grown = 3 * (ENTRY_OVERHEAD + self.max_key_size) + KV_OVERHEAD;
        if grown > self.page_size + ENTRY_OVERHEAD {
            return Err(Error::InvalidConfig(format!(
                "max key size {} is too large for {} byte pages",
                self.max_key_size, self.page_size
            )));
        }
        Ok(())
    }

    /// Checks the length limits imposed by the node format.
    ///
    /// Besides the combined `page_size - 100` bound and the u16 length
    /// prefixes, keys and values are capped by `max_key_size` and
    /// `max_value_size`. The combined bound alone is not enough: an internal
    /// page whose child splits in three gains up to three entries holding
    /// near-page-sized keys, outgrows the 2x scratch buffer, and can no longer
    /// be split into three pages. `validate` keeps the key cap below that.
    pub fn check_limit(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let too_large = key.len() + value.len() > self.max_kv_size()
            || key.len() > MAX_LEN_PREFIX
            || value.len() > MAX_LEN_PREFIX
            || key.len() > self.max_key_size
            || value.len() > self.max_value_size;
        if too_large {
            return Err(Error::KeyTooLarge {
                key_len: key.len(),
                value_len: value.len(),
            });
        }
        Ok(())
    }
}
