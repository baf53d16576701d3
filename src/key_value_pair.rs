/// An owned key-value entry decoded from, or destined for, a page.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValuePair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValuePair {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> KeyValuePair {
        KeyValuePair {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The empty-key entry heading the leftmost leaf. It compares below every
    /// other key so a lookup always finds a containing page.
    pub fn sentinel() -> KeyValuePair {
        KeyValuePair::new(Vec::new(), Vec::new())
    }
}
