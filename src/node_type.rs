/// NodeType represents the different node types in the BTree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// Internal nodes hold keys and the ids of their children.
    Internal,

    /// Leaf nodes hold keys and values.
    Leaf,

    /// A tag no well-formed page carries.
    Unexpected(u16),
}

pub const INTERNAL_TAG: u16 = 0x01;
pub const LEAF_TAG: u16 = 0x02;

// Converts a header tag to a NodeType.
impl From<u16> for NodeType {
    fn from(orig: u16) -> NodeType {
        match orig {
            INTERNAL_TAG => NodeType::Internal,
            LEAF_TAG => NodeType::Leaf,
            tag => NodeType::Unexpected(tag),
        }
    }
}

// Converts a NodeType to a header tag.
impl From<NodeType> for u16 {
    fn from(orig: NodeType) -> u16 {
        match orig {
            NodeType::Internal => INTERNAL_TAG,
            NodeType::Leaf => LEAF_TAG,
            NodeType::Unexpected(tag) => tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        assert_eq!(NodeType::from(1u16), NodeType::Internal);
        assert_eq!(NodeType::from(2u16), NodeType::Leaf);
        assert_eq!(NodeType::from(0u16), NodeType::Unexpected(0));
        assert_eq!(u16::from(NodeType::Leaf), 2);
        assert_eq!(u16::from(NodeType::Unexpected(7)), 7);
    }
}
