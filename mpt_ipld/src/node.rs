//! The decoded form of a trie node.

use std::fmt::{self, Display};

use cid::Cid;
use enum_as_inner::EnumAsInner;

use crate::nibbles::{Nibble, PartialPath};

/// Number of children of a branch node.
pub const BRANCH_WIDTH: usize = 16;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
/// The kind of a trie node.
pub enum NodeKind {
    /// Leaf node.
    Leaf,

    /// Extension node.
    Extension,

    /// Branch node.
    Branch,

    /// A 2-item node whose hex prefix flag is not one of the four defined
    /// values.
    Unknown,
}

impl NodeKind {
    /// Maps the flag nibble of a hex prefix encoded key to the kind of node
    /// that key belongs to.
    ///
    /// Bit 1 of the flag marks a leaf; bit 0 only tells whether the key has an
    /// odd number of nibbles and does not affect the kind.
    pub const fn from_hex_prefix_flag(flag: Nibble) -> Self {
        match flag {
            0 | 1 => NodeKind::Extension,
            2 | 3 => NodeKind::Leaf,
            _ => NodeKind::Unknown,
        }
    }

    /// The name used as the tag of the node in the output tree.
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Leaf => "Leaf",
            NodeKind::Extension => "Extension",
            NodeKind::Branch => "Branch",
            NodeKind::Unknown => "Unknown",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A leaf node: the rest of a key and the value stored under it.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LeafNode {
    /// The key nibbles remaining below the leaf's parent.
    pub path: PartialPath,

    /// The stored value (usually itself RLP encoded).
    pub value: Vec<u8>,
}

/// An extension node: a shared key segment followed by a single child.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExtensionNode {
    /// The key segment shared by everything below this node.
    pub path: PartialPath,

    /// The node the segment leads to.
    pub child: ChildRef,
}

/// A branch node: one child slot per nibble plus an optional value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BranchNode {
    /// Children indexed by the next key nibble.
    pub children: [ChildRef; BRANCH_WIDTH],

    /// The value stored at this node, if any.
    pub value: Option<Vec<u8>>,
}

impl BranchNode {
    /// Iterates over the occupied child slots along with their nibble.
    pub fn occupied_children(&self) -> impl Iterator<Item = (Nibble, &ChildRef)> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| (i as Nibble, c))
    }
}

/// A reference from a node to one of its children.
///
/// Only a leaf may be embedded in its parent, so [`ChildRef::Inline`] holds a
/// [`LeafNode`] rather than any node.
#[derive(Clone, Debug, EnumAsInner, Eq, Hash, PartialEq)]
pub enum ChildRef {
    /// No child.
    Empty,

    /// A child referenced by the CID of its hash.
    Link(Cid),

    /// A leaf embedded directly in the parent.
    Inline(LeafNode),
}

/// A fully decoded trie node.
#[derive(Clone, Debug, EnumAsInner, Eq, Hash, PartialEq)]
pub enum DecodedNode {
    /// Leaf node.
    Leaf(LeafNode),

    /// Extension node.
    Extension(ExtensionNode),

    /// Branch node.
    Branch(BranchNode),
}

impl DecodedNode {
    /// The kind of the node.
    pub const fn kind(&self) -> NodeKind {
        match self {
            DecodedNode::Leaf(_) => NodeKind::Leaf,
            DecodedNode::Extension(_) => NodeKind::Extension,
            DecodedNode::Branch(_) => NodeKind::Branch,
        }
    }

    /// The links to child nodes stored elsewhere.
    ///
    /// Inline leaves are part of this node and are not returned.
    pub fn links(&self) -> Vec<&Cid> {
        match self {
            DecodedNode::Leaf(_) => Vec::new(),
            DecodedNode::Extension(ext) => ext.child.as_link().into_iter().collect(),
            DecodedNode::Branch(branch) => branch
                .children
                .iter()
                .filter_map(ChildRef::as_link)
                .collect(),
        }
    }
}

impl From<LeafNode> for DecodedNode {
    fn from(leaf: LeafNode) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<ExtensionNode> for DecodedNode {
    fn from(ext: ExtensionNode) -> Self {
        Self::Extension(ext)
    }
}

impl From<BranchNode> for DecodedNode {
    fn from(branch: BranchNode) -> Self {
        Self::Branch(branch)
    }
}

#[cfg(test)]
mod tests {
    use std::array;

    use ethereum_types::H256;

    use super::{BranchNode, ChildRef, DecodedNode, LeafNode, NodeKind};
    use crate::{link::to_link, nibbles::PartialPath};

    #[test]
    fn node_kind_from_hex_prefix_flag_works() {
        assert_eq!(NodeKind::from_hex_prefix_flag(0), NodeKind::Extension);
        assert_eq!(NodeKind::from_hex_prefix_flag(1), NodeKind::Extension);
        assert_eq!(NodeKind::from_hex_prefix_flag(2), NodeKind::Leaf);
        assert_eq!(NodeKind::from_hex_prefix_flag(3), NodeKind::Leaf);

        for flag in 4..=15 {
            assert_eq!(NodeKind::from_hex_prefix_flag(flag), NodeKind::Unknown);
        }
    }

    #[test]
    fn node_kind_display_matches_output_tags() {
        assert_eq!(NodeKind::Leaf.to_string(), "Leaf");
        assert_eq!(NodeKind::Extension.to_string(), "Extension");
        assert_eq!(NodeKind::Branch.to_string(), "Branch");
        assert_eq!(NodeKind::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn branch_links_skip_empty_and_inline_children() {
        let hash = H256::repeat_byte(0x11);
        let leaf = LeafNode {
            path: PartialPath::from_nibbles(vec![0x3]),
            value: vec![1],
        };

        let mut children: [ChildRef; 16] = array::from_fn(|_| ChildRef::Empty);
        children[2] = ChildRef::Link(to_link(0x96, &hash));
        children[9] = ChildRef::Inline(leaf);

        let branch = BranchNode {
            children,
            value: None,
        };
        assert_eq!(
            branch
                .occupied_children()
                .map(|(n, _)| n)
                .collect::<Vec<_>>(),
            vec![2, 9]
        );

        let node = DecodedNode::from(branch);
        assert_eq!(node.kind(), NodeKind::Branch);
        assert_eq!(node.links(), vec![&to_link(0x96, &hash)]);
    }
}
