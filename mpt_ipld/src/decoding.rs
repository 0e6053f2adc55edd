//! Decoding of RLP encoded trie nodes.
//!
//! The pipeline is:
//! 1. [`parse_container`] splits the input into [`RawField`]s.
//! 2. [`classify`] uses the item count and (for two-item nodes) the hex
//!    prefix of the key to decide what kind of node this is.
//! 3. The matching `unpack_*` function builds the typed node, resolving every
//!    child reference with [`resolve_child`].
//!
//! [`decode`] additionally writes the result into a [`NodeAssembler`].

use std::{array, io::Read};

use log::trace;
use thiserror::Error;

use crate::{
    assembler::NodeAssembler,
    compact_key::decode_compact_key,
    link::to_link,
    nibbles::{Nibble, PartialPath},
    node::{BranchNode, ChildRef, DecodedNode, ExtensionNode, LeafNode, NodeKind, BRANCH_WIDTH},
    raw::{parse_container, RawField, RawNode},
    utils::bytes_to_h256,
};

/// Item count of a branch node: one per child plus the value.
pub const BRANCH_NODE_ITEMS: usize = BRANCH_WIDTH + 1;

/// Item count of leaf and extension nodes.
pub const SHORT_NODE_ITEMS: usize = 2;

/// Stores the result of decoding. Returns a [DecodeError] upon failure.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// An error encountered while decoding a trie node.
///
/// Any output already written to a [`NodeAssembler`] when one of these is
/// returned is incomplete and should be discarded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The RLP container itself is malformed.
    #[error("Malformed RLP container: {0}")]
    Container(#[from] rlp::DecoderError),

    /// Reading the encoded node failed.
    #[error("Failed to read the encoded node: {0}")]
    Io(#[from] std::io::Error),

    /// The node has an item count that is neither 2 nor 17.
    #[error("A trie node must have either 2 or 17 items (got {0})")]
    MalformedNodeShape(usize),

    /// The key of a leaf or extension node is not a byte string.
    #[error("Leaf and extension nodes require a partial path byte string")]
    MissingPathField,

    /// The key of a leaf or extension node holds no bytes, so it has no hex
    /// prefix flag.
    #[error("Leaf and extension nodes require a non-empty hex prefix encoded key")]
    EmptyCompactKey,

    /// The value of a leaf node is not a byte string.
    #[error("Leaf node requires a value byte string")]
    MissingValueField,

    /// The 17th item of a branch node is not a byte string.
    #[error("Branch node 17th item should be a byte string (value)")]
    InvalidBranchValue,

    /// The flag nibble of a hex prefix encoded key is not in `0..=3`.
    #[error("Unknown hex prefix flag: {0:#x}")]
    UnknownHexPrefix(Nibble),

    /// A child reference is a byte string that is neither empty nor a hash.
    #[error("Child reference of unexpected length {0} (expected 0 or 32)")]
    InvalidChildLength(usize),

    /// An embedded child is not a leaf.
    #[error("Embedded child must be a 2-item leaf node (got {kind} node with {items} items)")]
    InvalidEmbeddedNode {
        /// Item count of the embedded list.
        items: usize,
        /// The kind of node the embedded list would be.
        kind: NodeKind,
    },

    /// No decoder is registered for a codec.
    #[error("No decoder registered for multicodec {0:#x}")]
    UnknownCodec(u64),

    /// The assembler rejected an operation.
    #[error("Node assembler error: {0}")]
    Assembly(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Broad classes of [`DecodeError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCategory {
    /// The bytes could not be read or are not a valid RLP container.
    Container,

    /// Wrong item count or item type somewhere in the node.
    Structural,

    /// The items parse but break the rules of trie nodes.
    Semantic,

    /// The codec has no registered decoder.
    Registry,

    /// The output sink failed.
    Sink,
}

impl DecodeError {
    /// The class this error belongs to.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            DecodeError::Container(_) | DecodeError::Io(_) => ErrorCategory::Container,
            DecodeError::MalformedNodeShape(_)
            | DecodeError::MissingPathField
            | DecodeError::EmptyCompactKey
            | DecodeError::MissingValueField
            | DecodeError::InvalidBranchValue => ErrorCategory::Structural,
            DecodeError::UnknownHexPrefix(_)
            | DecodeError::InvalidChildLength(_)
            | DecodeError::InvalidEmbeddedNode { .. } => ErrorCategory::Semantic,
            DecodeError::UnknownCodec(_) => ErrorCategory::Registry,
            DecodeError::Assembly(_) => ErrorCategory::Sink,
        }
    }

    pub(crate) fn assembly<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Assembly(Box::new(err))
    }
}

/// A node after classification, borrowing its payload from the [`RawNode`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeShape<'a> {
    /// A leaf with its decoded path and raw value item.
    Leaf {
        /// The decoded key.
        path: PartialPath,
        /// The raw value item.
        value: &'a RawField,
    },

    /// An extension with its decoded path and raw child item.
    Extension {
        /// The decoded key.
        path: PartialPath,
        /// The raw child item.
        child: &'a RawField,
    },

    /// A branch with all 17 of its raw items.
    Branch(&'a [RawField]),
}

impl NodeShape<'_> {
    /// The kind of node this shape unpacks into.
    pub const fn kind(&self) -> NodeKind {
        match self {
            NodeShape::Leaf { .. } => NodeKind::Leaf,
            NodeShape::Extension { .. } => NodeKind::Extension,
            NodeShape::Branch(_) => NodeKind::Branch,
        }
    }
}

/// Decides the kind of `raw` from its item count and, for two-item nodes, the
/// hex prefix of its key.
pub fn classify(raw: &RawNode) -> DecodeResult<NodeShape<'_>> {
    match raw.len() {
        SHORT_NODE_ITEMS => {
            let (kind, path, payload) = decode_compact_key(&raw[0], &raw[1])?;
            match kind {
                NodeKind::Leaf => Ok(NodeShape::Leaf {
                    path,
                    value: payload,
                }),
                NodeKind::Extension => Ok(NodeShape::Extension {
                    path,
                    child: payload,
                }),
                // `decode_compact_key` only yields leaves and extensions.
                NodeKind::Branch | NodeKind::Unknown => unreachable!(),
            }
        }
        BRANCH_NODE_ITEMS => Ok(NodeShape::Branch(&raw[..])),
        n => Err(DecodeError::MalformedNodeShape(n)),
    }
}

/// Turns a raw child item into a [`ChildRef`].
///
/// `codec` is the multicodec used for links to hashed children.
pub fn resolve_child(field: &RawField, codec: u64) -> DecodeResult<ChildRef> {
    match field {
        RawField::Bytes(b) if b.is_empty() => Ok(ChildRef::Empty),
        RawField::Bytes(b) => {
            let hash: &[u8; 32] = b
                .as_slice()
                .try_into()
                .map_err(|_| DecodeError::InvalidChildLength(b.len()))?;

            Ok(ChildRef::Link(to_link(codec, &bytes_to_h256(hash))))
        }
        RawField::List(items) => resolve_embedded_child(items),
    }
}

fn resolve_embedded_child(items: &[RawField]) -> DecodeResult<ChildRef> {
    if items.len() != SHORT_NODE_ITEMS {
        return Err(DecodeError::InvalidEmbeddedNode {
            items: items.len(),
            kind: match items.len() {
                BRANCH_NODE_ITEMS => NodeKind::Branch,
                _ => NodeKind::Unknown,
            },
        });
    }

    match decode_compact_key(&items[0], &items[1])? {
        (NodeKind::Leaf, path, value) => {
            trace!("Resolved embedded leaf (path: {})", path);
            unpack_leaf(path, value).map(ChildRef::Inline)
        }
        (kind, ..) => Err(DecodeError::InvalidEmbeddedNode {
            items: items.len(),
            kind,
        }),
    }
}

/// Builds a [`LeafNode`] from its decoded path and raw value item.
pub fn unpack_leaf(path: PartialPath, value: &RawField) -> DecodeResult<LeafNode> {
    let value = value.as_bytes().ok_or(DecodeError::MissingValueField)?;

    Ok(LeafNode {
        path,
        value: value.clone(),
    })
}

/// Builds an [`ExtensionNode`] from its decoded path and raw child item.
pub fn unpack_extension(
    path: PartialPath,
    child: &RawField,
    codec: u64,
) -> DecodeResult<ExtensionNode> {
    Ok(ExtensionNode {
        path,
        child: resolve_child(child, codec)?,
    })
}

/// Builds a [`BranchNode`] from its 17 raw items.
pub fn unpack_branch(fields: &[RawField], codec: u64) -> DecodeResult<BranchNode> {
    if fields.len() != BRANCH_NODE_ITEMS {
        return Err(DecodeError::MalformedNodeShape(fields.len()));
    }

    let mut children: [ChildRef; BRANCH_WIDTH] = array::from_fn(|_| ChildRef::Empty);
    for (slot, field) in children.iter_mut().zip(fields) {
        *slot = resolve_child(field, codec)?;
    }

    let value = match &fields[BRANCH_WIDTH] {
        RawField::Bytes(v) if v.is_empty() => None,
        RawField::Bytes(v) => Some(v.clone()),
        RawField::List(_) => return Err(DecodeError::InvalidBranchValue),
    };

    Ok(BranchNode { children, value })
}

/// Unpacks an already parsed node.
pub fn decode_raw_node(raw: &RawNode, codec: u64) -> DecodeResult<DecodedNode> {
    let shape = classify(raw)?;
    trace!("Unpacking {} node (codec: {:#x})", shape.kind(), codec);

    let node = match shape {
        NodeShape::Leaf { path, value } => unpack_leaf(path, value)?.into(),
        NodeShape::Extension { path, child } => unpack_extension(path, child, codec)?.into(),
        NodeShape::Branch(fields) => unpack_branch(fields, codec)?.into(),
    };

    Ok(node)
}

/// Decodes an RLP encoded trie node into its typed form.
///
/// `codec` is the multicodec of the trie the node belongs to, and is used for
/// every link to a hashed child.
pub fn decode_node(input: &[u8], codec: u64) -> DecodeResult<DecodedNode> {
    let raw = parse_container(input)?;
    decode_raw_node(&raw, codec)
}

/// Decodes an RLP encoded trie node and writes it into `assembler`.
///
/// ```rust
/// # use mpt_ipld::{assembler::{TreeBuilder, Value}, decoding::decode, link::ETH_STATE_TRIE};
/// // A leaf with an empty remaining path holding "abc".
/// let encoded = [0xc5, 0x20, 0x83, b'a', b'b', b'c'];
///
/// let mut builder = TreeBuilder::default();
/// decode(&mut builder, &encoded, ETH_STATE_TRIE).unwrap();
///
/// let tree = builder.build().unwrap();
/// let leaf = tree.get("Leaf").unwrap();
/// assert_eq!(leaf.get("PartialPath"), Some(&Value::Bytes(vec![])));
/// assert_eq!(leaf.get("Value"), Some(&Value::Bytes(b"abc".to_vec())));
/// ```
pub fn decode<A: NodeAssembler>(assembler: &mut A, input: &[u8], codec: u64) -> DecodeResult<()> {
    decode_node(input, codec)?.assemble(assembler)
}

/// Like [`decode`], but reads the encoded node from `reader` first.
pub fn decode_reader<A, R>(assembler: &mut A, mut reader: R, codec: u64) -> DecodeResult<()>
where
    A: NodeAssembler,
    R: Read,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;

    decode(assembler, &buf, codec)
}
