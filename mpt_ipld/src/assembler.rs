//! Writing decoded nodes into a generic tree builder.
//!
//! A [`NodeAssembler`] receives a node as a flat sequence of map, key and
//! value operations, in the order the fields appear in the node:
//!
//! ```text
//! { "Leaf":      { "PartialPath": bytes, "Value": bytes } }
//! { "Extension": { "PartialPath": bytes, "Child": null | link | { "Leaf": {..} } } }
//! { "Branch":    { "Child0": .., .., "Child15": .., "Value": null | bytes } }
//! ```
//!
//! `PartialPath` is written as a byte string holding one nibble per byte.

use std::fmt::{self, Display};

use cid::Cid;
use log::trace;
use thiserror::Error;

use crate::{
    decoding::{DecodeError, DecodeResult},
    node::{BranchNode, ChildRef, DecodedNode, ExtensionNode, LeafNode, NodeKind},
};

const PARTIAL_PATH_KEY: &str = "PartialPath";
const VALUE_KEY: &str = "Value";
const CHILD_KEY: &str = "Child";

/// A sink that builds a tree from ordered map assembly calls.
///
/// Every value must be preceded by a key, except for the root (which is
/// always a map for trie nodes).
pub trait NodeAssembler {
    /// Error returned when the sink rejects an operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Starts a map with `len` entries.
    fn begin_map(&mut self, len: usize) -> Result<(), Self::Error>;

    /// Sets the key of the next entry of the current map.
    fn assemble_key(&mut self, key: &str) -> Result<(), Self::Error>;

    /// Assigns null to the pending key.
    fn assign_null(&mut self) -> Result<(), Self::Error>;

    /// Assigns a byte string to the pending key.
    fn assign_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Assigns a link to the pending key.
    fn assign_link(&mut self, link: &Cid) -> Result<(), Self::Error>;

    /// Ends the current map.
    fn finish_map(&mut self) -> Result<(), Self::Error>;
}

/// Wraps sink failures into [`DecodeError::Assembly`].
struct Writer<'a, A>(&'a mut A);

impl<A: NodeAssembler> Writer<'_, A> {
    fn begin_map(&mut self, len: usize) -> DecodeResult<()> {
        self.0.begin_map(len).map_err(DecodeError::assembly)
    }

    fn key(&mut self, key: &str) -> DecodeResult<()> {
        self.0.assemble_key(key).map_err(DecodeError::assembly)
    }

    fn null(&mut self) -> DecodeResult<()> {
        self.0.assign_null().map_err(DecodeError::assembly)
    }

    fn bytes(&mut self, bytes: &[u8]) -> DecodeResult<()> {
        self.0.assign_bytes(bytes).map_err(DecodeError::assembly)
    }

    fn link(&mut self, link: &Cid) -> DecodeResult<()> {
        self.0.assign_link(link).map_err(DecodeError::assembly)
    }

    fn finish_map(&mut self) -> DecodeResult<()> {
        self.0.finish_map().map_err(DecodeError::assembly)
    }

    /// Writes `{ kind: { .. } }`, with `body` filling in the inner map.
    fn tagged_map<F>(&mut self, kind: NodeKind, len: usize, body: F) -> DecodeResult<()>
    where
        F: FnOnce(&mut Self) -> DecodeResult<()>,
    {
        self.begin_map(1)?;
        self.key(kind.as_str())?;
        self.begin_map(len)?;
        body(self)?;
        self.finish_map()?;
        self.finish_map()
    }

    fn leaf(&mut self, leaf: &LeafNode) -> DecodeResult<()> {
        self.tagged_map(NodeKind::Leaf, 2, |w| {
            w.key(PARTIAL_PATH_KEY)?;
            w.bytes(leaf.path.as_nibbles())?;
            w.key(VALUE_KEY)?;
            w.bytes(&leaf.value)
        })
    }

    fn extension(&mut self, ext: &ExtensionNode) -> DecodeResult<()> {
        self.tagged_map(NodeKind::Extension, 2, |w| {
            w.key(PARTIAL_PATH_KEY)?;
            w.bytes(ext.path.as_nibbles())?;
            w.key(CHILD_KEY)?;
            w.child(&ext.child)
        })
    }

    fn branch(&mut self, branch: &BranchNode) -> DecodeResult<()> {
        self.tagged_map(NodeKind::Branch, branch.children.len() + 1, |w| {
            for (i, child) in branch.children.iter().enumerate() {
                w.key(&format!("{}{}", CHILD_KEY, i))?;
                w.child(child)?;
            }

            w.key(VALUE_KEY)?;
            match &branch.value {
                Some(v) => w.bytes(v),
                None => w.null(),
            }
        })
    }

    fn child(&mut self, child: &ChildRef) -> DecodeResult<()> {
        match child {
            ChildRef::Empty => self.null(),
            ChildRef::Link(link) => self.link(link),
            ChildRef::Inline(leaf) => self.leaf(leaf),
        }
    }
}

impl DecodedNode {
    /// Writes this node into `assembler`.
    pub fn assemble<A: NodeAssembler>(&self, assembler: &mut A) -> DecodeResult<()> {
        trace!("Assembling {} node", self.kind());

        let mut w = Writer(assembler);
        match self {
            DecodedNode::Leaf(leaf) => w.leaf(leaf),
            DecodedNode::Extension(ext) => w.extension(ext),
            DecodedNode::Branch(branch) => w.branch(branch),
        }
    }
}

/// An owned tree produced by [`TreeBuilder`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    /// Null.
    Null,

    /// A byte string.
    Bytes(Vec<u8>),

    /// A link to another node.
    Link(Cid),

    /// A map whose entries keep their assembly order.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Looks up `key` if this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The keys of this map in assembly order, or nothing if this is not a
    /// map.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let entries = match self {
            Value::Map(entries) => entries.as_slice(),
            _ => &[],
        };

        entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Link(link) => write!(f, "{}", link),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Errors produced by [`TreeBuilder`] when assembly calls arrive out of
/// order.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum BuildError {
    /// A value was assigned inside a map without a key.
    #[error("Tried to assign a value without assembling a key first")]
    MissingKey,

    /// A key was assembled while another key was still waiting for its
    /// value.
    #[error("Tried to assemble key {0:?} while a key was still pending")]
    KeyAlreadyPending(String),

    /// A key was assembled outside of any map.
    #[error("Tried to assemble key {0:?} outside of a map")]
    KeyOutsideMap(String),

    /// A map was finished with a different number of entries than it was
    /// started with.
    #[error("Map declared {expected} entries but got {got}")]
    LengthMismatch {
        /// Declared entry count.
        expected: usize,
        /// Actual entry count.
        got: usize,
    },

    /// `finish_map` was called with no open map.
    #[error("Tried to finish a map that was never begun")]
    NoOpenMap,

    /// A second root value was assigned.
    #[error("The root value has already been assigned")]
    RootAlreadyAssigned,

    /// The tree was taken before it was complete.
    #[error("The tree is incomplete")]
    Incomplete,
}

#[derive(Debug)]
struct OpenMap {
    expected: usize,
    entries: Vec<(String, Value)>,
    pending_key: Option<String>,
}

/// A [`NodeAssembler`] that builds an owned [`Value`] tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    stack: Vec<OpenMap>,
    root: Option<Value>,
}

impl TreeBuilder {
    /// Returns the finished tree.
    pub fn build(self) -> Result<Value, BuildError> {
        match (self.stack.is_empty(), self.root) {
            (true, Some(root)) => Ok(root),
            _ => Err(BuildError::Incomplete),
        }
    }

    fn assign(&mut self, value: Value) -> Result<(), BuildError> {
        match self.stack.last_mut() {
            Some(map) => {
                let key = map.pending_key.take().ok_or(BuildError::MissingKey)?;
                map.entries.push((key, value));
                Ok(())
            }
            None if self.root.is_none() => {
                self.root = Some(value);
                Ok(())
            }
            None => Err(BuildError::RootAlreadyAssigned),
        }
    }
}

impl NodeAssembler for TreeBuilder {
    type Error = BuildError;

    fn begin_map(&mut self, len: usize) -> Result<(), Self::Error> {
        if let Some(map) = self.stack.last() {
            if map.pending_key.is_none() {
                return Err(BuildError::MissingKey);
            }
        } else if self.root.is_some() {
            return Err(BuildError::RootAlreadyAssigned);
        }

        self.stack.push(OpenMap {
            expected: len,
            entries: Vec::with_capacity(len),
            pending_key: None,
        });

        Ok(())
    }

    fn assemble_key(&mut self, key: &str) -> Result<(), Self::Error> {
        let map = self
            .stack
            .last_mut()
            .ok_or_else(|| BuildError::KeyOutsideMap(key.to_string()))?;

        if map.pending_key.is_some() {
            return Err(BuildError::KeyAlreadyPending(key.to_string()));
        }
        map.pending_key = Some(key.to_string());

        Ok(())
    }

    fn assign_null(&mut self) -> Result<(), Self::Error> {
        self.assign(Value::Null)
    }

    fn assign_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.assign(Value::Bytes(bytes.to_vec()))
    }

    fn assign_link(&mut self, link: &Cid) -> Result<(), Self::Error> {
        self.assign(Value::Link(*link))
    }

    fn finish_map(&mut self) -> Result<(), Self::Error> {
        let map = self.stack.pop().ok_or(BuildError::NoOpenMap)?;

        if map.pending_key.is_some() {
            return Err(BuildError::MissingKey);
        }
        if map.entries.len() != map.expected {
            return Err(BuildError::LengthMismatch {
                expected: map.expected,
                got: map.entries.len(),
            });
        }

        self.assign(Value::Map(map.entries))
    }
}
