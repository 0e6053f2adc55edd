//! Decoding of Ethereum Merkle Patricia Trie nodes into content-addressed
//! trees.
//!
//! Every node of the state, storage, transaction and receipt tries is stored
//! as an RLP list. This crate turns one such list into a self-describing tree
//! in which every child stored elsewhere becomes a [CID](cid::Cid) link,
//! letting trie nodes be resolved and traversed like any other linked data.
//!
//! The entry points are [`decode_node`][decoding::decode_node], which returns
//! a typed [`DecodedNode`][node::DecodedNode], and [`decode`][decoding::decode],
//! which also writes the node into a [`NodeAssembler`][assembler::NodeAssembler].
//! Hosts that load nodes of several tries can dispatch on the link's codec
//! with a [`CodecRegistry`][registry::CodecRegistry].

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod assembler;
pub mod compact_key;
pub mod decoding;
pub mod link;
pub mod nibbles;
pub mod node;
pub mod raw;
pub mod registry;
mod utils;

#[cfg(test)]
pub(crate) mod testing_utils;

pub use decoding::{decode, decode_node, DecodeError, DecodeResult};
pub use link::TrieCodec;
pub use node::DecodedNode;
