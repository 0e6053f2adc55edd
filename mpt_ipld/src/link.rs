//! Content identifiers for trie nodes.
//!
//! Nodes are addressed by CIDv1 values whose multihash is the keccak-256 hash
//! of the node's RLP encoding (the same hash Ethereum uses to reference the
//! node from its parent), tagged with the multicodec of the trie the node
//! belongs to.

use std::fmt::{self, Display};

use cid::Cid;
use ethereum_types::H256;
use keccak_hash::keccak;
use multihash::Multihash;
use thiserror::Error;

/// Multihash code for keccak-256.
pub const KECCAK_256: u64 = 0x1b;

/// Multicodec for transaction trie nodes.
pub const ETH_TX_TRIE: u64 = 0x92;

/// Multicodec for receipt trie nodes.
pub const ETH_TX_RECEIPT_TRIE: u64 = 0x94;

/// Multicodec for state trie nodes.
pub const ETH_STATE_TRIE: u64 = 0x96;

/// Multicodec for storage trie nodes.
pub const ETH_STORAGE_TRIE: u64 = 0x98;

/// Builds the link to a node whose keccak-256 hash is `hash`, using `codec`
/// as the CID's content codec.
pub fn to_link(codec: u64, hash: &H256) -> Cid {
    // A 32-byte digest always fits.
    let mh = Multihash::<64>::wrap(KECCAK_256, hash.as_bytes())
        .expect("keccak-256 digest fits in Multihash<64>");

    Cid::new_v1(codec, mh)
}

/// The link a parent uses to reference the node encoded as `encoded_node`.
pub fn node_cid(codec: u64, encoded_node: &[u8]) -> Cid {
    to_link(codec, &keccak(encoded_node))
}

/// Error returned when a multicodec value is not one of the trie codecs.
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
#[error("Multicodec {0:#x} is not an Ethereum trie codec")]
pub struct UnknownTrieCodec(pub u64);

/// The Ethereum tries whose nodes share the MPT node encoding.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TrieCodec {
    /// Transaction trie (`eth-tx-trie`).
    TxTrie,

    /// Receipt trie (`eth-tx-receipt-trie`).
    TxReceiptTrie,

    /// State trie (`eth-state-trie`).
    StateTrie,

    /// Storage trie (`eth-storage-trie`).
    StorageTrie,
}

impl TrieCodec {
    /// All trie codecs, in multicodec order.
    pub const ALL: [TrieCodec; 4] = [
        TrieCodec::TxTrie,
        TrieCodec::TxReceiptTrie,
        TrieCodec::StateTrie,
        TrieCodec::StorageTrie,
    ];

    /// The multicodec value.
    pub const fn code(self) -> u64 {
        match self {
            TrieCodec::TxTrie => ETH_TX_TRIE,
            TrieCodec::TxReceiptTrie => ETH_TX_RECEIPT_TRIE,
            TrieCodec::StateTrie => ETH_STATE_TRIE,
            TrieCodec::StorageTrie => ETH_STORAGE_TRIE,
        }
    }

    /// The name of the codec in the multicodec table.
    pub const fn name(self) -> &'static str {
        match self {
            TrieCodec::TxTrie => "eth-tx-trie",
            TrieCodec::TxReceiptTrie => "eth-tx-receipt-trie",
            TrieCodec::StateTrie => "eth-state-trie",
            TrieCodec::StorageTrie => "eth-storage-trie",
        }
    }

    /// Returns the trie codec of `link` if it points at a trie node.
    ///
    /// Link loaders use this to pick the trie node decoder for a link and
    /// fall back to their own choice for anything else.
    pub fn for_link(link: &Cid) -> Option<Self> {
        Self::try_from(link.codec()).ok()
    }

    /// Builds a link to a node of this trie from the node's hash.
    pub fn link(self, hash: &H256) -> Cid {
        to_link(self.code(), hash)
    }
}

impl TryFrom<u64> for TrieCodec {
    type Error = UnknownTrieCodec;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(UnknownTrieCodec(code))
    }
}

impl From<TrieCodec> for u64 {
    fn from(codec: TrieCodec) -> Self {
        codec.code()
    }
}

impl Display for TrieCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
