//! Dispatching encoded nodes to a decoder by multicodec.
//!
//! The registry is an ordinary value owned by whoever loads nodes; nothing is
//! registered globally.

use std::{collections::HashMap, fmt};

use log::debug;

use crate::{
    assembler::NodeAssembler,
    decoding::{decode, DecodeError, DecodeResult},
    link::{TrieCodec, ETH_STATE_TRIE, ETH_STORAGE_TRIE, ETH_TX_RECEIPT_TRIE, ETH_TX_TRIE},
};

/// A decoder that writes the node encoded in its input into an assembler.
pub type DecodeFn<A> = fn(&mut A, &[u8]) -> DecodeResult<()>;

fn decode_with<const CODEC: u64, A: NodeAssembler>(
    assembler: &mut A,
    input: &[u8],
) -> DecodeResult<()> {
    decode(assembler, input, CODEC)
}

/// Maps multicodec values to the decoders for their nodes.
pub struct CodecRegistry<A: NodeAssembler> {
    decoders: HashMap<u64, DecodeFn<A>>,
}

impl<A: NodeAssembler> CodecRegistry<A> {
    /// Creates a registry with no decoders.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry with the MPT node decoder registered for every
    /// [`TrieCodec`].
    pub fn with_trie_codecs() -> Self {
        let mut registry = Self::new();

        for codec in TrieCodec::ALL {
            let decoder: DecodeFn<A> = match codec {
                TrieCodec::TxTrie => decode_with::<ETH_TX_TRIE, A>,
                TrieCodec::TxReceiptTrie => decode_with::<ETH_TX_RECEIPT_TRIE, A>,
                TrieCodec::StateTrie => decode_with::<ETH_STATE_TRIE, A>,
                TrieCodec::StorageTrie => decode_with::<ETH_STORAGE_TRIE, A>,
            };
            registry.register(codec.code(), decoder);
        }

        registry
    }

    /// Registers `decoder` for `codec`, returning the decoder it replaces.
    pub fn register(&mut self, codec: u64, decoder: DecodeFn<A>) -> Option<DecodeFn<A>> {
        debug!("Registering decoder for multicodec {:#x}", codec);

        let prev = self.decoders.insert(codec, decoder);
        if prev.is_some() {
            debug!("Replaced the previous decoder for multicodec {:#x}", codec);
        }

        prev
    }

    /// The decoder registered for `codec`.
    pub fn decoder(&self, codec: u64) -> Option<DecodeFn<A>> {
        self.decoders.get(&codec).copied()
    }

    /// Whether a decoder is registered for `codec`.
    pub fn contains(&self, codec: u64) -> bool {
        self.decoders.contains_key(&codec)
    }

    /// All codecs with a registered decoder, in ascending order.
    pub fn codecs(&self) -> Vec<u64> {
        let mut codecs: Vec<_> = self.decoders.keys().copied().collect();
        codecs.sort_unstable();

        codecs
    }

    /// Decodes `input` with the decoder registered for `codec`.
    pub fn decode(&self, codec: u64, assembler: &mut A, input: &[u8]) -> DecodeResult<()> {
        let decoder = self
            .decoder(codec)
            .ok_or(DecodeError::UnknownCodec(codec))?;

        decoder(assembler, input)
    }
}

impl<A: NodeAssembler> Default for CodecRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: NodeAssembler> fmt::Debug for CodecRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("codecs", &self.codecs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;

    use super::{CodecRegistry, DecodeFn};
    use crate::{
        assembler::{TreeBuilder, Value},
        decoding::{DecodeError, DecodeResult, ErrorCategory},
        link::{to_link, ETH_STATE_TRIE, ETH_STORAGE_TRIE, ETH_TX_RECEIPT_TRIE, ETH_TX_TRIE},
        raw::{RawField, RawNode},
        testing_utils::{common_setup, encode_raw_node, hash_field, TEST_HASH},
    };

    fn ext_node() -> Vec<u8> {
        encode_raw_node(&RawNode(vec![
            RawField::Bytes(vec![0x11]),
            hash_field(TEST_HASH),
        ]))
    }

    fn child_link(tree: &Value) -> Option<&Value> {
        tree.get("Extension").and_then(|e| e.get("Child"))
    }

    #[test]
    fn trie_codecs_are_registered() {
        let registry = CodecRegistry::<TreeBuilder>::with_trie_codecs();

        assert_eq!(
            registry.codecs(),
            vec![ETH_TX_TRIE, ETH_TX_RECEIPT_TRIE, ETH_STATE_TRIE, ETH_STORAGE_TRIE]
        );
        assert!(registry.contains(ETH_STATE_TRIE));
        assert!(!registry.contains(0x71));
    }

    #[test]
    fn each_codec_links_children_with_its_own_codec() -> DecodeResult<()> {
        common_setup();

        let registry = CodecRegistry::<TreeBuilder>::with_trie_codecs();
        let encoded = ext_node();

        for codec in registry.codecs() {
            let mut builder = TreeBuilder::default();
            registry.decode(codec, &mut builder, &encoded)?;
            let tree = builder.build().unwrap();

            assert_eq!(
                child_link(&tree),
                Some(&Value::Link(to_link(codec, &H256(TEST_HASH))))
            );
        }

        Ok(())
    }

    #[test]
    fn unregistered_codec_is_rejected() {
        common_setup();

        let registry = CodecRegistry::<TreeBuilder>::new();
        let mut builder = TreeBuilder::default();
        let err = registry
            .decode(ETH_STATE_TRIE, &mut builder, &ext_node())
            .unwrap_err();

        assert!(matches!(err, DecodeError::UnknownCodec(ETH_STATE_TRIE)));
        assert_eq!(err.category(), ErrorCategory::Registry);
    }

    fn always_null(assembler: &mut TreeBuilder, _input: &[u8]) -> DecodeResult<()> {
        use crate::assembler::NodeAssembler;

        assembler.assign_null().map_err(|e| DecodeError::Assembly(Box::new(e)))
    }

    #[test]
    fn register_replaces_and_returns_previous_decoder() -> DecodeResult<()> {
        let mut registry = CodecRegistry::<TreeBuilder>::with_trie_codecs();

        let prev = registry.register(ETH_STATE_TRIE, always_null as DecodeFn<TreeBuilder>);
        assert!(prev.is_some());
        assert!(registry.register(0x71, always_null).is_none());

        let mut builder = TreeBuilder::default();
        registry.decode(ETH_STATE_TRIE, &mut builder, &ext_node())?;
        assert_eq!(builder.build().unwrap(), Value::Null);

        // The replaced decoder still works on its own.
        let mut builder = TreeBuilder::default();
        prev.unwrap()(&mut builder, &ext_node())?;
        assert!(child_link(&builder.build().unwrap()).is_some());

        Ok(())
    }

    #[test]
    fn registries_are_independent() {
        let mut a = CodecRegistry::<TreeBuilder>::new();
        let b = CodecRegistry::<TreeBuilder>::default();

        a.register(ETH_TX_TRIE, always_null);

        assert!(a.contains(ETH_TX_TRIE));
        assert!(!b.contains(ETH_TX_TRIE));
        assert_eq!(format!("{:?}", b), "CodecRegistry { codecs: [] }");
    }
}
