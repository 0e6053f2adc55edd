//! Decodes a few trie nodes and prints the trees they assemble into.

use hex_literal::hex;
use mpt_ipld::{
    assembler::TreeBuilder,
    decode_node,
    link::{node_cid, ETH_STATE_TRIE},
    registry::CodecRegistry,
    DecodeResult, TrieCodec,
};

fn main() -> DecodeResult<()> {
    let _ = pretty_env_logger::try_init();

    // A leaf holding the value "dog" under the remaining key nibbles `0x6f`.
    let leaf = hex!("c782206f83646f67");

    // An extension pointing at a node stored elsewhere.
    let extension = hex!(
        "e21aa056e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
    );

    // The typed form can be inspected directly:
    let node = decode_node(&extension, ETH_STATE_TRIE)?;
    println!("{} node links to {:?}", node.kind(), node.links());

    // Or assembled into a tree, picking the decoder from the codec:
    let registry = CodecRegistry::<TreeBuilder>::with_trie_codecs();
    for (name, encoded) in [("leaf", &leaf[..]), ("extension", &extension[..])] {
        let mut builder = TreeBuilder::default();
        registry.decode(TrieCodec::StateTrie.code(), &mut builder, encoded)?;

        let tree = builder
            .build()
            .expect("decoding always assembles a complete tree");
        println!("{} ({}): {}", name, node_cid(ETH_STATE_TRIE, encoded), tree);
    }

    Ok(())
}
