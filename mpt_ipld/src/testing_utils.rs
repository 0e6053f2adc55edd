use std::iter::once;

use hex_literal::hex;
use rlp::RlpStream;

use crate::raw::{RawField, RawNode};

/// An arbitrary keccak-256 sized hash used as a child reference.
pub(crate) const TEST_HASH: [u8; 32] =
    hex!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

pub(crate) fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

pub(crate) fn hash_field(hash: [u8; 32]) -> RawField {
    RawField::Bytes(hash.to_vec())
}

/// A two-item list holding a leaf. `key` is already hex prefix encoded.
pub(crate) fn leaf_raw(key: &[u8], value: &[u8]) -> RawField {
    RawField::List(vec![key.into(), value.into()])
}

/// A two-item list holding an extension. `key` is already hex prefix encoded.
pub(crate) fn ext_raw(key: &[u8], child: RawField) -> RawField {
    RawField::List(vec![key.into(), child])
}

pub(crate) fn branch_raw(children: [RawField; 16], value: Vec<u8>) -> RawNode {
    children
        .into_iter()
        .chain(once(RawField::Bytes(value)))
        .collect::<Vec<_>>()
        .into()
}

pub(crate) fn encode_raw_node(node: &RawNode) -> Vec<u8> {
    let mut stream = RlpStream::new_list(node.len());
    for field in node.iter() {
        append_field(&mut stream, field);
    }

    stream.out().to_vec()
}

fn append_field(stream: &mut RlpStream, field: &RawField) {
    match field {
        RawField::Bytes(bytes) => {
            stream.append(bytes);
        }
        RawField::List(items) => {
            stream.begin_list(items.len());
            for item in items {
                append_field(stream, item);
            }
        }
    }
}
