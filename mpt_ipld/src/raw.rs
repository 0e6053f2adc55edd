//! The undecoded shape of a trie node: nested byte strings and lists as they
//! come out of the node's RLP container.

use std::ops::Deref;

use enum_as_inner::EnumAsInner;
use log::trace;
use rlp::{Decodable, DecoderError, Prototype, Rlp};

/// A single item of an RLP container.
#[derive(Clone, Debug, EnumAsInner, Eq, Hash, PartialEq)]
pub enum RawField {
    /// An RLP byte string.
    Bytes(Vec<u8>),

    /// An RLP list of further items.
    List(Vec<RawField>),
}

impl RawField {
    /// The length in bytes of this item once RLP encoded.
    pub fn encoded_len(&self) -> usize {
        match self {
            RawField::Bytes(b) if b.len() == 1 && b[0] < 0x80 => 1,
            RawField::Bytes(b) => rlp_header_len(b.len()) + b.len(),
            RawField::List(items) => {
                let payload_len = items.iter().map(RawField::encoded_len).sum();
                rlp_header_len(payload_len) + payload_len
            }
        }
    }
}

impl From<Vec<u8>> for RawField {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for RawField {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<RawField>> for RawField {
    fn from(items: Vec<RawField>) -> Self {
        Self::List(items)
    }
}

impl Decodable for RawField {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        match rlp.prototype()? {
            Prototype::List(_) => decode_list_items(rlp).map(RawField::List),
            Prototype::Data(_) => decode_canonical_data(rlp).map(RawField::Bytes),
            Prototype::Null => Err(DecoderError::RlpIsTooShort),
        }
    }
}

/// The top-level list of items making up an encoded trie node.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct RawNode(pub Vec<RawField>);

impl Deref for RawNode {
    type Target = [RawField];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<RawField>> for RawNode {
    fn from(items: Vec<RawField>) -> Self {
        Self(items)
    }
}

/// Parses the RLP container of an encoded trie node.
///
/// The input must hold exactly one RLP list and nothing else. Any item
/// count is accepted here; deciding whether the count makes sense for a trie
/// node is left to the caller.
pub fn parse_container(bytes: &[u8]) -> Result<RawNode, DecoderError> {
    let rlp = Rlp::new(bytes);

    match rlp.prototype()? {
        Prototype::List(_) => (),
        Prototype::Data(_) => return Err(DecoderError::RlpExpectedToBeList),
        Prototype::Null => return Err(DecoderError::RlpIsTooShort),
    }

    if rlp.payload_info()?.total() != bytes.len() {
        // Trailing bytes after the node's list.
        return Err(DecoderError::RlpIsTooBig);
    }

    let items = decode_list_items(&rlp)?;
    trace!("Parsed node container with {} items", items.len());

    Ok(RawNode(items))
}

/// Decodes every item of a list, requiring the items to cover the list's
/// payload exactly.
fn decode_list_items(rlp: &Rlp) -> Result<Vec<RawField>, DecoderError> {
    let payload_len = rlp.payload_info()?.value_len;
    let count = rlp.item_count()?;

    let mut items = Vec::with_capacity(count);
    let mut consumed = 0;
    for i in 0..count {
        let item = rlp.at(i)?;
        consumed += item.as_raw().len();
        items.push(RawField::decode(&item)?);
    }

    if consumed != payload_len {
        return Err(DecoderError::RlpInconsistentLengthAndData);
    }

    Ok(items)
}

/// Single bytes below `0x80` are their own encoding and must not carry a
/// string header.
fn decode_canonical_data(rlp: &Rlp) -> Result<Vec<u8>, DecoderError> {
    let data = rlp.data()?;

    if rlp.as_raw().len() == 2 && data.len() == 1 && data[0] < 0x80 {
        return Err(DecoderError::RlpInvalidIndirection);
    }

    Ok(data.to_vec())
}

const fn rlp_header_len(payload_len: usize) -> usize {
    match payload_len < 56 {
        true => 1,
        false => 1 + (usize::BITS - payload_len.leading_zeros()).div_ceil(8) as usize,
    }
}

#[cfg(test)]
mod tests {
    use rlp::{DecoderError, RlpStream};

    use super::{parse_container, RawField, RawNode};
    use crate::testing_utils::{common_setup, encode_raw_node, leaf_raw};

    #[test]
    fn parses_flat_list_of_byte_strings() -> Result<(), DecoderError> {
        common_setup();

        let mut s = RlpStream::new_list(2);
        s.append(&vec![0x20_u8]);
        s.append(&b"abc".to_vec());

        let node = parse_container(&s.out())?;
        assert_eq!(
            node,
            RawNode(vec![
                RawField::Bytes(vec![0x20]),
                RawField::Bytes(b"abc".to_vec())
            ])
        );

        Ok(())
    }

    #[test]
    fn parses_nested_lists() -> Result<(), DecoderError> {
        let embedded = leaf_raw(&[0x31], b"v");
        let raw = RawNode(vec![RawField::Bytes(vec![0x11]), embedded.clone()]);

        let node = parse_container(&encode_raw_node(&raw))?;
        assert_eq!(node.len(), 2);
        assert_eq!(node[1], embedded);

        Ok(())
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_container(&[]), Err(DecoderError::RlpIsTooShort));
    }

    #[test]
    fn top_level_string_is_rejected() {
        let encoded = rlp::encode(&b"not a node".to_vec());

        assert_eq!(
            parse_container(&encoded),
            Err(DecoderError::RlpExpectedToBeList)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut encoded = rlp::encode_list::<Vec<u8>, _>(&[vec![0x20], vec![1, 2, 3]]).to_vec();
        encoded.push(0x80);

        assert_eq!(parse_container(&encoded), Err(DecoderError::RlpIsTooBig));
    }

    #[test]
    fn truncated_input_is_rejected() {
        let encoded = rlp::encode_list::<Vec<u8>, _>(&[vec![0x20], vec![1, 2, 3]]);

        assert!(parse_container(&encoded[..encoded.len() - 1]).is_err());
    }

    #[test]
    fn non_canonical_single_byte_is_rejected() {
        // [0x81 0x05] wraps a byte that encodes as itself.
        let encoded = [0xc3, 0x81, 0x05, 0x80];

        assert_eq!(
            parse_container(&encoded),
            Err(DecoderError::RlpInvalidIndirection)
        );
    }

    #[test]
    fn encoded_len_matches_rlp_encoding() {
        let fields = [
            RawField::Bytes(vec![]),
            RawField::Bytes(vec![0x7f]),
            RawField::Bytes(vec![0x80]),
            RawField::Bytes(vec![0xaa; 32]),
            RawField::Bytes(vec![0xbb; 56]),
            RawField::Bytes(vec![0xcc; 300]),
            leaf_raw(&[0x20], b"abc"),
            RawField::List(vec![RawField::Bytes(vec![0xdd; 60]), leaf_raw(&[0x3a], b"x")]),
        ];

        for field in fields {
            let encoded = encode_raw_node(&RawNode(vec![field.clone()]));
            let item = rlp::Rlp::new(&encoded).at(0).unwrap();

            assert_eq!(item.as_raw().len(), field.encoded_len());
        }
    }
}
