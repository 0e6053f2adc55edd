//! Hex prefix ("compact") key decoding for the two-item nodes.
//!
//! The first nibble of the first byte is a flag:
//!
//! | flag | node      | key length | nibbles dropped |
//! |------|-----------|------------|-----------------|
//! | `0`  | Extension | even       | 2               |
//! | `1`  | Extension | odd        | 1               |
//! | `2`  | Leaf      | even       | 2               |
//! | `3`  | Leaf      | odd        | 1               |
//!
//! Even length keys carry a padding nibble after the flag so that the key
//! still fills whole bytes.

use log::trace;

use crate::{
    decoding::{DecodeError, DecodeResult},
    nibbles::{Nibble, PartialPath},
    node::NodeKind,
    raw::RawField,
    utils::is_even,
};

/// Decodes the hex prefix encoded `first` item of a two-item node.
///
/// Returns the kind of node the flag designates, the de-compacted partial
/// path, and `second` (the node's value or child) untouched.
pub fn decode_compact_key<'a>(
    first: &RawField,
    second: &'a RawField,
) -> DecodeResult<(NodeKind, PartialPath, &'a RawField)> {
    let encoded = first.as_bytes().ok_or(DecodeError::MissingPathField)?;
    let first_byte = *encoded.first().ok_or(DecodeError::EmptyCompactKey)?;

    let flag: Nibble = first_byte >> 4;
    let kind = match NodeKind::from_hex_prefix_flag(flag) {
        NodeKind::Unknown => return Err(DecodeError::UnknownHexPrefix(flag)),
        kind => kind,
    };

    // Odd keys only lose the flag nibble, even keys also lose the padding.
    let skip = match is_even(flag) {
        true => 2,
        false => 1,
    };
    let path = PartialPath::from_bytes_skipping(encoded, skip);

    trace!("Decoded compact key (kind: {}, path: {})", kind, path);

    Ok((kind, path, second))
}
