//! Various helpers that don't fit well into any other module.

use ethereum_types::H256;

use crate::nibbles::Nibble;

pub(crate) const fn is_even(n: Nibble) -> bool {
    (n & 1) == 0
}

pub(crate) fn bytes_to_h256(b: &[u8; 32]) -> H256 {
    H256::from_slice(b)
}
