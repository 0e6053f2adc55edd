//! Define [`Nibble`], [`PartialPath`] and how to expand bytes into nibbles.
use std::{
    fmt::{self, Debug, Display, LowerHex},
    ops::Deref,
};

// Use a whole byte for a Nibble just for convenience
/// A Nibble has 4 bits and is stored as `u8`.
pub type Nibble = u8;

/// Expands every byte of `bytes` into its two nibbles, high nibble first.
///
/// The output is always exactly twice as long as the input and every element
/// is in `0..=15`:
/// ```rust
/// # use mpt_ipld::nibbles::expand;
/// assert_eq!(expand(&[0x12, 0xab]), vec![0x1, 0x2, 0xa, 0xb]);
/// assert!(expand(&[]).is_empty());
/// ```
pub fn expand(bytes: &[u8]) -> Vec<Nibble> {
    let mut out = vec![0; bytes.len() * 2];

    for (i, b) in bytes.iter().enumerate() {
        out[2 * i] = b >> 4;
        out[2 * i + 1] = b & 0b00001111;
    }

    out
}

/// The remaining key segment held by a `Leaf` or `Extension` node after its
/// hex prefix has been removed.
///
/// Unlike the packed key types used for trie lookups, this keeps one
/// [`Nibble`] per element, since the decoded path is handed to the output
/// tree exactly as it is stored here.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct PartialPath(Vec<Nibble>);

impl PartialPath {
    /// Creates a `PartialPath` from a sequence of nibbles.
    ///
    /// # Panics
    /// Panics if any element is > `0xf`.
    pub fn from_nibbles(nibbles: Vec<Nibble>) -> Self {
        assert!(
            nibbles.iter().all(|n| *n <= 0xf),
            "Attempted to create a path containing a value greater than 15!"
        );

        Self(nibbles)
    }

    /// Expands `bytes` and drops the first `skip` nibbles.
    ///
    /// Dropping more nibbles than exist yields an empty path.
    pub(crate) fn from_bytes_skipping(bytes: &[u8], skip: usize) -> Self {
        let mut nibbles = expand(bytes);
        nibbles.drain(..skip.min(nibbles.len()));

        Self(nibbles)
    }

    /// The nibbles of the path, one per byte.
    pub fn as_nibbles(&self) -> &[Nibble] {
        &self.0
    }

    /// Consumes the path, returning its nibbles.
    pub fn into_nibbles(self) -> Vec<Nibble> {
        self.0
    }
}

impl Deref for PartialPath {
    type Target = [Nibble];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<PartialPath> for Vec<Nibble> {
    fn from(path: PartialPath) -> Self {
        path.0
    }
}

impl Display for PartialPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // By default, just use lower hex.
        <Self as LowerHex>::fmt(self, f)
    }
}

impl LowerHex for PartialPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for n in self.0.iter() {
            write!(f, "{:x}", n)?;
        }

        Ok(())
    }
}

// Manual impl in order to print the nibbles as a hex string.
impl Debug for PartialPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialPath")
            .field("count", &self.0.len())
            .field("nibbles", &format!("{self:x}"))
            .finish()
    }
}
