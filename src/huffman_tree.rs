use alloc::vec::Vec;

use crate::{bit_source::BitSource, deflate::DeflateError, tree_entry::TreeEntry};

/// A canonical Huffman code, one entry per symbol.
///
/// Built from a list of code lengths alone (the canonical construction makes
/// the actual code values unambiguous). Symbol values are the entry indexes,
/// so a literal/length tree has entries `0..=287` and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
  pub(crate) entries: Vec<TreeEntry>,
  /// min and max just help speed up the matching process
  pub(crate) min_bit_count: u16,
  pub(crate) max_bit_count: u16,
}

impl HuffmanTree {
  /// Builds the tree for the given code lengths.
  ///
  /// `code_lengths[i]` is the bit count for symbol `i`, with 0 meaning that
  /// the symbol is absent from the code entirely.
  #[must_use]
  pub fn from_code_lengths(code_lengths: &[u16]) -> Self {
    let mut entries: Vec<TreeEntry> =
      code_lengths.iter().map(|&bit_count| TreeEntry { bit_count, bit_pattern: 0 }).collect();
    TreeEntry::fill_in_the_codes(&mut entries);

    let mut min_bit_count = u16::MAX;
    let mut max_bit_count = 0;
    for te in entries.iter().copied() {
      if te.bit_count == 0 {
        continue;
      }
      min_bit_count = min_bit_count.min(te.bit_count);
      max_bit_count = max_bit_count.max(te.bit_count);
    }
    if max_bit_count == 0 {
      min_bit_count = 0;
    }
    Self { entries, min_bit_count, max_bit_count }
  }

  /// Pulls bits from the source until they match one of the tree's codes,
  /// then gives back that code's symbol.
  ///
  /// ## Failure
  /// * [`CorruptSymbol`](DeflateError::CorruptSymbol) if the longest code
  ///   length is reached without a match.
  /// * [`EndOfStream`](DeflateError::EndOfStream) if the source runs out.
  pub fn pull_and_match(&self, bits: &mut BitSource<'_>) -> Result<usize, DeflateError> {
    if self.max_bit_count == 0 {
      return Err(DeflateError::CorruptSymbol);
    }
    let mut key = TreeEntry {
      bit_pattern: self.pull_key_bits(bits, u32::from(self.min_bit_count))?,
      bit_count: self.min_bit_count,
    };
    loop {
      if let Some(pos) = self.entries.iter().position(|&te| te == key) {
        return Ok(pos);
      }
      if key.bit_count >= self.max_bit_count {
        return Err(DeflateError::CorruptSymbol);
      }
      // new bits are pushed onto the bottom of our temporary key, like how
      // `next_bits_msb` packs them.
      key.bit_pattern <<= 1;
      key.bit_pattern |= self.pull_key_bits(bits, 1)?;
      key.bit_count += 1;
    }
  }

  #[inline]
  fn pull_key_bits(&self, bits: &mut BitSource<'_>, count: u32) -> Result<u16, DeflateError> {
    Ok(bits.next_bits_msb(count).ok_or(DeflateError::EndOfStream)? as u16)
  }
}
