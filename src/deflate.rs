//! Decompresses DEFLATE data streams.
//!
//! * [DEFLATE Compressed Data Format Specification (RFC 1951)][rfc1951]
//!
//! [rfc1951]: https://datatracker.ietf.org/doc/html/rfc1951
//!
//! The only entry point is [`decompress`]: give it a [`BitSource`] over the
//! compressed bytes and a sink closure, and the sink is handed one byte
//! fragment per DEFLATE block as each block completes.

use alloc::vec::Vec;

use crate::{bit_source::BitSource, huffman_tree::HuffmanTree};

/// An error while decompressing DEFLATE data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateError {
  /// The input ran out before the stream was complete.
  EndOfStream,
  /// A stored block's length field doesn't match its check field.
  LengthCorrupt,
  /// A block used the reserved block type.
  InvalidBlockType,
  /// Some bits matched no code of the Huffman tree in use.
  CorruptSymbol,
  /// A dynamic tree asked to repeat the previous code length when there was
  /// no previous code length.
  InvalidDynamicReference,
  /// A back-reference reached further back than the bytes produced so far.
  CorruptDistance,
  /// A decoded symbol has no meaning at its position in the stream.
  InvalidSymbol,
}

/// Alias for a `Result` with [`DeflateError`].
pub type DeflateResult<T> = Result<T, DeflateError>;

const SYMBOL_END_OF_BLOCK: usize = 256;

/// Base copy length for back-reference symbols 257..=285.
const LENGTH_BASE: [u16; 29] = [
  3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
  163, 195, 227, 258,
];
/// Extra bits to read and add onto the base copy length.
const LENGTH_EXTRA_BITS: [u32; 29] = [
  0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
/// Base distance for distance symbols 0..=29.
const DISTANCE_BASE: [u16; 30] = [
  1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049,
  3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
/// Extra bits to read and add onto the base distance.
const DISTANCE_EXTRA_BITS: [u32; 30] = [
  0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13,
];
/// The scrambled order that dynamic blocks store code lengths for the
/// code-length alphabet itself.
const CODE_LENGTH_ORDER: [usize; 19] =
  [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// The literal/length tree that "fixed Huffman" blocks use.
fn fixed_lit_len_tree() -> HuffmanTree {
  let mut code_lengths = [0_u16; 288];
  for (n, cl) in code_lengths.iter_mut().enumerate() {
    *cl = match n {
      0..=143 => 8,
      144..=255 => 9,
      256..=279 => 7,
      _ => 8,
    };
  }
  HuffmanTree::from_code_lengths(&code_lengths)
}

/// The distance tree that "fixed Huffman" blocks use.
fn fixed_dist_tree() -> HuffmanTree {
  HuffmanTree::from_code_lengths(&[5_u16; 30])
}

/// Decompresses one whole DEFLATE stream.
///
/// The `sink` is called once per block, in stream order, with the bytes that
/// the block decompressed to. The slice handed to the sink is only valid for
/// the duration of the call.
///
/// The decompressor keeps the complete decompressed stream around while it
/// works: back-references may legally reach up to 32,768 bytes behind the
/// current position, across block boundaries.
pub fn decompress<F: FnMut(&[u8])>(bits: &mut BitSource<'_>, mut sink: F) -> DeflateResult<()> {
  let mut output: Vec<u8> = Vec::new();
  let mut fragment_start = 0_usize;
  loop {
    let bfinal = bits.next_one_bit().ok_or(DeflateError::EndOfStream)? != 0;
    let btype = bits.next_bits_lsb(2).ok_or(DeflateError::EndOfStream)?;
    log::trace!("deflate block: bfinal={bfinal}, btype={btype}");
    match btype {
      0b00 => decompress_stored_block(bits, &mut output)?,
      0b01 => decompress_block(bits, &fixed_lit_len_tree(), &fixed_dist_tree(), &mut output)?,
      0b10 => {
        let (lit_len_tree, dist_tree) = construct_dynamic_trees(bits)?;
        decompress_block(bits, &lit_len_tree, &dist_tree, &mut output)?;
      }
      _ => return Err(DeflateError::InvalidBlockType),
    }
    sink(&output[fragment_start..]);
    fragment_start = output.len();
    if bfinal {
      return Ok(());
    }
  }
}

/// Handles a block of raw bytes: skip to a byte boundary, then LEN, the
/// one's complement check NLEN, and LEN bytes of literal data.
fn decompress_stored_block(bits: &mut BitSource<'_>, output: &mut Vec<u8>) -> DeflateResult<()> {
  bits.skip_to_byte_boundary();
  let len = bits.next_bits_lsb(16).ok_or(DeflateError::EndOfStream)?;
  let nlen = bits.next_bits_lsb(16).ok_or(DeflateError::EndOfStream)?;
  if (len ^ 0xFFFF) != nlen {
    return Err(DeflateError::LengthCorrupt);
  }
  output.reserve(len as usize);
  for _ in 0..len {
    let byte = bits.next_bits_lsb(8).ok_or(DeflateError::EndOfStream)?;
    output.push(byte as u8);
  }
  Ok(())
}

/// Reads the compressed code-length lists of a dynamic block and builds the
/// block's literal/length and distance trees.
fn construct_dynamic_trees(bits: &mut BitSource<'_>) -> DeflateResult<(HuffmanTree, HuffmanTree)> {
  let hlit = bits.next_bits_lsb(5).ok_or(DeflateError::EndOfStream)? as usize + 257;
  let hdist = bits.next_bits_lsb(5).ok_or(DeflateError::EndOfStream)? as usize + 1;
  let hclen = bits.next_bits_lsb(4).ok_or(DeflateError::EndOfStream)? as usize + 4;

  // The code lengths for the code-length alphabet itself, stored in the
  // scrambled order; positions past hclen stay 0.
  let mut code_lengths = [0_u16; 19];
  for position in CODE_LENGTH_ORDER.iter().copied().take(hclen) {
    code_lengths[position] = bits.next_bits_lsb(3).ok_or(DeflateError::EndOfStream)? as u16;
  }
  let code_length_tree = HuffmanTree::from_code_lengths(&code_lengths);

  // hlit + hdist code lengths follow, compressed with that tree's literal
  // symbols (0..=15) and run symbols (16, 17, 18).
  let mut lengths: Vec<u16> = Vec::with_capacity(hlit + hdist);
  while lengths.len() < hlit + hdist {
    let symbol = code_length_tree.pull_and_match(bits)?;
    match symbol {
      0..=15 => lengths.push(symbol as u16),
      16 => {
        // copy the previous code length 3 to 6 times
        let previous = *lengths.last().ok_or(DeflateError::InvalidDynamicReference)?;
        let repeat = 3 + bits.next_bits_lsb(2).ok_or(DeflateError::EndOfStream)?;
        for _ in 0..repeat {
          lengths.push(previous);
        }
      }
      17 => {
        // repeat a code length of 0 for 3 to 10 times
        let repeat = 3 + bits.next_bits_lsb(3).ok_or(DeflateError::EndOfStream)?;
        for _ in 0..repeat {
          lengths.push(0);
        }
      }
      18 => {
        // repeat a code length of 0 for 11 to 138 times
        let repeat = 11 + bits.next_bits_lsb(7).ok_or(DeflateError::EndOfStream)?;
        for _ in 0..repeat {
          lengths.push(0);
        }
      }
      _ => return Err(DeflateError::CorruptSymbol),
    }
  }

  let (lit_len_lengths, dist_lengths) = lengths.split_at(hlit);
  Ok((
    HuffmanTree::from_code_lengths(lit_len_lengths),
    HuffmanTree::from_code_lengths(dist_lengths),
  ))
}

/// Runs the symbol loop of one compressed block, appending everything the
/// block produces onto `output`.
///
/// `output` holds the full stream decompressed so far, which is what
/// back-reference distances count against.
fn decompress_block(
  bits: &mut BitSource<'_>, lit_len_tree: &HuffmanTree, dist_tree: &HuffmanTree,
  output: &mut Vec<u8>,
) -> DeflateResult<()> {
  loop {
    let symbol = lit_len_tree.pull_and_match(bits)?;
    match symbol {
      0..=255 => output.push(symbol as u8),
      SYMBOL_END_OF_BLOCK => return Ok(()),
      257..=285 => {
        let n = symbol - 257;
        let length = usize::from(LENGTH_BASE[n])
          + bits.next_bits_lsb(LENGTH_EXTRA_BITS[n]).ok_or(DeflateError::EndOfStream)? as usize;

        let dist_symbol = dist_tree.pull_and_match(bits)?;
        if dist_symbol >= DISTANCE_BASE.len() {
          return Err(DeflateError::InvalidSymbol);
        }
        let distance = usize::from(DISTANCE_BASE[dist_symbol])
          + bits.next_bits_lsb(DISTANCE_EXTRA_BITS[dist_symbol]).ok_or(DeflateError::EndOfStream)?
            as usize;
        if distance > output.len() {
          return Err(DeflateError::CorruptDistance);
        }

        // copy byte by byte: when distance < length the reference overlaps
        // its own output and has to re-read the bytes it just produced.
        let mut pos = output.len() - distance;
        for _ in 0..length {
          let byte = output[pos];
          output.push(byte);
          pos += 1;
        }
      }
      _ => return Err(DeflateError::InvalidSymbol),
    }
  }
}
