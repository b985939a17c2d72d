#![forbid(unsafe_code)]

//! Module for decoding PNG data.
//!
//! * [Portable Network Graphics (PNG) Specification (Third Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/png/
//!
//! ## Library Design Assumptions
//!
//! The entire PNG encoded source data stream has to be a single byte slice
//! already in memory. Decoded scanlines are handed out through a callback one
//! row at a time, so no full-image buffer is required unless the caller wants
//! one ([`Bitmap::try_from_png_bytes`](crate::Bitmap::try_from_png_bytes)
//! builds one for you).
//!
//! ## Decoding
//!
//! Call [`decode_png`] with the PNG bytes and two closures: one that gets the
//! parsed [`ImageHeader`] as soon as it's known, and one that gets each raw
//! scanline (row index plus the row's bytes, packed per the header's bit
//! depth and color type, filter byte already removed and undone).
//!
//! The lower layers are public too, if you want to drive them directly:
//! [`PngChunkReader`] for the chunk framing, [`crate::zlib`] and
//! [`crate::deflate`] for the compressed payload, and
//! [`ScanlineReconstructor`] for the filter reversal.
//!
//! ## Limitations
//!
//! * Interlaced images are rejected
//!   ([`UnsupportedInterlaceMethod`](PngError::UnsupportedInterlaceMethod)).
//! * Indexed color images decode to their raw palette indexes; `PLTE` itself
//!   is not understood, and since it's a critical chunk an indexed image that
//!   carries one fails with
//!   [`UnsupportedCriticalChunkEncountered`](PngError::UnsupportedCriticalChunkEncountered).
//! * The per-chunk CRC-32 values are carried on each chunk but not verified.

use crate::{
  ascii_array::AsciiArray,
  zlib::{self, ZlibError},
};
use core::fmt::Debug;

mod chunk;
pub use chunk::*;

mod ihdr;
pub use ihdr::*;

mod unfilter;
pub use unfilter::*;

/// An error while decoding PNG data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngError {
  /// The data ran out mid-structure.
  PrematureEndOfFile,
  /// The first 8 bytes aren't the PNG signature.
  BadSignature,
  /// The first chunk isn't `IHDR`.
  InvalidFirstChunk,
  /// More than one `IHDR` chunk appeared.
  MultipleIHDR,
  /// A chunk this decoder doesn't know, but which is marked critical.
  ///
  /// A decoder may skip ancillary chunks it doesn't understand, but critical
  /// chunks it has to either handle or give up on.
  UnsupportedCriticalChunkEncountered,
  /// Width is out of range (over `2^31 - 1`).
  InvalidWidth,
  /// Height is out of range (over `2^31 - 1`).
  InvalidHeight,
  /// The color type and bit depth don't form one of the legal pairs.
  InvalidColorTypeAndBitDepthCombination,
  /// `IHDR` names a compression method other than deflate (0).
  UnsupportedCompressionMethod,
  /// `IHDR` names a filter method other than adaptive (0).
  UnsupportedFilterMethod,
  /// `IHDR` names an interlace method other than none (0).
  UnsupportedInterlaceMethod,
  /// The image data failed to decompress.
  Zlib(ZlibError),
  /// A scanline's filter type byte is outside `0..=4`.
  UnsupportedFilterType,
  /// The pixel format is one this crate can't convert to RGBA8.
  UnsupportedConversion,
}
impl From<ZlibError> for PngError {
  #[inline]
  fn from(e: ZlibError) -> Self {
    Self::Zlib(e)
  }
}

/// Alias for a `Result` with [`PngError`].
pub type PngResult<T> = Result<T, PngError>;

/// Decodes a PNG data stream down to its raw scanlines.
///
/// * `header_fn` is called once, with the validated [`ImageHeader`], before
///   any scanline comes out.
/// * `row_fn` is called once per reconstructed scanline, top to bottom, with
///   the row index and the row's raw bytes (no filter byte). The slice is
///   only valid for the duration of the call.
///
/// Each `IDAT` chunk is decompressed as its own self-contained ZLIB stream
/// sized by the chunk length. A scanline may still straddle two `IDAT`
/// chunks: the reconstructor carries its partial row across streams.
///
/// ## Failure
///
/// The first error at any layer wins and decoding stops, but rows already
/// handed to `row_fn` before the error remain valid.
pub fn decode_png<H, R>(bytes: &[u8], mut header_fn: H, mut row_fn: R) -> PngResult<()>
where
  H: FnMut(&ImageHeader),
  R: FnMut(u32, &[u8]),
{
  let mut chunks = PngChunkReader::new(bytes)?;
  let first = chunks.next_chunk()?.ok_or(PngError::PrematureEndOfFile)?;
  // the reader guarantees the first chunk out is the one IHDR.
  debug_assert_eq!(first.chunk_type(), PngChunkType::IHDR);
  let header = ImageHeader::from_ihdr_chunk(&first)?;
  log::debug!("png header: {header:?}");
  header_fn(&header);

  let mut reconstructor = ScanlineReconstructor::new(&header);
  while let Some(chunk) = chunks.next_chunk()? {
    debug_assert_eq!(chunk.chunk_type(), PngChunkType::IDAT);
    zlib::decompress(chunk.data(), |fragment| reconstructor.process(fragment, &mut row_fn))?;
  }
  reconstructor.into_result()
}
