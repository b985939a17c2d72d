//! Decompresses ZLIB data streams.
//!
//! * [ZLIB Compressed Data Format Specification (RFC 1950)][rfc1950]
//!
//! [rfc1950]: https://datatracker.ietf.org/doc/html/rfc1950
//!
//! A ZLIB stream is a two byte header, an optional dictionary id, a DEFLATE
//! payload, and a four byte Adler-32 checksum of the *decompressed* data.

use crate::{adler32::Adler32, bit_source::BitSource, deflate, deflate::DeflateError};

/// An error while decompressing a ZLIB stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZlibError {
  /// The stream ended before the framing was complete.
  PrematureEndOfStream,
  /// The header names a compression method other than DEFLATE.
  UnsupportedCompressionMethod,
  /// The header bytes fail their own check value.
  HeaderChecksumError,
  /// The DEFLATE payload failed to decompress.
  Deflate(DeflateError),
  /// The decompressed data doesn't match the Adler-32 trailer.
  ChecksumError,
}
impl From<DeflateError> for ZlibError {
  #[inline]
  fn from(e: DeflateError) -> Self {
    Self::Deflate(e)
  }
}

/// Alias for a `Result` with [`ZlibError`].
pub type ZlibResult<T> = Result<T, ZlibError>;

/// DEFLATE is the only compression method ZLIB ever assigned.
const COMPRESSION_METHOD_DEFLATE: u8 = 8;
/// Header flag bit: a preset dictionary id follows the header.
const FLAG_FDICT: u8 = 1 << 5;

/// Decompresses one complete ZLIB stream.
///
/// `bytes` must be exactly the stream: header through trailer. The `sink` is
/// handed the decompressed data as a series of byte fragments in stream
/// order, each valid only for the duration of the call. The Adler-32 running
/// sum is updated over every fragment *before* the sink sees it, and checked
/// against the trailer once the DEFLATE payload is done.
///
/// A preset dictionary (the FDICT flag) is structurally accepted, but this
/// decoder has no dictionary to offer, so such streams fail once a
/// back-reference reaches into the missing history.
pub fn decompress<F: FnMut(&[u8])>(bytes: &[u8], mut sink: F) -> ZlibResult<()> {
  let (cmf, flg, rest) = match bytes {
    [cmf, flg, rest @ ..] => (*cmf, *flg, rest),
    _ => return Err(ZlibError::PrematureEndOfStream),
  };
  if (cmf & 0x0F) != COMPRESSION_METHOD_DEFLATE {
    return Err(ZlibError::UnsupportedCompressionMethod);
  }
  if (u32::from(cmf) * 256 + u32::from(flg)) % 31 != 0 {
    return Err(ZlibError::HeaderChecksumError);
  }
  log::trace!("zlib header: cinfo={cinfo}, flg={flg:#04X}", cinfo = cmf >> 4);

  let rest = if (flg & FLAG_FDICT) != 0 {
    // skip the dictionary id; it's only useful to a decoder that actually
    // carries preset dictionaries.
    match rest {
      [_, _, _, _, rest @ ..] => rest,
      _ => return Err(ZlibError::PrematureEndOfStream),
    }
  } else {
    rest
  };

  if rest.len() < 4 {
    return Err(ZlibError::PrematureEndOfStream);
  }
  let (payload, trailer) = rest.split_at(rest.len() - 4);
  let declared_checksum = u32::from_be_bytes(trailer.try_into().unwrap());

  let mut bits = BitSource::new(payload);
  let mut adler = Adler32::new();
  deflate::decompress(&mut bits, |fragment| {
    adler.update(fragment);
    sink(fragment);
  })?;

  if adler.value() != declared_checksum {
    return Err(ZlibError::ChecksumError);
  }
  Ok(())
}
