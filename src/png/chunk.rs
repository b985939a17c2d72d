use super::*;

/// The 8 bytes at the start of every PNG data stream.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// The 4-byte name of a PNG chunk.
///
/// The case of each ascii letter doubles as a property bit (bit 5 of the
/// byte): ancillary, private, reserved, and safe-to-copy, in name order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PngChunkType(pub(crate) AsciiArray<4>);
#[allow(nonstandard_style)]
impl PngChunkType {
  /// `IHDR`: the image header, always the first chunk.
  pub const IHDR: Self = Self(AsciiArray(*b"IHDR"));
  /// `PLTE`: the palette for indexed color images.
  pub const PLTE: Self = Self(AsciiArray(*b"PLTE"));
  /// `IDAT`: a slice of the compressed image data.
  pub const IDAT: Self = Self(AsciiArray(*b"IDAT"));
  /// `IEND`: the end of the data stream.
  pub const IEND: Self = Self(AsciiArray(*b"IEND"));

  /// Ancillary chunks (lowercase first letter) can be skipped by a decoder
  /// that doesn't understand them; critical chunks can't.
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    (self.0 .0[0] & 32) != 0
  }
  /// If the chunk is privately defined rather than registered.
  #[inline]
  #[must_use]
  pub const fn is_private(self) -> bool {
    (self.0 .0[1] & 32) != 0
  }
  /// This bit is reserved, and should always be 0 at present.
  #[inline]
  #[must_use]
  pub const fn is_reserved(self) -> bool {
    (self.0 .0[2] & 32) != 0
  }
  /// If editors that don't understand the chunk may still copy it through.
  #[inline]
  #[must_use]
  pub const fn is_safe_to_copy(self) -> bool {
    (self.0 .0[3] & 32) != 0
  }
}
impl Debug for PngChunkType {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    core::fmt::Display::fmt(&self.0, f)
  }
}

/// An unparsed chunk from a PNG data stream.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PngRawChunk<'b> {
  pub(crate) chunk_type: PngChunkType,
  pub(crate) data: &'b [u8],
  pub(crate) declared_crc: u32,
}
impl Debug for PngRawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PngRawChunk")
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl<'b> PngRawChunk<'b> {
  /// The chunk's 4-byte name.
  #[inline]
  #[must_use]
  pub const fn chunk_type(&self) -> PngChunkType {
    self.chunk_type
  }
  /// The chunk's payload.
  #[inline]
  #[must_use]
  pub const fn data(&self) -> &'b [u8] {
    self.data
  }
  /// The CRC-32 the chunk claims for itself. Read but never verified here.
  #[inline]
  #[must_use]
  pub const fn declared_crc(&self) -> u32 {
    self.declared_crc
  }
}

/// Produces the chunks of a PNG data stream, with the ordering rules
/// enforced.
///
/// * The stream has to open with the PNG signature, then the first chunk has
///   to be `IHDR`, and only that one `IHDR`.
/// * Unknown ancillary chunks are skipped without comment.
/// * Unknown *critical* chunks end the whole decode with an error.
/// * `IEND` (or simply running out of bytes) ends iteration.
///
/// So the chunks a caller actually sees are one `IHDR` followed by zero or
/// more `IDAT`.
#[derive(Debug, Clone)]
pub struct PngChunkReader<'b> {
  bytes: &'b [u8],
  seen_ihdr: bool,
  done: bool,
}
impl<'b> PngChunkReader<'b> {
  /// Makes a new reader, checking the signature up front.
  pub fn new(bytes: &'b [u8]) -> PngResult<Self> {
    if bytes.len() < PNG_SIGNATURE.len() {
      return Err(PngError::PrematureEndOfFile);
    }
    let (signature, rest) = bytes.split_at(PNG_SIGNATURE.len());
    if signature != PNG_SIGNATURE {
      return Err(PngError::BadSignature);
    }
    Ok(Self { bytes: rest, seen_ihdr: false, done: false })
  }

  /// Frames one `{length, type, payload, crc}` record off the front of the
  /// remaining bytes.
  fn pull_chunk(&mut self) -> PngResult<PngRawChunk<'b>> {
    let (length_bytes, rest) = match self.bytes {
      [a, b, c, d, rest @ ..] => ([*a, *b, *c, *d], rest),
      _ => return Err(PngError::PrematureEndOfFile),
    };
    let length = u32::from_be_bytes(length_bytes) as usize;
    let (type_bytes, rest) = match rest {
      [a, b, c, d, rest @ ..] => ([*a, *b, *c, *d], rest),
      _ => return Err(PngError::PrematureEndOfFile),
    };
    let chunk_type = PngChunkType(AsciiArray(type_bytes));
    if rest.len() < length {
      return Err(PngError::PrematureEndOfFile);
    }
    let (data, rest) = rest.split_at(length);
    let (crc_bytes, rest) = match rest {
      [a, b, c, d, rest @ ..] => ([*a, *b, *c, *d], rest),
      _ => return Err(PngError::PrematureEndOfFile),
    };
    let declared_crc = u32::from_be_bytes(crc_bytes);
    self.bytes = rest;
    Ok(PngRawChunk { chunk_type, data, declared_crc })
  }

  /// Gives the next chunk the caller should care about, or `None` once the
  /// stream has properly ended.
  pub fn next_chunk(&mut self) -> PngResult<Option<PngRawChunk<'b>>> {
    loop {
      if self.done || self.bytes.is_empty() {
        return Ok(None);
      }
      let chunk = self.pull_chunk()?;
      if !self.seen_ihdr {
        if chunk.chunk_type() != PngChunkType::IHDR {
          return Err(PngError::InvalidFirstChunk);
        }
        self.seen_ihdr = true;
        return Ok(Some(chunk));
      }
      match chunk.chunk_type() {
        PngChunkType::IHDR => return Err(PngError::MultipleIHDR),
        PngChunkType::IDAT => return Ok(Some(chunk)),
        PngChunkType::IEND => {
          self.done = true;
          return Ok(None);
        }
        other if other.is_ancillary() => {
          log::trace!("skipping ancillary chunk: {other:?}");
        }
        _ => return Err(PngError::UnsupportedCriticalChunkEncountered),
      }
    }
  }
}
