use super::*;

/// The color layout of a PNG's pixels.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PngColorType(pub(crate) u8);
impl PngColorType {
  /// Greyscale.
  pub const Y: Self = Self(0);
  /// Red, green, blue.
  pub const RGB: Self = Self(2);
  /// Indexes into a palette.
  pub const INDEX: Self = Self(3);
  /// Greyscale with alpha.
  pub const YA: Self = Self(4);
  /// Red, green, blue, alpha.
  pub const RGBA: Self = Self(6);

  /// How many samples (channel values) each pixel carries.
  #[inline]
  #[must_use]
  pub const fn samples_per_pixel(self) -> usize {
    match self.0 {
      2 => 3,
      4 => 2,
      6 => 4,
      // greyscale, or indexes into a palette
      _ => 1,
    }
  }
}
impl Debug for PngColorType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match *self {
      PngColorType::Y => write!(f, "Y"),
      PngColorType::RGB => write!(f, "RGB"),
      PngColorType::INDEX => write!(f, "Index"),
      PngColorType::YA => write!(f, "YA"),
      PngColorType::RGBA => write!(f, "RGBA"),
      other => write!(f, "Illegal({})", other.0),
    }
  }
}

/// The parsed and validated content of an `IHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
  /// Width in pixels. At most `2^31 - 1`; zero is nonsense but the format
  /// doesn't forbid it.
  pub width: u32,
  /// Height in pixels. Same range as `width`.
  pub height: u32,
  /// Bits per sample: 1, 2, 4, 8, or 16 depending on the color type.
  pub bit_depth: u8,
  /// Pixel layout.
  pub color_type: PngColorType,
  /// Always 0 (deflate). Anything else fails validation.
  pub compression_method: u8,
  /// Always 0 (adaptive filtering). Anything else fails validation.
  pub filter_method: u8,
  /// Only 0 (no interlace) is supported here.
  pub interlace_method: u8,
}
impl ImageHeader {
  /// Parses and validates the header out of the `IHDR` chunk.
  ///
  /// ## Failure
  /// Any of the `IHDR`-related [`PngError`] kinds, one field at a time:
  /// width, height, the (color type, bit depth) pair, then the three method
  /// bytes.
  pub fn from_ihdr_chunk(chunk: &PngRawChunk<'_>) -> PngResult<Self> {
    let data = chunk.data();
    if data.len() < 13 {
      return Err(PngError::PrematureEndOfFile);
    }
    let header = Self {
      width: u32::from_be_bytes(data[0..4].try_into().unwrap()),
      height: u32::from_be_bytes(data[4..8].try_into().unwrap()),
      bit_depth: data[8],
      color_type: PngColorType(data[9]),
      compression_method: data[10],
      filter_method: data[11],
      interlace_method: data[12],
    };

    if header.width > 0x7FFF_FFFF {
      return Err(PngError::InvalidWidth);
    }
    if header.height > 0x7FFF_FFFF {
      return Err(PngError::InvalidHeight);
    }
    let depth_ok = match header.color_type {
      PngColorType::Y => [1, 2, 4, 8, 16].contains(&header.bit_depth),
      PngColorType::INDEX => [1, 2, 4, 8].contains(&header.bit_depth),
      PngColorType::RGB | PngColorType::YA | PngColorType::RGBA => {
        [8, 16].contains(&header.bit_depth)
      }
      _ => false,
    };
    if !depth_ok {
      return Err(PngError::InvalidColorTypeAndBitDepthCombination);
    }
    if header.compression_method != 0 {
      return Err(PngError::UnsupportedCompressionMethod);
    }
    if header.filter_method != 0 {
      return Err(PngError::UnsupportedFilterMethod);
    }
    if header.interlace_method != 0 {
      return Err(PngError::UnsupportedInterlaceMethod);
    }
    Ok(header)
  }

  /// Bits for one whole pixel.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(self) -> usize {
    self.color_type.samples_per_pixel() * (self.bit_depth as usize)
  }

  /// The byte step between a byte and "the corresponding byte of the pixel
  /// to the left", as the filters define it.
  ///
  /// Sub-byte formats pack more than one pixel per byte, and for them the
  /// filters operate on whole bytes, so the step is never less than 1.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self) -> usize {
    let bytes = self.bits_per_pixel() / 8;
    if bytes == 0 {
      1
    } else {
      bytes
    }
  }

  /// Bytes in one scanline, excluding the filter type byte that leads the
  /// scanline on the wire.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(self) -> usize {
    ((self.width as usize) * self.bits_per_pixel() + 7) / 8
  }
}
