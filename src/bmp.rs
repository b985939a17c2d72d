#![forbid(unsafe_code)]

//! Module for encoding BMP data.
//!
//! Only the plain, uncompressed flavor of BMP is written: a
//! `BITMAPFILEHEADER`, a `BITMAPINFOHEADER`, and then the pixel rows. That
//! form is universally readable, which is the whole point of converting to
//! BMP in the first place.
//!
//! Structure layouts are from MSDN:
//! <https://learn.microsoft.com/en-us/windows/win32/api/wingdi/ns-wingdi-bitmapinfo>

use alloc::vec::Vec;

use bytemuck::bytes_of;
use pack1::{U16LE, U32LE};
use pixel_formats::{r8g8b8_Srgb, r8g8b8a8_Srgb};

use crate::bitmap::Bitmap;

/// An error while encoding BMP data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmpError {
  /// Only 24 and 32 bits per pixel can be written.
  InvalidBitsPerPixel,
  /// The pixel buffer holds fewer bytes than `width * height` pixels need.
  BufferTooSmall,
}

/// `BI_RGB`: no compression.
const BI_RGB: u32 = 0;

/// The two headers are 14 + 40 bytes, and the pixel data follows directly.
const PIXEL_DATA_OFFSET: u32 = 14 + 40;

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
struct BitmapFileHeader {
  ty: [u8; 2],
  file_size: U32LE,
  reserved1: U16LE,
  reserved2: U16LE,
  bitmap_offset: U32LE,
}

#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
#[repr(C)]
struct BitmapInfoHeader {
  size: U32LE,
  width: U32LE,
  height: U32LE,
  planes: U16LE,
  bits_per_pixel: U16LE,
  compression: U32LE,
  image_size: U32LE,
  pixels_per_meter_x: U32LE,
  pixels_per_meter_y: U32LE,
  colors_used: U32LE,
  important_colors: U32LE,
}

/// Encodes tightly packed RGB(A) pixel rows as an uncompressed BMP file.
///
/// * `pixels` is `width * height` pixels of 3 (RGB) or 4 (RGBA) bytes each,
///   row by row, **top row first**. Extra bytes past that are ignored.
/// * `bits_per_pixel` picks the output format: 24 or 32.
///
/// BMP stores its rows bottom-up with the channels flipped to BGR(A) and
/// each row padded out to a 4-byte boundary; all of that reshuffling happens
/// in here.
pub fn write_bmp(
  width: u32, height: u32, bits_per_pixel: u16, pixels: &[u8],
) -> Result<Vec<u8>, BmpError> {
  if bits_per_pixel != 24 && bits_per_pixel != 32 {
    return Err(BmpError::InvalidBitsPerPixel);
  }
  let bytes_per_pixel = usize::from(bits_per_pixel / 8);
  let w = width as usize;
  let h = height as usize;
  if pixels.len() < w * h * bytes_per_pixel {
    return Err(BmpError::BufferTooSmall);
  }

  // rows pad out to 4-byte boundaries.
  let row_length = (w * bytes_per_pixel + 3) & !3;
  let file_size = (PIXEL_DATA_OFFSET as usize) + row_length * h;

  let file_header = BitmapFileHeader {
    ty: *b"BM",
    file_size: U32LE::new(file_size as u32),
    reserved1: U16LE::new(0),
    reserved2: U16LE::new(0),
    bitmap_offset: U32LE::new(PIXEL_DATA_OFFSET),
  };
  let info_header = BitmapInfoHeader {
    size: U32LE::new(40),
    width: U32LE::new(width),
    height: U32LE::new(height),
    planes: U16LE::new(1),
    bits_per_pixel: U16LE::new(bits_per_pixel),
    compression: U32LE::new(BI_RGB),
    // image size may be 0 for BI_RGB
    image_size: U32LE::new(0),
    pixels_per_meter_x: U32LE::new(0),
    pixels_per_meter_y: U32LE::new(0),
    colors_used: U32LE::new(0),
    important_colors: U32LE::new(0),
  };

  let mut out: Vec<u8> = Vec::with_capacity(file_size);
  out.extend_from_slice(bytes_of(&file_header));
  out.extend_from_slice(bytes_of(&info_header));

  // positive height means bottom-up rows, so walk the input backwards.
  for y in (0..h).rev() {
    let row = &pixels[y * w * bytes_per_pixel..][..w * bytes_per_pixel];
    for px in row.chunks_exact(bytes_per_pixel) {
      out.push(px[2]);
      out.push(px[1]);
      out.push(px[0]);
      if bytes_per_pixel == 4 {
        out.push(px[3]);
      }
    }
    for _ in (w * bytes_per_pixel)..row_length {
      out.push(0);
    }
  }
  debug_assert_eq!(out.len(), file_size);
  Ok(out)
}

impl Bitmap<r8g8b8a8_Srgb> {
  /// Encodes the bitmap as a 32-bit uncompressed BMP file.
  pub fn to_bmp_bytes(&self) -> Result<Vec<u8>, BmpError> {
    let mut bytes: Vec<u8> = Vec::with_capacity(self.pixels.len() * 4);
    for p in self.pixels.iter() {
      bytes.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }
    write_bmp(self.width, self.height, 32, &bytes)
  }
}

impl Bitmap<r8g8b8_Srgb> {
  /// Encodes the bitmap as a 24-bit uncompressed BMP file.
  pub fn to_bmp_bytes(&self) -> Result<Vec<u8>, BmpError> {
    let mut bytes: Vec<u8> = Vec::with_capacity(self.pixels.len() * 3);
    for p in self.pixels.iter() {
      bytes.extend_from_slice(&[p.r, p.g, p.b]);
    }
    write_bmp(self.width, self.height, 24, &bytes)
  }
}
