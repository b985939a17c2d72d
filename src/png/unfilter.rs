use super::*;

use alloc::{vec, vec::Vec};

// From the PNG spec:
//
// > Filters are applied to **bytes**, not to pixels, regardless of the bit
// > depth or color type of the image.

const FILTER_NONE: u8 = 0;
const FILTER_SUB: u8 = 1;
const FILTER_UP: u8 = 2;
const FILTER_AVERAGE: u8 = 3;
const FILTER_PAETH: u8 = 4;

/// The Paeth filter function computes a simple linear function of the three
/// neighboring bytes (left `a`, above `b`, upper left `c`) and picks
/// whichever neighbor is closest to the computed value.
///
/// Neighbors that fall off the top or left edge of the image read as 0.
const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  // Note: the PNG spec requires these calculations to be exact, so we work in
  // i32, which fits any outcome of u8 math. It's also explicit that the order
  // of the comparisons must stay exactly like this (ties prefer `a`, then
  // `b`).
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Turns the decompressed image data back into raw scanlines.
///
/// The ZLIB layer hands out decompressed bytes in fragments of whatever size
/// the DEFLATE blocks happened to have, with no relation to the image's row
/// boundaries. This type buffers the spill-over, splits the stream back into
/// `1 + bytes_per_scanline` sized rows, un-applies each row's filter, and
/// hands the finished rows to a callback in top-to-bottom order.
///
/// Filtering looks one row up, so two row buffers are kept and swap roles
/// (current/previous) on every line.
#[derive(Debug, Clone)]
pub struct ScanlineReconstructor {
  bytes_per_pixel: usize,
  bytes_per_scanline: usize,
  scanlines: [Vec<u8>; 2],
  pending: Vec<u8>,
  current_line: u32,
  result: Option<PngError>,
}

impl ScanlineReconstructor {
  /// Makes a new reconstructor sized for the image the header describes.
  #[must_use]
  pub fn new(header: &ImageHeader) -> Self {
    let bytes_per_scanline = header.bytes_per_scanline();
    Self {
      bytes_per_pixel: header.bytes_per_pixel(),
      bytes_per_scanline,
      scanlines: [vec![0; bytes_per_scanline], vec![0; bytes_per_scanline]],
      pending: Vec::with_capacity(bytes_per_scanline + 1),
      current_line: 0,
      result: None,
    }
  }

  /// Feeds in the next fragment of decompressed image data, handing any
  /// scanlines it completes to `row_fn` as `(row_index, row_bytes)`.
  ///
  /// Once any scanline has failed, the error sticks: further fragments are
  /// ignored and no more rows come out. Pick the error up from
  /// [`into_result`](Self::into_result) when the stream is done.
  pub fn process<F: FnMut(u32, &[u8])>(&mut self, mut bytes: &[u8], row_fn: &mut F) {
    if self.result.is_some() {
      return; // don't make things worse
    }
    let wire_line_len = self.bytes_per_scanline + 1;

    // the pending partial scanline is always the first to take bytes.
    if !self.pending.is_empty() {
      let to_copy = (wire_line_len - self.pending.len()).min(bytes.len());
      let (head, tail) = bytes.split_at(to_copy);
      self.pending.extend_from_slice(head);
      bytes = tail;
      if self.pending.len() == wire_line_len {
        let pending = core::mem::take(&mut self.pending);
        self.reconstruct_scanline(&pending, row_fn);
        self.pending = pending;
        self.pending.clear();
      }
    }

    // whole scanlines straight out of the fragment.
    while self.result.is_none() && bytes.len() >= wire_line_len {
      let (line, rest) = bytes.split_at(wire_line_len);
      self.reconstruct_scanline(line, row_fn);
      bytes = rest;
    }

    // stash whatever's left for the next fragment.
    self.pending.extend_from_slice(bytes);
  }

  /// Ends the reconstructor, surfacing a sticky error if one happened.
  #[inline]
  pub fn into_result(self) -> PngResult<()> {
    match self.result {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  /// Un-filters one wire-format line (filter type byte plus filtered bytes)
  /// into the current row buffer and emits it.
  fn reconstruct_scanline<F: FnMut(u32, &[u8])>(&mut self, line: &[u8], row_fn: &mut F) {
    let (filter_type, filtered) = line.split_first().unwrap();
    debug_assert_eq!(filtered.len(), self.bytes_per_scanline);
    let [line_a, line_b] = &mut self.scanlines;
    let (current, previous) = if self.current_line % 2 == 0 {
      (&mut *line_a, &*line_b)
    } else {
      (&mut *line_b, &*line_a)
    };
    let bpp = self.bytes_per_pixel;

    match *filter_type {
      FILTER_NONE => current.copy_from_slice(filtered),
      FILTER_SUB => {
        for x in 0..filtered.len() {
          let left = if x >= bpp { current[x - bpp] } else { 0 };
          current[x] = filtered[x].wrapping_add(left);
        }
      }
      FILTER_UP => {
        for x in 0..filtered.len() {
          current[x] = filtered[x].wrapping_add(previous[x]);
        }
      }
      FILTER_AVERAGE => {
        for x in 0..filtered.len() {
          let left = if x >= bpp { current[x - bpp] } else { 0 };
          // the average is computed without overflow, then truncated.
          let average = ((u16::from(left) + u16::from(previous[x])) / 2) as u8;
          current[x] = filtered[x].wrapping_add(average);
        }
      }
      FILTER_PAETH => {
        for x in 0..filtered.len() {
          let left = if x >= bpp { current[x - bpp] } else { 0 };
          let up_left = if x >= bpp { previous[x - bpp] } else { 0 };
          current[x] = filtered[x].wrapping_add(paeth_predict(left, previous[x], up_left));
        }
      }
      other => {
        log::debug!("bad filter type {other} on line {line}", line = self.current_line);
        self.result = Some(PngError::UnsupportedFilterType);
        return;
      }
    }

    row_fn(self.current_line, current);
    self.current_line += 1;
  }
}
