use depng::{
  png::{decode_png, ImageHeader, PngError, PNG_SIGNATURE},
  zlib::ZlibError,
  Bitmap,
};

fn ihdr_data(width: u32, height: u32, bit_depth: u8, color_type: u8) -> [u8; 13] {
  let mut data = [0; 13];
  data[0..4].copy_from_slice(&width.to_be_bytes());
  data[4..8].copy_from_slice(&height.to_be_bytes());
  data[8] = bit_depth;
  data[9] = color_type;
  // compression, filter, and interlace methods stay 0
  data
}

/// One chunk: length, type, payload, and a CRC of zero (the decoder reads
/// the CRC but doesn't verify it).
fn chunk(ty: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut out = Vec::new();
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(ty);
  out.extend_from_slice(data);
  out.extend_from_slice(&[0; 4]);
  out
}

fn png_bytes(chunks: &[Vec<u8>]) -> Vec<u8> {
  let mut out = PNG_SIGNATURE.to_vec();
  for c in chunks {
    out.extend_from_slice(c);
  }
  out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
  let (a_, b_, c_) = (i32::from(a), i32::from(b), i32::from(c));
  let p = a_ + b_ - c_;
  let (pa, pb, pc) = ((p - a_).abs(), (p - b_).abs(), (p - c_).abs());
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Applies a filter *forward*, the way an encoder would, producing the wire
/// bytes for one scanline (filter type byte included).
fn filter_row(filter: u8, bpp: usize, previous: &[u8], raw: &[u8]) -> Vec<u8> {
  let mut out = vec![filter];
  for x in 0..raw.len() {
    let left = if x >= bpp { raw[x - bpp] } else { 0 };
    let up = previous[x];
    let up_left = if x >= bpp { previous[x - bpp] } else { 0 };
    let predictor = match filter {
      0 => 0,
      1 => left,
      2 => up,
      3 => (((u16::from(left)) + u16::from(up)) / 2) as u8,
      4 => paeth(left, up, up_left),
      _ => panic!("bad filter in test"),
    };
    out.push(raw[x].wrapping_sub(predictor));
  }
  out
}

/// 3x5 RGB8 rows with varied byte patterns.
fn sample_rows() -> Vec<Vec<u8>> {
  vec![
    vec![10, 20, 30, 40, 50, 60, 70, 80, 90],
    vec![15, 25, 35, 45, 55, 65, 75, 85, 95],
    vec![200, 210, 220, 230, 240, 250, 4, 14, 24],
    vec![0, 0, 0, 255, 255, 255, 128, 128, 128],
    vec![1, 3, 5, 7, 9, 11, 13, 15, 17],
  ]
}

/// The wire-format image data for `sample_rows`, one filter type per row.
fn sample_wire(filters: [u8; 5]) -> Vec<u8> {
  let rows = sample_rows();
  let zero_row = vec![0_u8; rows[0].len()];
  let mut wire = Vec::new();
  for (i, row) in rows.iter().enumerate() {
    let previous = if i == 0 { &zero_row } else { &rows[i - 1] };
    wire.extend_from_slice(&filter_row(filters[i], 3, previous, row));
  }
  wire
}

fn decode_to_rows(png: &[u8]) -> Result<(Option<ImageHeader>, Vec<Vec<u8>>), PngError> {
  let mut header = None;
  let mut rows: Vec<Vec<u8>> = Vec::new();
  decode_png(
    png,
    |h| header = Some(*h),
    |line, row| {
      assert_eq!(line as usize, rows.len(), "rows must arrive in order");
      rows.push(row.to_vec());
    },
  )?;
  Ok((header, rows))
}

#[test]
fn test_all_five_filter_types_reconstruct() {
  let wire = sample_wire([0, 1, 2, 3, 4]);
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &super::zlib_stored(&wire)),
    chunk(b"IEND", &[]),
  ]);
  let (header, rows) = decode_to_rows(&png).unwrap();
  let header = header.unwrap();
  assert_eq!(header.width, 3);
  assert_eq!(header.height, 5);
  assert_eq!(rows, sample_rows());
}

#[test]
fn test_scanline_split_across_two_idat_chunks() {
  // each IDAT is its own ZLIB stream, but a scanline is allowed to straddle
  // the boundary; 7 bytes is partway into the first row.
  let wire = sample_wire([0, 4, 1, 3, 2]);
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &super::zlib_stored(&wire[..7])),
    chunk(b"IDAT", &super::zlib_stored(&wire[7..])),
    chunk(b"IEND", &[]),
  ]);
  let (_, rows) = decode_to_rows(&png).unwrap();
  assert_eq!(rows, sample_rows());
}

#[test]
fn test_unknown_ancillary_chunks_are_skipped() {
  let wire = sample_wire([0, 0, 0, 0, 0]);
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"tEXt", b"Comment\0not interesting"),
    chunk(b"IDAT", &super::zlib_stored(&wire)),
    chunk(b"zzZz", &[1, 2, 3]),
    chunk(b"IEND", &[]),
  ]);
  let (_, rows) = decode_to_rows(&png).unwrap();
  assert_eq!(rows, sample_rows());
}

#[test]
fn test_bad_signature() {
  let mut png = png_bytes(&[chunk(b"IHDR", &ihdr_data(3, 5, 8, 2))]);
  png[0] = 0x89 + 1;
  assert_eq!(decode_to_rows(&png), Err(PngError::BadSignature));
  assert_eq!(decode_to_rows(&[]), Err(PngError::PrematureEndOfFile));
}

#[test]
fn test_first_chunk_must_be_ihdr() {
  let png = png_bytes(&[
    chunk(b"IDAT", &super::zlib_stored(&[])),
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
  ]);
  assert_eq!(decode_to_rows(&png), Err(PngError::InvalidFirstChunk));
}

#[test]
fn test_second_ihdr_is_an_error() {
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
  ]);
  assert_eq!(decode_to_rows(&png), Err(PngError::MultipleIHDR));
}

#[test]
fn test_unknown_critical_chunk_fails() {
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"ABCD", &[0; 4]),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_to_rows(&png), Err(PngError::UnsupportedCriticalChunkEncountered));
  // PLTE isn't interpreted by this decoder, and it's critical, so an indexed
  // image that carries one gets the same refusal.
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 3)),
    chunk(b"PLTE", &[0; 9]),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_to_rows(&png), Err(PngError::UnsupportedCriticalChunkEncountered));
}

#[test]
fn test_truncated_chunk() {
  let mut png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &super::zlib_stored(&sample_wire([0, 0, 0, 0, 0]))),
  ]);
  png.truncate(png.len() - 2);
  assert_eq!(decode_to_rows(&png), Err(PngError::PrematureEndOfFile));
}

#[test]
fn test_bad_filter_type_is_reported_after_good_rows() {
  let mut wire = sample_wire([0, 0, 0, 0, 0]);
  wire[10] = 9; // second row's filter type byte
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &super::zlib_stored(&wire)),
    chunk(b"IEND", &[]),
  ]);
  let mut rows = 0;
  let result = decode_png(&png, |_| (), |_, _| rows += 1);
  assert_eq!(result, Err(PngError::UnsupportedFilterType));
  // the first row was already out before the bad filter byte showed up.
  assert_eq!(rows, 1);
}

#[test]
fn test_zlib_failures_surface_as_png_errors() {
  let mut idat = super::zlib_stored(&sample_wire([0, 0, 0, 0, 0]));
  let end = idat.len() - 1;
  idat[end] ^= 0xFF;
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &idat),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(decode_to_rows(&png), Err(PngError::Zlib(ZlibError::ChecksumError)));
}

#[test]
fn test_one_bit_greyscale_rows_stay_packed() {
  // 12 pixels at 1 bit each: 2 bytes per scanline, high bit leftmost.
  let wire = [0, 0b1010_1010, 0b1100_0000, 0, 0b0101_0101, 0b0011_0000];
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(12, 2, 1, 0)),
    chunk(b"IDAT", &super::zlib_stored(&wire)),
    chunk(b"IEND", &[]),
  ]);
  let (_, rows) = decode_to_rows(&png).unwrap();
  assert_eq!(rows, vec![vec![0b1010_1010, 0b1100_0000], vec![0b0101_0101, 0b0011_0000]]);
}

#[test]
fn test_bitmap_from_png_rgb() {
  let raw_rows = sample_rows();
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(3, 5, 8, 2)),
    chunk(b"IDAT", &super::zlib_stored(&sample_wire([0, 1, 2, 3, 4]))),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = Bitmap::try_from_png_bytes(&png).unwrap();
  assert_eq!(bitmap.width, 3);
  assert_eq!(bitmap.height, 5);
  assert_eq!(bitmap.pixels.len(), 15);
  let top_left = bitmap.get(0, 0).unwrap();
  assert_eq!([top_left.r, top_left.g, top_left.b, top_left.a], [10, 20, 30, 255]);
  let x2y1 = bitmap.get(2, 1).unwrap();
  assert_eq!([x2y1.r, x2y1.g, x2y1.b, x2y1.a], [raw_rows[1][6], raw_rows[1][7], raw_rows[1][8], 255]);
}

#[test]
fn test_bitmap_from_png_replicates_small_greyscale() {
  let wire = [0, 0b1000_0000];
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(2, 1, 1, 0)),
    chunk(b"IDAT", &super::zlib_stored(&wire)),
    chunk(b"IEND", &[]),
  ]);
  let bitmap = Bitmap::try_from_png_bytes(&png).unwrap();
  assert_eq!(bitmap.pixels.len(), 2);
  let white = bitmap.get(0, 0).unwrap();
  assert_eq!([white.r, white.g, white.b, white.a], [255, 255, 255, 255]);
  let black = bitmap.get(1, 0).unwrap();
  assert_eq!([black.r, black.g, black.b, black.a], [0, 0, 0, 255]);
}

#[test]
fn test_bitmap_refuses_16_bit() {
  let png = png_bytes(&[
    chunk(b"IHDR", &ihdr_data(1, 1, 16, 2)),
    chunk(b"IDAT", &super::zlib_stored(&[0, 1, 2, 3, 4, 5, 6])),
    chunk(b"IEND", &[]),
  ]);
  assert_eq!(Bitmap::try_from_png_bytes(&png).unwrap_err(), PngError::UnsupportedConversion);
}

#[test]
fn test_random_bytes_never_panic() {
  for _ in 0..10 {
    let bytes = super::rand_bytes(1024);
    let _ = decode_to_rows(&bytes);
    // even with a valid signature stapled on the front.
    let mut signed = PNG_SIGNATURE.to_vec();
    signed.extend_from_slice(&bytes);
    let _ = decode_to_rows(&signed);
  }
}
