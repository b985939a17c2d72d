#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

//! A crate to decode PNG data and encode BMP data.
//!
//! The decoding pipeline is a chain of small parts, each usable on its own:
//!
//! * [`BitSource`] pulls bits out of a byte slice in the two orderings that
//!   DEFLATE uses (data fields are packed LSB-first within each byte, Huffman
//!   codes MSB-first).
//! * [`HuffmanTree`] builds the canonical Huffman code for a list of code
//!   lengths and decodes one symbol at a time from a `BitSource`.
//! * [`deflate`] walks the DEFLATE block structure (stored, fixed Huffman,
//!   dynamic Huffman) and hands each decompressed block to a sink closure.
//! * [`zlib`] strips the ZLIB framing around a DEFLATE payload and checks the
//!   [`Adler32`] checksum of everything that came out.
//! * [`png`] frames the PNG byte stream into chunks, drives the ZLIB layer
//!   over the image data, and un-filters the output into raw scanlines.
//!
//! The [`Bitmap`] type and the [`bmp`] module sit on top of all that: decode a
//! whole PNG to RGBA pixels in one call, then write the pixels back out as an
//! uncompressed BMP file.
//!
//! Everything works on byte slices already in memory. There's no support for
//! incremental input, and no IO of any kind in the crate itself.

extern crate alloc;

mod ascii_array;
pub use ascii_array::*;

mod bit_source;
pub use bit_source::*;

mod tree_entry;

mod huffman_tree;
pub use huffman_tree::*;

mod adler32;
pub use adler32::*;

pub mod deflate;

pub mod zlib;

pub mod png;

mod bitmap;
pub use bitmap::*;

pub mod bmp;
