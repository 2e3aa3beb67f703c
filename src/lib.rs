//! # rasterzss
//!
//! A lossless codec for raw 8-bit grayscale images.
//!
//! * `search_buffer` maintains the sliding-window match index used during
//!   encoding.
//! * `lzss` is the token-level compressor/decompressor built on top of it.
//! * `preprocess` applies and reverses the row-differential predictor and
//!   the 64x64 block transpose used by adaptive scanning.
//! * `serializer` owns the container format: block splitting, per-block
//!   mode selection, and bit-exact framing.
//!
//! Everything here operates on in-memory buffers; file I/O and argument
//! parsing live in the `rasterzss` binary.
//!
//! ## Example
//!
//! ```rs
//! use rasterzss::{compress, decompress};
//! let raster = vec![0u8; 256 * 256];
//! let container = compress(&raster, 256, true, true).expect("compression failed");
//! let restored = decompress(&container).expect("decompression failed");
//! assert_eq!(raster, restored);
//! ```

pub mod error;
pub mod lzss;
pub mod preprocess;
pub mod search_buffer;
pub mod serializer;

pub use error::CodecError;
pub use serializer::{compress, decompress};

/// Largest width encodable in the container header's single-byte
/// `width / 256` field.
pub const MAX_WIDTH: usize = 65280;
