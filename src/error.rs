//! Error types for the raster codec.
//!
//! Mirrors the three error kinds the codec can produce: invalid geometry
//! given to `compress`, a malformed or truncated container given to
//! `decompress`, and an internally inconsistent (but not truncated)
//! container. Encode-time LZSS expansion is never an error: it is absorbed
//! by the raw fallback in `serializer`.

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("width must be a positive multiple of 256 no greater than 65280")]
    InvalidWidth,
    #[error("input size is not evenly divisible by width")]
    InvalidHeight,
    #[error("height must be a multiple of 256 for adaptive encoding")]
    NonAdaptiveHeight,
    #[error("image has too many 64x64 blocks to address in 16 bits")]
    TooManyBlocks,
    #[error("container is malformed or truncated")]
    Malformed,
    #[error("block record payload overruns input buffer")]
    PayloadOverrun,
    #[error("decoded block length does not match declared geometry")]
    LengthMismatch,
}
