//! Container format: block splitting, per-block mode selection, and
//! bit-exact framing.
//!
//! Non-adaptive encoding treats the whole raster as a single pseudo-block.
//! Adaptive encoding splits the raster into 64x64 tiles and, for each,
//! picks whichever of row-major or transposed column-major scan (and
//! whichever of LZSS-compressed or raw storage) yields the smallest
//! record.

use log::{debug, trace};

use crate::error::CodecError;
use crate::preprocess::{self, BLOCK_SIZE};
use crate::{lzss, MAX_WIDTH};

const RECORD_HEADER_LEN: usize = 5; // 1 flags byte + 4 LE size bytes
const BLOCK_BYTES: usize = BLOCK_SIZE * BLOCK_SIZE;

const FLAG_HORIZONTAL: u8 = 0x02;
const FLAG_BEEN_ENCODED: u8 = 0x01;

/// Compress a raster into the self-describing container format described
/// in the crate's data model. `width` must be a positive multiple of 256
/// no greater than [`MAX_WIDTH`]. If `adaptive`, `input.len()` must be
/// evenly divisible by `width`, the resulting height must also be a
/// multiple of 256, and the block count must fit in 16 bits. The
/// non-adaptive path has no such divisibility requirement: any trailing
/// bytes past the last full row are excluded from the `model` step but
/// still carried through LZSS encoding as-is.
pub fn compress(input: &[u8], width: usize, adaptive: bool, model: bool) -> Result<Vec<u8>, CodecError> {
    if width == 0 || width % 256 != 0 || width > MAX_WIDTH {
        return Err(CodecError::InvalidWidth);
    }

    let mut output = Vec::with_capacity(input.len() / 2 + 16);
    output.push((width / 256) as u8);
    output.push(if model { 1 } else { 0 });

    if adaptive {
        if input.len() % width != 0 {
            return Err(CodecError::InvalidHeight);
        }
        let height = input.len() / width;
        if height == 0 || height % 256 != 0 {
            return Err(CodecError::NonAdaptiveHeight);
        }
        let blocks_x = width / BLOCK_SIZE;
        let blocks_y = height / BLOCK_SIZE;
        let block_count = blocks_x * blocks_y;
        if block_count > u16::MAX as usize {
            return Err(CodecError::TooManyBlocks);
        }
        debug!("adaptive compress: {blocks_x}x{blocks_y} blocks, model={model}");
        output.extend_from_slice(&(block_count as u16).to_be_bytes());
        for by in (0..height).step_by(BLOCK_SIZE) {
            for bx in (0..width).step_by(BLOCK_SIZE) {
                encode_block(input, width, bx, by, model, &mut output);
            }
        }
    } else {
        let height = input.len() / width;
        debug!("non-adaptive compress: {width}x{height} (+{} trailing bytes), model={model}", input.len() % width);
        output.extend_from_slice(&1u16.to_be_bytes());
        encode_whole(input, width, height, model, &mut output);
    }
    Ok(output)
}

/// Decompress a container produced by [`compress`]. Fails with
/// [`CodecError::Malformed`] if the input is shorter than the header, or
/// with [`CodecError::PayloadOverrun`] / [`CodecError::LengthMismatch`] if
/// a block record is internally inconsistent.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    if input.len() < 4 {
        return Err(CodecError::Malformed);
    }
    let width = (input[0] as usize) * 256;
    let model = input[1] == 1;
    let block_count = u16::from_be_bytes([input[2], input[3]]) as usize;
    let adaptive = block_count > 1;
    let mut pos = 4;

    if adaptive {
        if width == 0 {
            return Err(CodecError::Malformed);
        }
        let blocks_x = width / BLOCK_SIZE;
        if blocks_x == 0 || block_count % blocks_x != 0 {
            return Err(CodecError::Malformed);
        }
        let blocks_y = block_count / blocks_x;
        let height = blocks_y * BLOCK_SIZE;
        let mut output = vec![0u8; width * height];
        for i in 0..block_count {
            let (flags, payload) = read_record(input, &mut pos)?;
            let mut block = decode_block_payload(flags, payload, BLOCK_BYTES)?;
            if model {
                preprocess::remove_difference(&mut block, BLOCK_SIZE, BLOCK_SIZE);
            }
            if flags & FLAG_HORIZONTAL == 0 {
                preprocess::transpose_block(&mut block);
            }
            let bx = (i % blocks_x) * BLOCK_SIZE;
            let by = (i / blocks_x) * BLOCK_SIZE;
            splat_block(&mut output, width, bx, by, &block);
        }
        Ok(output)
    } else {
        let (flags, payload) = read_record(input, &mut pos)?;
        let been_encoded = flags & FLAG_BEEN_ENCODED != 0;
        let mut block = if been_encoded {
            lzss::decode(payload)?
        } else {
            payload.to_vec()
        };
        if model {
            if width == 0 {
                return Err(CodecError::LengthMismatch);
            }
            let height = block.len() / width;
            preprocess::remove_difference(&mut block, width, height);
        }
        Ok(block)
    }
}

fn encode_whole(input: &[u8], width: usize, height: usize, model: bool, output: &mut Vec<u8>) {
    let mut buf = input.to_vec();
    if model {
        preprocess::apply_difference(&mut buf, width, height);
    }
    let header_pos = output.len();
    output.push(FLAG_BEEN_ENCODED | FLAG_HORIZONTAL);
    output.extend_from_slice(&[0u8; 4]);

    match lzss::encode(&buf) {
        Ok(encoded) => {
            output.extend_from_slice(&encoded);
            let size = encoded.len() as u32;
            output[header_pos + 1..header_pos + 5].copy_from_slice(&size.to_le_bytes());
        }
        Err(_) => {
            trace!("lzss expansion, falling back to raw storage for whole-image block");
            output.truncate(header_pos + RECORD_HEADER_LEN);
            output.extend_from_slice(&buf);
            output[header_pos] &= !FLAG_BEEN_ENCODED;
            let size = buf.len() as u32;
            output[header_pos + 1..header_pos + 5].copy_from_slice(&size.to_le_bytes());
        }
    }
}

fn encode_block(input: &[u8], width: usize, bx: usize, by: usize, model: bool, output: &mut Vec<u8>) {
    let mut h_block = extract_block(input, width, bx, by);
    let mut v_block = h_block.clone();
    preprocess::transpose_block(&mut v_block);
    if model {
        preprocess::apply_difference(&mut h_block, BLOCK_SIZE, BLOCK_SIZE);
        preprocess::apply_difference(&mut v_block, BLOCK_SIZE, BLOCK_SIZE);
    }
    let h_out = lzss::encode(&h_block);
    let v_out = lzss::encode(&v_block);
    let h_size = size_of(&h_out);
    let v_size = size_of(&v_out);

    if h_size < v_size {
        write_record(output, FLAG_BEEN_ENCODED | FLAG_HORIZONTAL, &h_out.expect("h_size < v_size implies h compressed"));
    } else if v_size != BLOCK_BYTES {
        write_record(output, FLAG_BEEN_ENCODED, &v_out.expect("v_size != BLOCK_BYTES implies v compressed"));
    } else {
        write_record(output, FLAG_HORIZONTAL, &h_block);
    }
}

fn size_of(outcome: &Result<Vec<u8>, usize>) -> usize {
    match outcome {
        Ok(bytes) => bytes.len(),
        Err(failed_size) => *failed_size,
    }
}

fn extract_block(input: &[u8], width: usize, bx: usize, by: usize) -> Vec<u8> {
    let mut block = vec![0u8; BLOCK_BYTES];
    for row in 0..BLOCK_SIZE {
        let src = (by + row) * width + bx;
        let dst = row * BLOCK_SIZE;
        block[dst..dst + BLOCK_SIZE].copy_from_slice(&input[src..src + BLOCK_SIZE]);
    }
    block
}

fn splat_block(output: &mut [u8], width: usize, bx: usize, by: usize, block: &[u8]) {
    for row in 0..BLOCK_SIZE {
        let dst = (by + row) * width + bx;
        let src = row * BLOCK_SIZE;
        output[dst..dst + BLOCK_SIZE].copy_from_slice(&block[src..src + BLOCK_SIZE]);
    }
}

fn write_record(output: &mut Vec<u8>, flags: u8, payload: &[u8]) {
    output.push(flags);
    output.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    output.extend_from_slice(payload);
}

fn read_record<'a>(input: &'a [u8], pos: &mut usize) -> Result<(u8, &'a [u8]), CodecError> {
    if *pos + RECORD_HEADER_LEN > input.len() {
        return Err(CodecError::Malformed);
    }
    let flags = input[*pos];
    let size = u32::from_le_bytes(input[*pos + 1..*pos + 5].try_into().unwrap()) as usize;
    let payload_start = *pos + RECORD_HEADER_LEN;
    let payload_end = payload_start.checked_add(size).ok_or(CodecError::PayloadOverrun)?;
    if payload_end > input.len() {
        return Err(CodecError::PayloadOverrun);
    }
    *pos = payload_end;
    Ok((flags, &input[payload_start..payload_end]))
}

fn decode_block_payload(flags: u8, payload: &[u8], expected_len: usize) -> Result<Vec<u8>, CodecError> {
    let been_encoded = flags & FLAG_BEEN_ENCODED != 0;
    let block = if been_encoded {
        lzss::decode(payload)?
    } else {
        payload.to_vec()
    };
    if block.len() != expected_len {
        return Err(CodecError::LengthMismatch);
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_header() {
        let out = compress(b"", 256, false, false).unwrap();
        let expect = "01 00 00 01 03 00 00 00 00";
        assert_eq!(out, hex::decode(expect.replace(' ', "")).unwrap());
        assert_eq!(decompress(&out).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn repeated_byte_whole_image_roundtrip() {
        let data = vec![b'A'; 4096];
        let out = compress(&data, 256, false, false).unwrap();
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn incompressible_raw_fallback() {
        let mut data = Vec::with_capacity(4096);
        let mut x: u32 = 0xdead_beef;
        for _ in 0..4096 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            data.push((x & 0xFF) as u8);
        }
        let out = compress(&data, 256, false, false).unwrap();
        // header(4) + flags(1) + size(4) + raw payload(4096)
        assert_eq!(out.len(), 4 + 5 + 4096);
        assert_eq!(out[4], 0x02); // raw, horizontal
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn model_ramp_compresses_well() {
        let width = 256usize;
        let height = 256usize;
        let mut data = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                data[y * width + x] = (x % 256) as u8;
            }
        }
        let out = compress(&data, width, false, true).unwrap();
        assert!(out.len() < data.len() / 4);
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn adaptive_roundtrip_mixed_blocks() {
        let width = 256usize;
        let height = 256usize; // 16 blocks, 4x4
        let mut data = vec![0u8; width * height];
        for by in 0..4 {
            for bx in 0..4 {
                let horizontal_friendly = (bx + by) % 2 == 0;
                for row in 0..BLOCK_SIZE {
                    for col in 0..BLOCK_SIZE {
                        let y = by * BLOCK_SIZE + row;
                        let x = bx * BLOCK_SIZE + col;
                        data[y * width + x] = if horizontal_friendly {
                            (col % 8) as u8
                        } else {
                            (row % 8) as u8
                        };
                    }
                }
            }
        }
        let out = compress(&data, width, true, false).unwrap();
        assert_eq!(decompress(&out).unwrap(), data);

        let block_count = u16::from_be_bytes([out[2], out[3]]) as usize;
        assert_eq!(block_count, 16);
        let mut pos = 4;
        let mut horizontal_count = 0;
        for _ in 0..block_count {
            let flags = out[pos];
            if flags & FLAG_HORIZONTAL != 0 {
                horizontal_count += 1;
            }
            let size = u32::from_le_bytes(out[pos + 1..pos + 5].try_into().unwrap()) as usize;
            pos += RECORD_HEADER_LEN + size;
        }
        assert_eq!(horizontal_count, 8);
    }

    #[test]
    fn decompress_rejects_short_input() {
        assert_eq!(decompress(&[0x01, 0x00, 0x00]), Err(CodecError::Malformed));
    }

    #[test]
    fn decompress_rejects_payload_overrun() {
        // non-adaptive header + record claiming a huge payload
        let data = vec![0x01u8, 0x00, 0x00, 0x01, 0x02, 0xFF, 0xFF, 0xFF, 0x7F];
        assert_eq!(decompress(&data), Err(CodecError::PayloadOverrun));
    }

    #[test]
    fn invalid_width_rejected() {
        assert_eq!(compress(b"abc", 255, false, false), Err(CodecError::InvalidWidth));
        assert_eq!(compress(b"abc", 0, false, false), Err(CodecError::InvalidWidth));
    }

    #[test]
    fn non_multiple_height_rejected_for_adaptive() {
        let data = vec![0u8; 256 * 128];
        assert_eq!(compress(&data, 256, true, false), Err(CodecError::NonAdaptiveHeight));
    }

    #[test]
    fn non_adaptive_accepts_non_multiple_length() {
        let data = b"hello world!".to_vec();
        let out = compress(&data, 256, false, false).unwrap();
        assert_eq!(decompress(&out).unwrap(), data);
    }

    #[test]
    fn non_adaptive_model_accepts_non_multiple_length() {
        let data = b"hello world!".to_vec();
        let out = compress(&data, 256, false, true).unwrap();
        assert_eq!(decompress(&out).unwrap(), data);
    }
}
