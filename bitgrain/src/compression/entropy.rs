//! Packing of quantized blocks into bytes.
//!
//! Each block is written as a varint DC delta (against the previous block of
//! the same plane), then `(run, level)` pairs for the nonzero AC
//! coefficients in zigzag order, then [`END_OF_BLOCK`]. Levels are signed
//! varints, runs are single bytes.

use integer_encoding::VarInt;

use super::dct::{Block, BLOCK_LEN};
use crate::picture::Error;

/// Marks the end of a block. Never a valid run, which is at most 62.
pub const END_OF_BLOCK: u8 = 0x40;

/// Smallest possible encoding of a block: one DC byte and the end marker.
pub const MIN_BLOCK_LEN: usize = 2;

/// Largest possible encoding of a block.
pub const MAX_BLOCK_LEN: usize = 5 + (BLOCK_LEN - 1) * 6 + 1;

/// Zigzag order: `ZIGZAG[k]` is the natural index of the k-th coefficient
/// in the stream.
#[rustfmt::skip]
pub const ZIGZAG: [usize; BLOCK_LEN] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

fn push_varint(output: &mut Vec<u8>, value: i32) {
    let mut buf = [0u8; 10];
    let len = value.encode_var(&mut buf);
    output.extend_from_slice(&buf[..len]);
}

/// Pack the blocks of one plane.
pub fn encode_plane(blocks: &[Block]) -> Vec<u8> {
    let mut output = Vec::with_capacity(blocks.len() * MIN_BLOCK_LEN);
    let mut previous_dc = 0i32;

    for block in blocks {
        let dc = block[0] as i32;
        push_varint(&mut output, dc - previous_dc);
        previous_dc = dc;

        let mut run = 0u8;
        for &index in &ZIGZAG[1..] {
            let level = block[index];
            if level == 0 {
                run += 1;
                continue;
            }

            output.push(run);
            push_varint(&mut output, level as i32);
            run = 0;
        }

        output.push(END_OF_BLOCK);
    }

    output
}

/// Unpack exactly `block_count` blocks from `input`, which must be consumed
/// completely.
pub fn decode_plane(input: &[u8], block_count: usize) -> Result<Vec<Block>, Error> {
    let needed = block_count.saturating_mul(MIN_BLOCK_LEN);
    if input.len() < needed {
        return Err(Error::Truncated {
            needed,
            actual: input.len(),
        });
    }

    let mut reader = PlaneReader { input, offset: 0 };
    let mut blocks = Vec::with_capacity(block_count);
    let mut previous_dc = 0i16;

    for _ in 0..block_count {
        let mut block = [0i16; BLOCK_LEN];

        let delta = reader.read_varint()?;
        let dc = (previous_dc as i64)
            .checked_add(delta)
            .and_then(|dc| i16::try_from(dc).ok())
            .ok_or_else(|| Error::InvalidData(format!("DC value out of range at byte {}", reader.offset)))?;
        block[0] = dc;
        previous_dc = dc;

        let mut index = 1;
        loop {
            let run = reader.read_u8()?;
            if run == END_OF_BLOCK {
                break;
            }

            index += run as usize;
            if index >= BLOCK_LEN {
                return Err(Error::InvalidData(format!(
                    "coefficient run past end of block at byte {}",
                    reader.offset
                )));
            }

            let level = reader.read_varint()?;
            let level = match i16::try_from(level) {
                Ok(0) | Err(_) => {
                    return Err(Error::InvalidData(format!(
                        "bad coefficient {level} at byte {}",
                        reader.offset
                    )))
                }
                Ok(level) => level,
            };

            block[ZIGZAG[index]] = level;
            index += 1;
        }

        blocks.push(block);
    }

    if reader.offset != input.len() {
        return Err(Error::InvalidData(format!(
            "{} trailing bytes after plane",
            input.len() - reader.offset
        )));
    }

    Ok(blocks)
}

/// Bounds checked cursor over a plane's bytes.
struct PlaneReader<'a> {
    input: &'a [u8],
    offset: usize,
}

impl PlaneReader<'_> {
    fn truncated(&self) -> Error {
        Error::Truncated {
            needed: self.offset + 1,
            actual: self.input.len(),
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self.input.get(self.offset).ok_or_else(|| self.truncated())?;
        self.offset += 1;

        Ok(byte)
    }

    fn read_varint(&mut self) -> Result<i64, Error> {
        let (value, len) = i64::decode_var(&self.input[self.offset..]).ok_or_else(|| {
            if self.input[self.offset..].iter().all(|b| b & 0x80 != 0) {
                self.truncated()
            } else {
                Error::InvalidData(format!("malformed varint at byte {}", self.offset))
            }
        })?;
        self.offset += len;

        Ok(value)
    }
}
