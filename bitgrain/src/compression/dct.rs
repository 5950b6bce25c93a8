use std::f32::consts::PI;

use rayon::prelude::*;

/// Width and height of a transform block.
pub const BLOCK_SIZE: usize = 8;

/// Number of coefficients in a transform block.
pub const BLOCK_LEN: usize = BLOCK_SIZE * BLOCK_SIZE;

/// One block of quantized coefficients in natural (row-major) order.
pub type Block = [i16; BLOCK_LEN];

/// An 8x8 matrix of quantization steps in natural order.
pub type QuantizationMatrix = [u8; BLOCK_LEN];

/// Encoding quality from 1-100. Higher values keep more detail and produce
/// larger files.
///
/// Out of range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    /// Quality used when the caller does not pick one.
    pub const DEFAULT: Quality = Quality(85);

    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// Orthonormal DCT-II basis, `basis[u][x] = c(u) * cos((2x + 1)uπ / 16)`.
struct Basis([[f32; BLOCK_SIZE]; BLOCK_SIZE]);

impl Basis {
    fn new() -> Self {
        let n = BLOCK_SIZE as f32;
        let mut basis = [[0.0; BLOCK_SIZE]; BLOCK_SIZE];

        for (u, row) in basis.iter_mut().enumerate() {
            // according to the formula of DCT
            let cu = if u == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };

            for (x, value) in row.iter_mut().enumerate() {
                *value = cu * f32::cos((2.0 * x as f32 + 1.0) * u as f32 * PI / (2.0 * n));
            }
        }

        Self(basis)
    }
}

/// Perform a Discrete Cosine Transform on an 8x8 block of centered samples.
fn dct(input: &[f32; BLOCK_LEN], basis: &Basis) -> [f32; BLOCK_LEN] {
    let b = &basis.0;

    // Rows first, then columns
    let mut rows = [0.0f32; BLOCK_LEN];
    for y in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            rows[y * BLOCK_SIZE + u] = (0..BLOCK_SIZE)
                .map(|x| b[u][x] * input[y * BLOCK_SIZE + x])
                .sum();
        }
    }

    let mut output = [0.0f32; BLOCK_LEN];
    for v in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            output[v * BLOCK_SIZE + u] = (0..BLOCK_SIZE)
                .map(|y| b[v][y] * rows[y * BLOCK_SIZE + u])
                .sum();
        }
    }

    output
}

/// Perform an inverse Discrete Cosine Transform on an 8x8 block of
/// coefficients, returning centered samples.
fn idct(input: &[f32; BLOCK_LEN], basis: &Basis) -> [f32; BLOCK_LEN] {
    let b = &basis.0;

    let mut rows = [0.0f32; BLOCK_LEN];
    for v in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            rows[v * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                .map(|u| b[u][x] * input[v * BLOCK_SIZE + u])
                .sum();
        }
    }

    let mut output = [0.0f32; BLOCK_LEN];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            output[y * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                .map(|v| b[v][y] * rows[v * BLOCK_SIZE + x])
                .sum();
        }
    }

    output
}

/// JPEG 8x8 Base Quantization Matrix for a quality level of 50.
///
/// Instead of using this, utilize the [`quantization_matrix`] function to
/// get a quantization matrix corresponding to the image quality value.
#[rustfmt::skip]
const BASE_QUANTIZATION_MATRIX: [u16; BLOCK_LEN] = [
    16, 11, 10, 16,  24,  40,  51,  61,
    12, 12, 14, 19,  26,  58,  60,  55,
    14, 13, 16, 24,  40,  57,  69,  56,
    14, 17, 22, 29,  51,  87,  80,  62,
    18, 22, 37, 56,  68, 109, 103,  77,
    24, 35, 55, 64,  81, 104, 113,  92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103,  99,
];

/// Generate the 8x8 quantization matrix for the given quality level.
///
/// Every step is in `1..=255`; quality 100 gives all ones.
pub fn quantization_matrix(quality: Quality) -> QuantizationMatrix {
    let quality = quality.get() as f32;
    let factor = if quality < 50.0 {
        5000.0 / quality
    } else {
        200.0 - 2.0 * quality
    };

    BASE_QUANTIZATION_MATRIX.map(|i| {
        f32::floor((factor * i as f32 + 50.0) / 100.0).clamp(1.0, 255.0) as u8
    })
}

/// Quantize an input matrix, returning the result.
pub fn quantize(input: &[f32; BLOCK_LEN], quant_matrix: &QuantizationMatrix) -> Block {
    let mut output = [0i16; BLOCK_LEN];
    for ((o, v), q) in output.iter_mut().zip(input).zip(quant_matrix) {
        *o = (v / *q as f32).round() as i16;
    }

    output
}

/// Dequantize an input matrix, returning an approximation of the original.
pub fn dequantize(input: &Block, quant_matrix: &QuantizationMatrix) -> [f32; BLOCK_LEN] {
    let mut output = [0.0f32; BLOCK_LEN];
    for ((o, v), q) in output.iter_mut().zip(input).zip(quant_matrix) {
        *o = (*v as i32 * *q as i32) as f32;
    }

    output
}

/// Number of blocks needed to cover a plane.
pub fn block_count(width: u32, height: u32) -> usize {
    blocks_wide(width).saturating_mul((height as usize).div_ceil(BLOCK_SIZE))
}

fn blocks_wide(width: u32) -> usize {
    (width as usize).div_ceil(BLOCK_SIZE)
}

/// Take in a single channel plane and perform DCT and quantization on it,
/// returning one block of coefficients per 8x8 tile in raster order.
///
/// Tiles that hang over the right or bottom edge are padded by repeating
/// the last column and row, which is discarded again on decode.
pub fn dct_compress(
    plane: &[u8],
    width: u32,
    height: u32,
    quant_matrix: &QuantizationMatrix,
) -> Vec<Block> {
    let basis = Basis::new();
    let width = width as usize;
    let height = height as usize;
    let wide = blocks_wide(width as u32);

    (0..block_count(width as u32, height as u32))
        .into_par_iter()
        .map(|index| {
            let bx = (index % wide) * BLOCK_SIZE;
            let by = (index / wide) * BLOCK_SIZE;

            let mut chunk = [0.0f32; BLOCK_LEN];
            for y in 0..BLOCK_SIZE {
                let row = (by + y).min(height - 1) * width;
                for x in 0..BLOCK_SIZE {
                    let column = (bx + x).min(width - 1);
                    chunk[y * BLOCK_SIZE + x] = plane[row + column] as f32 - 128.0;
                }
            }

            quantize(&dct(&chunk, &basis), quant_matrix)
        })
        .collect()
}

/// Reverse [`dct_compress`], rebuilding a `width * height` plane from its
/// quantized blocks.
///
/// The caller guarantees `blocks.len() == block_count(width, height)`.
pub fn dct_decompress(
    blocks: &[Block],
    width: u32,
    height: u32,
    quant_matrix: &QuantizationMatrix,
) -> Vec<u8> {
    let basis = Basis::new();
    let width = width as usize;
    let wide = blocks_wide(width as u32);

    let mut plane = vec![0u8; width * height as usize];

    // Each band is up to eight rows tall and owns one row of blocks
    plane
        .par_chunks_mut(width * BLOCK_SIZE)
        .zip(blocks.par_chunks(wide))
        .for_each(|(band, band_blocks)| {
            let rows = band.len() / width;

            for (bi, block) in band_blocks.iter().enumerate() {
                let samples = idct(&dequantize(block, quant_matrix), &basis);
                let bx = bi * BLOCK_SIZE;

                for y in 0..rows {
                    for x in 0..BLOCK_SIZE.min(width - bx) {
                        let value = samples[y * BLOCK_SIZE + x] + 128.0;
                        band[y * width + bx + x] = value.round().clamp(0.0, 255.0) as u8;
                    }
                }
            }
        });

    plane
}
