pub mod dct;
pub mod entropy;

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use rayon::prelude::*;

use crate::picture::Error;
use dct::{dct_compress, dct_decompress, QuantizationMatrix, BLOCK_LEN};

/// The size of compressed data in each plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneInfo {
    /// The size of the data when compressed
    pub size_compressed: usize,
}

/// Everything needed to find and dequantize the planes of a stream. Written
/// directly after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionInfo {
    /// Quantization steps shared by every plane
    pub quant_matrix: QuantizationMatrix,

    /// The compression information for each plane, in channel order
    pub planes: Vec<PlaneInfo>,
}

impl CompressionInfo {
    /// Length of the serialized info for `plane_count` planes.
    pub fn len_for(plane_count: usize) -> usize {
        BLOCK_LEN + 4 * plane_count
    }

    pub fn len(&self) -> usize {
        Self::len_for(self.planes.len())
    }

    /// Total size of every plane when compressed, saturating at
    /// `usize::MAX`.
    pub fn total_size_compressed(&self) -> usize {
        self.planes
            .iter()
            .fold(0usize, |total, p| total.saturating_add(p.size_compressed))
    }

    pub fn write_into<T: WriteBytesExt + Write>(&self, output: &mut T) -> Result<usize, std::io::Error> {
        output.write_all(&self.quant_matrix)?;

        for plane in &self.planes {
            output.write_u32::<LE>(plane.size_compressed as u32)?;
        }

        Ok(self.len())
    }

    /// Read the info for `plane_count` planes. Running out of input surfaces
    /// as an [`Error::Io`] with [`std::io::ErrorKind::UnexpectedEof`], so
    /// callers holding the whole stream should check its length first.
    pub fn read_from<T: Read + ReadBytesExt>(input: &mut T, plane_count: usize) -> Result<Self, Error> {
        let mut quant_matrix = [0u8; BLOCK_LEN];
        input.read_exact(&mut quant_matrix)?;

        if let Some(i) = quant_matrix.iter().position(|&q| q == 0) {
            return Err(Error::InvalidData(format!("zero quantization step at index {i}")));
        }

        let mut planes = Vec::with_capacity(plane_count);
        for _ in 0..plane_count {
            planes.push(PlaneInfo {
                size_compressed: input.read_u32::<LE>()? as usize,
            });
        }

        Ok(CompressionInfo { quant_matrix, planes })
    }
}

/// Transform, quantize and pack every plane, returning the packed data and
/// the info describing it.
pub fn compress(
    planes: &[Vec<u8>],
    width: u32,
    height: u32,
    quant_matrix: &QuantizationMatrix,
) -> Result<(Vec<u8>, CompressionInfo), Error> {
    let packed: Vec<Vec<u8>> = planes
        .par_iter()
        .map(|plane| entropy::encode_plane(&dct_compress(plane, width, height, quant_matrix)))
        .collect();

    let mut output_buf = Vec::with_capacity(packed.iter().map(Vec::len).sum());
    let mut output_info = CompressionInfo {
        quant_matrix: *quant_matrix,
        planes: Vec::with_capacity(packed.len()),
    };

    for (i, plane) in packed.iter().enumerate() {
        if u32::try_from(plane.len()).is_err() {
            return Err(Error::LimitExceeded(format!(
                "plane {i} compressed to {} bytes, more than a u32 can describe",
                plane.len()
            )));
        }

        log::trace!("plane {i}: {} bytes", plane.len());

        output_buf.extend_from_slice(plane);
        output_info.planes.push(PlaneInfo {
            size_compressed: plane.len(),
        });
    }

    Ok((output_buf, output_info))
}

/// Unpack and reconstruct every plane described by `compression_info` from
/// `input`, which holds the plane data back to back.
pub fn decompress(
    input: &[u8],
    compression_info: &CompressionInfo,
    width: u32,
    height: u32,
) -> Result<Vec<Vec<u8>>, Error> {
    let block_count = dct::block_count(width, height);

    // Slice out each plane before doing any work
    let mut compressed_planes = Vec::with_capacity(compression_info.planes.len());
    let mut offset = 0usize;
    for plane_info in &compression_info.planes {
        let end = offset
            .checked_add(plane_info.size_compressed)
            .filter(|&end| end <= input.len())
            .ok_or(Error::Truncated {
                needed: offset.saturating_add(plane_info.size_compressed),
                actual: input.len(),
            })?;

        compressed_planes.push(&input[offset..end]);
        offset = end;
    }

    // Process the compressed planes in parallel
    compressed_planes
        .par_iter()
        .map(|data| -> Result<Vec<u8>, Error> {
            let blocks = entropy::decode_plane(data, block_count)?;
            Ok(dct_decompress(&blocks, width, height, &compression_info.quant_matrix))
        })
        .collect()
}
