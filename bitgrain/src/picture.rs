//! The encode and decode pipelines, and [`BitgrainPicture`] which wraps them.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{ByteOrder, WriteBytesExt, LE};
use thiserror::Error;

use crate::{
    compression::{
        compress,
        dct::{block_count, quantization_matrix, Quality},
        decompress,
        entropy::MAX_BLOCK_LEN,
        CompressionInfo,
    },
    header::{ColorFormat, Header, HEADER_LEN},
    limits::Limits,
    operations::{interleave_planes, interleave_planes_into, split_planes},
};

/// Marks an optional trailer after the plane data.
const TRAILER_TAG: &[u8; 3] = b"BGx";

/// Trailer chunk type holding an ICC profile.
const TRAILER_ICC: u8 = 1;

/// Tag, chunk type and length.
const TRAILER_HEADER_LEN: usize = 8;

/// Settings for encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeParameters {
    /// A quality level from 1-100. Higher values provide better results.
    /// Default value is 85.
    pub quality: Quality,

    /// Limits the input image must fit in.
    pub limits: Limits,
}

/// Settings for decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeParameters {
    /// Limits checked against the header before anything is allocated.
    pub limits: Limits,
}

/// A decoded image, or one waiting to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitgrainPicture {
    header: Header,
    bitmap: Vec<u8>,
    icc_profile: Option<Vec<u8>>,
}

impl BitgrainPicture {
    /// Create an image from an interleaved bitmap. Nothing is compressed or
    /// encoded at this point.
    pub fn from_raw(
        width: u32,
        height: u32,
        color_format: ColorFormat,
        bitmap: Vec<u8>,
    ) -> Result<Self, Error> {
        check_input(&bitmap, width, height, color_format, &Limits::none())?;

        Ok(Self {
            header: Header::new(width, height, color_format, Quality::default()),
            bitmap,
            icc_profile: None,
        })
    }

    /// Attach an ICC profile, stored in the stream's trailer.
    pub fn with_icc_profile(mut self, icc_profile: Vec<u8>) -> Self {
        self.icc_profile = Some(icc_profile);
        self
    }

    /// Encode the image into a new buffer.
    pub fn encode(&self, parameters: &EncodeParameters) -> Result<Vec<u8>, Error> {
        encode_parts(
            &self.bitmap,
            self.header.width,
            self.header.height,
            self.header.color_format,
            parameters,
            self.icc_profile.as_deref(),
        )
    }

    /// Encode the image into anything that implements [Write], returning the
    /// number of bytes written.
    pub fn encode_to<O: Write + WriteBytesExt>(
        &self,
        mut output: O,
        parameters: &EncodeParameters,
    ) -> Result<usize, Error> {
        let encoded = self.encode(parameters)?;
        output.write_all(&encoded)?;

        Ok(encoded.len())
    }

    /// Encode the image and write it to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P, parameters: &EncodeParameters) -> Result<(), Error> {
        let mut output = BufWriter::new(File::create(path)?);
        self.encode_to(&mut output, parameters)?;
        output.flush()?;

        Ok(())
    }

    /// Decode an image from a complete `.bg` stream.
    pub fn decode(input: &[u8]) -> Result<Self, Error> {
        Self::decode_with(input, &DecodeParameters::default())
    }

    pub fn decode_with(input: &[u8], parameters: &DecodeParameters) -> Result<Self, Error> {
        let header = Header::parse(input)?;
        let (planes, icc_profile) = decode_payload(input, &header, &parameters.limits)?;

        Ok(Self {
            header,
            bitmap: interleave_planes(&planes, header.width, header.height),
            icc_profile,
        })
    }

    /// Decode the image from anything that implements [Read]
    pub fn decode_from<I: Read>(input: I, parameters: &DecodeParameters) -> Result<Self, Error> {
        let mut buffer = Vec::new();
        match parameters.limits.max_stream_bytes {
            Some(max) => {
                input.take(max.saturating_add(1)).read_to_end(&mut buffer)?;
                parameters.limits.check_stream(buffer.len() as u64)?;
            }
            None => {
                let mut input = input;
                input.read_to_end(&mut buffer)?;
            }
        }

        Self::decode_with(&buffer, parameters)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn color_format(&self) -> ColorFormat {
        self.header.color_format
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    /// The interleaved bitmap.
    pub fn as_raw(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.bitmap
    }
}

/// Open an image from the file at `path`.
pub fn open<P: AsRef<Path>>(path: P) -> Result<BitgrainPicture, Error> {
    let input = BufReader::new(File::open(path)?);

    BitgrainPicture::decode_from(input, &DecodeParameters::default())
}

/// Encode an interleaved bitmap into a new `.bg` stream.
pub fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    parameters: &EncodeParameters,
) -> Result<Vec<u8>, Error> {
    encode_parts(pixels, width, height, color_format, parameters, None)
}

/// Encode an interleaved bitmap into `dest`, returning the number of bytes
/// written. Only that many bytes of `dest` are meaningful.
///
/// If the stream does not fit, [`Error::CapacityExceeded`] is returned and
/// `dest` is left untouched.
pub fn encode_into(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    dest: &mut [u8],
    quality: Quality,
) -> Result<usize, Error> {
    let parameters = EncodeParameters {
        quality,
        ..Default::default()
    };
    let encoded = encode(pixels, width, height, color_format, &parameters)?;

    let capacity = dest.len();
    let target = dest.get_mut(..encoded.len()).ok_or(Error::CapacityExceeded {
        needed: encoded.len(),
        capacity,
    })?;
    target.copy_from_slice(&encoded);

    Ok(encoded.len())
}

/// An upper bound on the encoded size of an image without an ICC profile,
/// or `None` if it does not fit in a `usize`.
pub fn max_encoded_len(width: u32, height: u32, color_format: ColorFormat) -> Option<usize> {
    let channels = color_format.channels() as usize;

    block_count(width, height)
        .checked_mul(MAX_BLOCK_LEN)?
        .checked_mul(channels)?
        .checked_add(HEADER_LEN + CompressionInfo::len_for(channels))
}

/// Decode a `.bg` stream into `dest`, returning the parsed header.
///
/// `dest` must hold at least `width * height * channels` bytes. Nothing is
/// written to it unless the whole stream decodes.
pub fn decode_into(input: &[u8], dest: &mut [u8]) -> Result<Header, Error> {
    decode_into_with(input, dest, &DecodeParameters::default())
}

pub fn decode_into_with(
    input: &[u8],
    dest: &mut [u8],
    parameters: &DecodeParameters,
) -> Result<Header, Error> {
    let header = Header::parse(input)?;
    parameters
        .limits
        .check(header.width, header.height, header.color_format)?;

    let needed = header.bitmap_len().ok_or_else(|| {
        Error::LimitExceeded(format!(
            "{}x{} image does not fit in memory",
            header.width, header.height
        ))
    })?;

    if dest.len() < needed {
        return Err(Error::CapacityExceeded {
            needed,
            capacity: dest.len(),
        });
    }

    // Every fallible step is done by now, so dest is only touched on success
    let (planes, _) = decode_payload(input, &header, &parameters.limits)?;
    interleave_planes_into(&planes, &mut dest[..needed]);

    Ok(header)
}

/// Check the input bitmap, returning its expected length.
fn check_input(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    limits: &Limits,
) -> Result<usize, Error> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    limits.check(width, height, color_format)?;

    let header = Header::new(width, height, color_format, Quality::default());
    let expected = header.bitmap_len().ok_or_else(|| {
        Error::LimitExceeded(format!("{width}x{height} image does not fit in memory"))
    })?;

    if pixels.len() != expected {
        return Err(Error::ChannelMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    Ok(expected)
}

fn encode_parts(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    parameters: &EncodeParameters,
    icc_profile: Option<&[u8]>,
) -> Result<Vec<u8>, Error> {
    check_input(pixels, width, height, color_format, &parameters.limits)?;

    let header = Header::new(width, height, color_format, parameters.quality);
    let planes = split_planes(pixels, width, height, color_format.channels());

    // Compress the image data
    let quant_matrix = quantization_matrix(parameters.quality);
    let (compressed_data, compression_info) = compress(&planes, width, height, &quant_matrix)?;

    let mut output = Vec::with_capacity(header.len() + compression_info.len() + compressed_data.len());

    // Write out the header
    output.write_all(&header.to_bytes())?;

    // Write out compression info
    compression_info.write_into(&mut output)?;

    // Write out compressed data
    output.write_all(&compressed_data)?;

    if let Some(icc_profile) = icc_profile.filter(|p| !p.is_empty()) {
        write_icc_trailer(&mut output, icc_profile)?;
    }

    log::debug!(
        "encoded {width}x{height} {color_format:?} at quality {}: {} bytes",
        parameters.quality.get(),
        output.len()
    );

    Ok(output)
}

/// Decode everything after the header, returning the planes and the ICC
/// profile if one was stored.
fn decode_payload(
    input: &[u8],
    header: &Header,
    limits: &Limits,
) -> Result<(Vec<Vec<u8>>, Option<Vec<u8>>), Error> {
    limits.check(header.width, header.height, header.color_format)?;

    let channels = header.color_format.channels() as usize;
    let info_end = HEADER_LEN + CompressionInfo::len_for(channels);
    if input.len() < info_end {
        return Err(Error::Truncated {
            needed: info_end,
            actual: input.len(),
        });
    }

    let compression_info = CompressionInfo::read_from(&mut &input[HEADER_LEN..info_end], channels)?;

    let payload = &input[info_end..];
    let data_len = compression_info.total_size_compressed();
    if data_len > payload.len() {
        return Err(Error::Truncated {
            needed: info_end.saturating_add(data_len),
            actual: input.len(),
        });
    }

    let icc_profile = read_trailer(&payload[data_len..])?;

    let planes = decompress(&payload[..data_len], &compression_info, header.width, header.height)?;

    log::debug!(
        "decoded {}x{} {:?} ({} byte stream)",
        header.width,
        header.height,
        header.color_format,
        input.len()
    );

    Ok((planes, icc_profile))
}

fn write_icc_trailer<O: Write + WriteBytesExt>(output: &mut O, icc_profile: &[u8]) -> Result<(), Error> {
    let len = u32::try_from(icc_profile.len()).map_err(|_| {
        Error::LimitExceeded(format!("ICC profile of {} bytes is too large", icc_profile.len()))
    })?;

    output.write_all(TRAILER_TAG)?;
    output.write_u8(TRAILER_ICC)?;
    output.write_u32::<LE>(len)?;
    output.write_all(icc_profile)?;

    Ok(())
}

/// Parse whatever follows the plane data. Either nothing, or exactly one
/// well formed trailer.
fn read_trailer(input: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    if input.is_empty() {
        return Ok(None);
    }

    if !input.starts_with(&TRAILER_TAG[..input.len().min(TRAILER_TAG.len())]) {
        return Err(Error::InvalidData(format!(
            "{} unexpected bytes after image data",
            input.len()
        )));
    }

    if input.len() < TRAILER_HEADER_LEN {
        return Err(Error::Truncated {
            needed: TRAILER_HEADER_LEN,
            actual: input.len(),
        });
    }

    let chunk_type = input[3];
    if chunk_type != TRAILER_ICC {
        return Err(Error::InvalidData(format!("unknown trailer chunk type {chunk_type}")));
    }

    let len = LE::read_u32(&input[4..8]) as usize;
    let data = &input[TRAILER_HEADER_LEN..];
    if data.len() < len {
        return Err(Error::Truncated {
            needed: TRAILER_HEADER_LEN.saturating_add(len),
            actual: input.len(),
        });
    } else if data.len() > len {
        return Err(Error::InvalidData(format!(
            "{} unexpected bytes after trailer",
            data.len() - len
        )));
    }

    Ok(Some(data.to_vec()))
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("destination holds {capacity} bytes, need {needed}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("stream truncated, need {needed} bytes but got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid image data: {0}")]
    InvalidData(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
