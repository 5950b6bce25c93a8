//! Fixed-buffer entry points with integer status codes.
//!
//! These mirror the surface language bindings see: the caller owns and sizes
//! every buffer, the capacity of a destination is its slice length, and any
//! failure collapses to [`STATUS_ERROR`]. The underlying [`Error`] is only
//! logged.

use crate::{
    compression::dct::Quality,
    header::{ColorFormat, Header},
    picture::{decode_into, encode_into, Error},
};

/// Returned on success.
pub const STATUS_OK: i32 = 0;

/// Returned on any failure.
pub const STATUS_ERROR: i32 = -1;

/// Map a quality value from a binding to an engine quality. Zero means
/// "use the default", anything else is clamped to 1-100.
pub fn boundary_quality(quality: i32) -> Quality {
    if quality == 0 {
        Quality::DEFAULT
    } else {
        Quality::new(quality.clamp(Quality::MIN as i32, Quality::MAX as i32) as u8)
    }
}

fn failed(operation: &str, error: Error) -> i32 {
    log::debug!("{operation} failed: {error}");
    STATUS_ERROR
}

fn encode_status(
    pixels: &[u8],
    width: u32,
    height: u32,
    color_format: ColorFormat,
    dest: &mut [u8],
    quality: i32,
    out_len: &mut usize,
) -> i32 {
    match encode_into(pixels, width, height, color_format, dest, boundary_quality(quality)) {
        Ok(len) => {
            *out_len = len;
            STATUS_OK
        }
        Err(e) => failed("encode", e),
    }
}

/// Encode an 8-bit grayscale bitmap into `dest`. On success the stream
/// length is stored in `out_len`.
pub fn encode_grayscale(
    pixels: &[u8],
    width: u32,
    height: u32,
    dest: &mut [u8],
    quality: i32,
    out_len: &mut usize,
) -> i32 {
    encode_status(pixels, width, height, ColorFormat::Gray8, dest, quality, out_len)
}

/// Encode an RGB bitmap (R, G, B per pixel) into `dest`.
pub fn encode_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    dest: &mut [u8],
    quality: i32,
    out_len: &mut usize,
) -> i32 {
    encode_status(pixels, width, height, ColorFormat::Rgb8, dest, quality, out_len)
}

/// Encode an RGBA bitmap (R, G, B, A per pixel) into `dest`.
pub fn encode_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    dest: &mut [u8],
    quality: i32,
    out_len: &mut usize,
) -> i32 {
    encode_status(pixels, width, height, ColorFormat::Rgba8, dest, quality, out_len)
}

/// Decode a `.bg` stream into `dest`.
///
/// The dimensions and channel count are stored as soon as the header parses,
/// even if the rest of the stream turns out to be bad.
pub fn decode(
    container: &[u8],
    dest: &mut [u8],
    out_width: &mut u32,
    out_height: &mut u32,
    out_channels: &mut u32,
) -> i32 {
    let header = match Header::parse(container) {
        Ok(header) => header,
        Err(e) => return failed("decode", e),
    };

    *out_width = header.width;
    *out_height = header.height;
    *out_channels = header.color_format.channels() as u32;

    match decode_into(container, dest) {
        Ok(_) => STATUS_OK,
        Err(e) => failed("decode", e),
    }
}
