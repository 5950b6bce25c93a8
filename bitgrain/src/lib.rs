//! Bitgrain is a lossy image codec. It stores 8-bit grayscale, RGB and RGBA
//! bitmaps in `.bg` streams: a 12 byte header followed by DCT coefficients,
//! quantized according to a quality setting from 1 to 100.
//!
//! Every call is self-contained. Nothing is cached between calls and
//! destination buffers are never written unless the call succeeds.
//!
//! # Example
//! ## Encoding and decoding in memory
//! ```
//! use bitgrain::{BitgrainPicture, ColorFormat, EncodeParameters, Quality};
//!
//! let bitmap = vec![
//!     0xFF, 0x00, 0x00,
//!     0x00, 0xFF, 0x00,
//!     0x00, 0x00, 0xFF,
//!     0x80, 0x80, 0x80,
//! ];
//!
//! // Create a 2×2 image in memory. Nothing is compressed or encoded
//! // at this point.
//! let image = BitgrainPicture::from_raw(2, 2, ColorFormat::Rgb8, bitmap).unwrap();
//!
//! let parameters = EncodeParameters {
//!     quality: Quality::new(90),
//!     ..Default::default()
//! };
//! let encoded = image.encode(&parameters).unwrap();
//!
//! let decoded = BitgrainPicture::decode(&encoded).unwrap();
//! assert_eq!(decoded.width(), 2);
//! assert_eq!(decoded.color_format(), ColorFormat::Rgb8);
//! ```
//!
//! ## Caller-owned buffers
//! ```
//! use bitgrain::raw;
//!
//! let pixels = [128u8; 16];
//! let mut container = [0u8; 512];
//! let mut len = 0;
//! assert_eq!(raw::encode_grayscale(&pixels, 4, 4, &mut container, 85, &mut len), raw::STATUS_OK);
//!
//! let mut decoded = [0u8; 16];
//! let (mut width, mut height, mut channels) = (0, 0, 0);
//! let status = raw::decode(&container[..len], &mut decoded, &mut width, &mut height, &mut channels);
//! assert_eq!(status, raw::STATUS_OK);
//! ```

mod compression;
mod operations;

pub mod header;
pub mod limits;
pub mod metrics;
pub mod picture;
pub mod raw;

// ----------------------- //
// INLINED USEFUL FEATURES //
// ----------------------- //
#[doc(inline)]
pub use picture::{
    decode_into, encode, encode_into, max_encoded_len, open, BitgrainPicture, DecodeParameters,
    EncodeParameters, Error,
};

#[doc(inline)]
pub use header::{ColorFormat, Header};

#[doc(inline)]
pub use compression::dct::Quality;

#[doc(inline)]
pub use limits::Limits;

#[doc(inline)]
pub use operations::{interleave_planes, split_planes};
