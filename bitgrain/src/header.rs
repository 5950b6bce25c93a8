use byteorder::{ByteOrder, ReadBytesExt, LE};
use std::io::Cursor;

use crate::{compression::dct::Quality, picture::Error};

/// Identifier byte at the start of every stream.
pub const MAGIC: u8 = b'B';

/// The only payload layout this crate reads and writes.
pub const FORMAT_REVISION: u8 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// A Bitgrain file header. This must be included at the beginning
/// of a valid `.bg` stream.
///
/// ```text
/// 0      1         2       6        10         11
/// | 'B' | revision | width | height | channels | quality |
/// ```
///
/// Width and height are little-endian `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,

    /// Format of color data in the image.
    pub color_format: ColorFormat,

    /// Quality the stream was encoded with, from 1-100. Kept for reference
    /// only, decoding reads its quantization steps from the payload, so
    /// whatever byte is stored is accepted as is.
    pub quality: u8,
}

impl Header {
    pub fn new(width: u32, height: u32, color_format: ColorFormat, quality: Quality) -> Self {
        Self {
            width,
            height,
            color_format,
            quality: quality.get(),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];

        buf[0] = MAGIC;
        buf[1] = FORMAT_REVISION;
        LE::write_u32(&mut buf[2..6], self.width);
        LE::write_u32(&mut buf[6..10], self.height);
        buf[10] = self.color_format as u8;
        buf[11] = self.quality;

        buf
    }

    pub fn len(&self) -> usize {
        HEADER_LEN
    }

    /// Parse the header at the front of `bytes`.
    ///
    /// Nothing past `bytes.len()` is read; a short stream is reported as
    /// [`Error::Truncated`] before any field is looked at.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated {
                needed: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let mut input = Cursor::new(&bytes[..HEADER_LEN]);

        let magic = input.read_u8()?;
        if magic != MAGIC {
            return Err(Error::UnsupportedFormat(format!(
                "incorrect identifier {magic:#04x}"
            )));
        }

        let revision = input.read_u8()?;
        if revision != FORMAT_REVISION {
            return Err(Error::UnsupportedFormat(format!(
                "unknown format revision {revision}"
            )));
        }

        let width = input.read_u32::<LE>()?;
        let height = input.read_u32::<LE>()?;
        let color_format = ColorFormat::try_from(input.read_u8()?)?;
        let quality = input.read_u8()?;

        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        Ok(Header {
            width,
            height,
            color_format,
            quality,
        })
    }

    /// Number of bytes in the decoded, interleaved bitmap, or `None` if it
    /// does not fit in a `usize`.
    pub fn bitmap_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.color_format.channels() as usize)
    }
}

/// The format of bytes in the image.
///
/// The discriminant is the channel count, which is what gets stored in the
/// header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// Grayscale, 8 bits per channel
    Gray8 = 1,

    /// RGB, 8 bits per channel
    Rgb8 = 3,

    /// RGBA, 8 bits per channel
    Rgba8 = 4,
}

impl ColorFormat {
    /// Bits per color channel.
    ///
    /// Every supported format has `8bpc`.
    pub fn bpc(&self) -> u8 {
        8
    }

    /// Bits per pixel.
    ///
    /// Ex. Rgba8 has `32bpp`
    pub fn bpp(&self) -> u16 {
        self.channels() as u16 * self.bpc() as u16
    }

    /// Number of color channels.
    ///
    /// Ex. Rgba8 has `4` channels
    pub fn channels(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ColorFormat {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Gray8,
            3 => Self::Rgb8,
            4 => Self::Rgba8,
            v => return Err(Error::UnsupportedFormat(format!("invalid channel count {v}"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_layout() {
        let header = Header {
            width: 0x0403_0201,
            height: 7,
            color_format: ColorFormat::Rgb8,
            quality: 85,
        };

        assert_eq!(
            header.to_bytes(),
            [b'B', 1, 0x01, 0x02, 0x03, 0x04, 7, 0, 0, 0, 3, 85]
        );
    }

    #[test]
    fn short_streams_are_truncated() {
        let bytes = Header::new(4, 4, ColorFormat::Gray8, Quality::default()).to_bytes();

        for len in 0..HEADER_LEN {
            assert!(matches!(
                Header::parse(&bytes[..len]),
                Err(Error::Truncated { needed: HEADER_LEN, actual }) if actual == len
            ));
        }
    }

    #[test]
    fn unknown_magic_and_revision() {
        let mut bytes = Header::new(4, 4, ColorFormat::Gray8, Quality::default()).to_bytes();
        bytes[0] = b'b';
        assert!(matches!(Header::parse(&bytes), Err(Error::UnsupportedFormat(_))));

        bytes[0] = MAGIC;
        bytes[1] = 2;
        assert!(matches!(Header::parse(&bytes), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn bad_fields() {
        let good = Header::new(4, 4, ColorFormat::Rgba8, Quality::default()).to_bytes();

        let mut bytes = good;
        bytes[10] = 2;
        assert!(matches!(Header::parse(&bytes), Err(Error::UnsupportedFormat(_))));

        let mut bytes = good;
        bytes[2..6].copy_from_slice(&[0; 4]);
        assert!(matches!(
            Header::parse(&bytes),
            Err(Error::InvalidDimensions { width: 0, height: 4 })
        ));

    }

    #[test]
    fn quality_byte_is_kept_as_read() {
        let mut bytes = Header::new(4, 4, ColorFormat::Gray8, Quality::default()).to_bytes();

        for quality in [0, 101, 255] {
            bytes[11] = quality;
            assert_eq!(Header::parse(&bytes).unwrap().quality, quality);
        }
    }

    #[test]
    fn color_format_sizes() {
        assert_eq!(ColorFormat::Gray8.bpp(), 8);
        assert_eq!(ColorFormat::Rgb8.bpp(), 24);
        assert_eq!(ColorFormat::Rgba8.channels(), 4);
    }

    fn color_format_strategy() -> impl Strategy<Value = ColorFormat> {
        prop_oneof![
            Just(ColorFormat::Gray8),
            Just(ColorFormat::Rgb8),
            Just(ColorFormat::Rgba8),
        ]
    }

    proptest! {
        /// Property: parsing a written header recovers every field.
        #[test]
        fn prop_header_roundtrip(
            width in 1u32..=u32::MAX,
            height in 1u32..=u32::MAX,
            color_format in color_format_strategy(),
            quality in any::<u8>(),
        ) {
            let header = Header { width, height, color_format, quality };
            let parsed = Header::parse(&header.to_bytes()).unwrap();
            prop_assert_eq!(parsed, header);
        }
    }
}
