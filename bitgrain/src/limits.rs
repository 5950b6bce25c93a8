use crate::{header::ColorFormat, picture::Error};

/// Largest width or height accepted by default.
pub const DEFAULT_MAX_DIMENSION: u32 = 65536;

/// Largest decoded bitmap accepted by default, in bytes.
pub const DEFAULT_MAX_PIXEL_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Largest `.bg` stream read from a file or reader by default, in bytes.
pub const DEFAULT_MAX_STREAM_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Resource limits checked before anything is allocated for an image.
///
/// `None` disables a limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Maximum size of the interleaved bitmap (width * height * channels).
    pub max_pixel_bytes: Option<u64>,
    /// Maximum size of a stream read through [`std::io::Read`].
    pub max_stream_bytes: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_width: Some(DEFAULT_MAX_DIMENSION),
            max_height: Some(DEFAULT_MAX_DIMENSION),
            max_pixel_bytes: Some(DEFAULT_MAX_PIXEL_BYTES),
            max_stream_bytes: Some(DEFAULT_MAX_STREAM_BYTES),
        }
    }
}

impl Limits {
    /// No limits at all.
    pub fn none() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_pixel_bytes: None,
            max_stream_bytes: None,
        }
    }

    /// Check dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32, color_format: ColorFormat) -> Result<(), Error> {
        if let Some(max_w) = self.max_width {
            if width > max_w {
                return Err(Error::LimitExceeded(format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }

        if let Some(max_h) = self.max_height {
            if height > max_h {
                return Err(Error::LimitExceeded(format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }

        if let Some(max_bytes) = self.max_pixel_bytes {
            let bytes = u64::from(width) * u64::from(height) * u64::from(color_format.channels());
            if bytes > max_bytes {
                return Err(Error::LimitExceeded(format!(
                    "bitmap of {bytes} bytes exceeds limit {max_bytes}"
                )));
            }
        }

        Ok(())
    }

    /// Check the length of an encoded stream.
    pub(crate) fn check_stream(&self, len: u64) -> Result<(), Error> {
        if let Some(max_len) = self.max_stream_bytes {
            if len > max_len {
                return Err(Error::LimitExceeded(format!(
                    "stream of {len} bytes exceeds limit {max_len}"
                )));
            }
        }

        Ok(())
    }
}
