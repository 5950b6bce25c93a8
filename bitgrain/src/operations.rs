//! Rearranging interleaved pixels into single channel planes and back.
//!
//! Nothing in here changes a sample value, all loss happens in the
//! compression step.

/// Split an interleaved bitmap into `channels` planes of `width * height`
/// samples each.
///
/// The caller guarantees `pixels.len() == width * height * channels`.
pub fn split_planes(pixels: &[u8], width: u32, height: u32, channels: u8) -> Vec<Vec<u8>> {
    let channels = channels as usize;
    let plane_len = width as usize * height as usize;

    if channels == 1 {
        return vec![pixels[..plane_len].to_vec()];
    }

    let mut planes: Vec<Vec<u8>> = (0..channels)
        .map(|_| Vec::with_capacity(plane_len))
        .collect();

    for pixel in pixels.chunks_exact(channels).take(plane_len) {
        for (plane, sample) in planes.iter_mut().zip(pixel) {
            plane.push(*sample);
        }
    }

    planes
}

/// Interleave planes back into a single bitmap, the inverse of
/// [`split_planes`].
pub fn interleave_planes(planes: &[Vec<u8>], width: u32, height: u32) -> Vec<u8> {
    let mut output = vec![0u8; width as usize * height as usize * planes.len()];
    interleave_planes_into(planes, &mut output);

    output
}

/// Interleave planes into `output`, which must hold exactly
/// `planes.len()` samples per pixel.
pub fn interleave_planes_into(planes: &[Vec<u8>], output: &mut [u8]) {
    let channels = planes.len();
    if channels == 0 {
        return;
    }

    for (c, plane) in planes.iter().enumerate() {
        for (pixel, sample) in output.chunks_exact_mut(channels).zip(plane) {
            pixel[c] = *sample;
        }
    }
}
