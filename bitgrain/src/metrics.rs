//! Quality metrics for comparing a decoded bitmap against its source.
//!
//! Both buffers must have the same length and layout.

use crate::picture::Error;

/// Value returned by [`psnr`] for identical inputs.
pub const PSNR_IDENTICAL: f64 = 99.0;

// SSIM stabilizers, (0.01 * 255)^2 and (0.03 * 255)^2
const C1: f64 = 6.5025;
const C2: f64 = 58.5225;

fn check_lengths(original: &[u8], reconstructed: &[u8]) -> Result<(), Error> {
    if original.len() != reconstructed.len() {
        return Err(Error::ChannelMismatch {
            expected: original.len(),
            actual: reconstructed.len(),
        });
    }

    Ok(())
}

/// Mean absolute difference per sample. `0.0` for empty input.
pub fn mean_abs_diff(original: &[u8], reconstructed: &[u8]) -> Result<f64, Error> {
    check_lengths(original, reconstructed)?;
    if original.is_empty() {
        return Ok(0.0);
    }

    let total: u64 = original
        .iter()
        .zip(reconstructed)
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();

    Ok(total as f64 / original.len() as f64)
}

/// Peak signal to noise ratio in dB.
pub fn psnr(original: &[u8], reconstructed: &[u8]) -> Result<f64, Error> {
    check_lengths(original, reconstructed)?;
    if original.is_empty() {
        return Ok(0.0);
    }

    let sum_sq: u64 = original
        .iter()
        .zip(reconstructed)
        .map(|(a, b)| {
            let d = a.abs_diff(*b) as u64;
            d * d
        })
        .sum();

    let mse = sum_sq as f64 / original.len() as f64;
    if mse == 0.0 {
        return Ok(PSNR_IDENTICAL);
    }

    Ok(10.0 * f64::log10(255.0 * 255.0 / mse))
}

/// Structural similarity in `[-1, 1]`, computed over a single window
/// covering the whole buffer.
pub fn ssim(original: &[u8], reconstructed: &[u8]) -> Result<f64, Error> {
    check_lengths(original, reconstructed)?;
    if original.is_empty() {
        return Ok(0.0);
    }

    let n = original.len() as f64;
    let mean = |data: &[u8]| data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mu_x = mean(original);
    let mu_y = mean(reconstructed);

    let (mut var_x, mut var_y, mut cov) = (0.0, 0.0, 0.0);
    for (&a, &b) in original.iter().zip(reconstructed) {
        let dx = a as f64 - mu_x;
        let dy = b as f64 - mu_y;
        var_x += dx * dx;
        var_y += dy * dy;
        cov += dx * dy;
    }
    var_x /= n;
    var_y /= n;
    cov /= n;

    let luminance = (2.0 * mu_x * mu_y + C1) / (mu_x * mu_x + mu_y * mu_y + C1);
    let contrast_structure = (2.0 * cov + C2) / (var_x + var_y + C2);

    Ok(luminance * contrast_structure)
}
