use bitgrain::{
    decode_into, encode, encode_into, max_encoded_len, metrics, raw, BitgrainPicture, ColorFormat,
    EncodeParameters, Error, Quality,
};
use rstest::rstest;

/// A smooth gradient with a hard edge and some texture, so every quality
/// level has something to throw away. Values stay below 245.
fn test_image(width: u32, height: u32, channels: u8) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height) as usize * channels as usize);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels as u32 {
                let gradient = x * 100 / width + y * 50 / height + c * 10;
                let edge = if x > width / 2 { 40 } else { 0 };
                let texture = ((x * 7 + y * 13 + c) % 7) * 4;
                pixels.push((gradient + edge + texture) as u8);
            }
        }
    }
    pixels
}

fn parameters(quality: u8) -> EncodeParameters {
    EncodeParameters {
        quality: Quality::new(quality),
        ..Default::default()
    }
}

#[rstest]
fn geometry_survives_roundtrip(
    #[values(ColorFormat::Gray8, ColorFormat::Rgb8, ColorFormat::Rgba8)] color_format: ColorFormat,
    #[values((1, 1), (7, 3), (8, 8), (9, 17), (33, 1), (1, 40))] size: (u32, u32),
    #[values(1, 50, 100)] quality: u8,
) {
    let (width, height) = size;
    let pixels = test_image(width, height, color_format.channels());
    let encoded = encode(&pixels, width, height, color_format, &parameters(quality)).unwrap();

    let decoded = BitgrainPicture::decode(&encoded).unwrap();
    assert_eq!(decoded.width(), width);
    assert_eq!(decoded.height(), height);
    assert_eq!(decoded.color_format(), color_format);
    assert_eq!(decoded.as_raw().len(), pixels.len());
    assert_eq!(decoded.header().quality, quality);
}

#[rstest]
#[case::gray(ColorFormat::Gray8)]
#[case::rgb(ColorFormat::Rgb8)]
#[case::rgba(ColorFormat::Rgba8)]
fn size_grows_with_quality(#[case] color_format: ColorFormat) {
    let (width, height) = (48, 40);
    let pixels = test_image(width, height, color_format.channels());

    let size = |q| encode(&pixels, width, height, color_format, &parameters(q)).unwrap().len();

    assert!(size(90) >= size(10));
    assert!(size(100) >= size(50));
    assert!(size(50) >= size(1));
}

#[rstest]
#[case::q100(100, 1.0)]
#[case::q90(90, 6.0)]
#[case::q50(50, 12.0)]
#[case::q10(10, 24.0)]
fn error_bounded_by_quality(#[case] quality: u8, #[case] max_mean_error: f64) {
    let (width, height) = (40, 24);
    let pixels = test_image(width, height, 3);

    let encoded = encode(&pixels, width, height, ColorFormat::Rgb8, &parameters(quality)).unwrap();
    let decoded = BitgrainPicture::decode(&encoded).unwrap();

    let error = metrics::mean_abs_diff(&pixels, decoded.as_raw()).unwrap();
    assert!(error <= max_mean_error, "quality {quality}: mean error {error}");
}

#[test]
fn full_quality_is_near_lossless() {
    let (width, height) = (23, 19);
    let pixels = test_image(width, height, 4);

    let encoded = encode(&pixels, width, height, ColorFormat::Rgba8, &parameters(100)).unwrap();
    let decoded = BitgrainPicture::decode(&encoded).unwrap();

    assert!(pixels
        .iter()
        .zip(decoded.as_raw())
        .all(|(a, b)| a.abs_diff(*b) <= 2));
    assert!(metrics::psnr(&pixels, decoded.as_raw()).unwrap() > 45.0);
    assert!(metrics::ssim(&pixels, decoded.as_raw()).unwrap() > 0.99);
}

#[test]
fn flat_images_stay_close() {
    // A flat block only has a DC term, off by at most half a step
    for value in [0u8, 1, 127, 128, 254, 255] {
        let pixels = vec![value; 12 * 5 * 3];
        let encoded = encode(&pixels, 12, 5, ColorFormat::Rgb8, &parameters(30)).unwrap();

        let decoded = BitgrainPicture::decode(&encoded).unwrap();
        assert!(
            decoded.as_raw().iter().all(|p| p.abs_diff(value) <= 2),
            "value {value}"
        );
    }
}

#[test]
fn channel_order_is_kept() {
    // Solid red, green, blue and transparent quadrants
    let (width, height) = (16, 16);
    let mut pixels = Vec::new();
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(match (x < 8, y < 8) {
                (true, true) => &[255, 0, 0, 255],
                (false, true) => &[0, 255, 0, 255],
                (true, false) => &[0, 0, 255, 255],
                (false, false) => &[0, 0, 0, 0],
            });
        }
    }

    let encoded = encode(&pixels, width, height, ColorFormat::Rgba8, &parameters(75)).unwrap();
    let decoded = BitgrainPicture::decode(&encoded).unwrap().into_raw();

    assert_eq!(decoded, pixels);
}

#[test]
fn mid_gray_at_default_quality() {
    let pixels = [128u8; 16];
    let encoded = encode(&pixels, 4, 4, ColorFormat::Gray8, &parameters(85)).unwrap();

    let mut output = [0u8; 16];
    let header = decode_into(&encoded, &mut output).unwrap();
    assert_eq!((header.width, header.height, header.color_format), (4, 4, ColorFormat::Gray8));
    assert!(output.iter().all(|p| p.abs_diff(128) <= 4));
}

#[test]
fn encode_into_is_all_or_nothing() {
    let (width, height) = (20, 20);
    let pixels = test_image(width, height, 3);
    let expected = encode(&pixels, width, height, ColorFormat::Rgb8, &parameters(85)).unwrap();

    for capacity in [0, 1, 12, expected.len() - 1] {
        let mut dest = vec![0xEEu8; capacity];
        let result = encode_into(&pixels, width, height, ColorFormat::Rgb8, &mut dest, Quality::new(85));

        assert!(matches!(
            result,
            Err(Error::CapacityExceeded { needed, capacity: c }) if needed == expected.len() && c == capacity
        ));
        assert!(dest.iter().all(|&b| b == 0xEE));
    }

    let mut dest = vec![0xEEu8; expected.len() + 10];
    let written =
        encode_into(&pixels, width, height, ColorFormat::Rgb8, &mut dest, Quality::new(85)).unwrap();
    assert_eq!(written, expected.len());
    assert_eq!(&dest[..written], &expected[..]);
    assert!(dest[written..].iter().all(|&b| b == 0xEE));
}

#[test]
fn max_encoded_len_is_enough() {
    let (width, height) = (17, 9);
    let pixels: Vec<u8> = (0..width * height * 4).map(|i: u32| (i.wrapping_mul(2654435761) >> 13) as u8).collect();

    let bound = max_encoded_len(width, height, ColorFormat::Rgba8).unwrap();
    let mut dest = vec![0u8; bound];
    let mut len = 0;
    assert_eq!(raw::encode_rgba(&pixels, width, height, &mut dest, 100, &mut len), raw::STATUS_OK);
    assert!(len <= bound);
}

#[test]
fn decode_into_needs_room() {
    let pixels = test_image(6, 6, 1);
    let encoded = encode(&pixels, 6, 6, ColorFormat::Gray8, &parameters(85)).unwrap();

    let mut small = vec![0x11u8; 35];
    assert!(matches!(
        decode_into(&encoded, &mut small),
        Err(Error::CapacityExceeded { needed: 36, capacity: 35 })
    ));
    assert!(small.iter().all(|&b| b == 0x11));

    // Extra room is fine and stays untouched
    let mut large = vec![0x11u8; 40];
    decode_into(&encoded, &mut large).unwrap();
    assert!(large[36..].iter().all(|&b| b == 0x11));
}

#[rstest]
#[case::zero_width(0, 4)]
#[case::zero_height(4, 0)]
fn zero_dimensions_are_rejected(#[case] width: u32, #[case] height: u32) {
    assert!(matches!(
        encode(&[], width, height, ColorFormat::Gray8, &Default::default()),
        Err(Error::InvalidDimensions { .. })
    ));

    let mut dest = [0u8; 64];
    let mut len = 0;
    assert_eq!(raw::encode_grayscale(&[], width, height, &mut dest, 85, &mut len), raw::STATUS_ERROR);
}

#[test]
fn wrong_buffer_length_is_a_channel_mismatch() {
    let rgb = test_image(4, 4, 3);

    assert!(matches!(
        encode(&rgb, 4, 4, ColorFormat::Rgba8, &Default::default()),
        Err(Error::ChannelMismatch { expected: 64, actual: 48 })
    ));

    let mut dest = [0u8; 1024];
    let mut len = 0;
    assert_eq!(raw::encode_grayscale(&rgb, 4, 4, &mut dest, 85, &mut len), raw::STATUS_ERROR);
    assert_eq!(raw::encode_rgb(&rgb, 4, 4, &mut dest, 85, &mut len), raw::STATUS_OK);
}

#[test]
fn save_and_open() {
    let path = std::env::temp_dir().join(format!("bitgrain-save-open-{}.bg", std::process::id()));
    let picture = BitgrainPicture::from_raw(5, 3, ColorFormat::Gray8, test_image(5, 3, 1)).unwrap();

    picture.save(&path, &parameters(100)).unwrap();
    let opened = bitgrain::open(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(opened.width(), 5);
    assert_eq!(opened.height(), 3);
    assert_eq!(opened.color_format(), ColorFormat::Gray8);
}

#[test]
fn open_missing_file_is_io_error() {
    assert!(matches!(
        bitgrain::open("/definitely/not/here.bg"),
        Err(Error::Io(_))
    ));
}

#[rstest]
#[case::zero(0)]
#[case::above_range(101)]
#[case::max(255)]
fn quality_byte_does_not_affect_decoding(#[case] stored_quality: u8) {
    let pixels = test_image(4, 4, 1);
    let mut encoded = encode(&pixels, 4, 4, ColorFormat::Gray8, &parameters(85)).unwrap();
    let mut expected = [0u8; 16];
    decode_into(&encoded, &mut expected).unwrap();

    encoded[11] = stored_quality;

    let mut output = [0u8; 16];
    let header = decode_into(&encoded, &mut output).unwrap();
    assert_eq!(header.quality, stored_quality);
    assert_eq!(output, expected);

    let (mut w, mut h, mut ch) = (0, 0, 0);
    assert_eq!(raw::decode(&encoded, &mut output, &mut w, &mut h, &mut ch), raw::STATUS_OK);
    assert_eq!((w, h, ch), (4, 4, 1));
}

#[test]
fn calls_on_separate_threads_share_nothing() {
    let (width, height) = (24, 16);
    let images: Vec<Vec<u8>> = (0..4u8)
        .map(|i| test_image(width, height, 3).iter().map(|p| p / 2 + i * 20).collect())
        .collect();

    let expected: Vec<Vec<u8>> = images
        .iter()
        .map(|pixels| encode(pixels, width, height, ColorFormat::Rgb8, &parameters(70)).unwrap())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = images
            .iter()
            .map(|pixels| {
                scope.spawn(move || {
                    let encoded = encode(pixels, width, height, ColorFormat::Rgb8, &parameters(70)).unwrap();
                    let mut output = vec![0u8; pixels.len()];
                    decode_into(&encoded, &mut output).unwrap();
                    (encoded, output)
                })
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(&expected) {
            let (encoded, output) = handle.join().unwrap();
            assert_eq!(&encoded, expected);

            let decoded = BitgrainPicture::decode(expected).unwrap();
            assert_eq!(output, decoded.into_raw());
        }
    });
}
