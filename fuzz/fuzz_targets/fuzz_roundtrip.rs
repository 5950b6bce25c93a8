#![no_main]
use bitgrain::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First three bytes pick the geometry and quality, the rest is pixels
    let [w, q, c, pixels @ ..] = data else {
        return;
    };

    let color_format = match c % 3 {
        0 => ColorFormat::Gray8,
        1 => ColorFormat::Rgb8,
        _ => ColorFormat::Rgba8,
    };
    let width = (*w as u32 % 64) + 1;
    let row = width as usize * color_format.channels() as usize;
    let height = (pixels.len() / row) as u32;
    if height == 0 {
        return;
    }
    let pixels = &pixels[..row * height as usize];

    let parameters = EncodeParameters {
        quality: Quality::new(*q),
        ..Default::default()
    };
    let encoded = encode(pixels, width, height, color_format, &parameters).expect("encode failed");
    assert!(encoded.len() <= max_encoded_len(width, height, color_format).unwrap());

    let decoded = BitgrainPicture::decode(&encoded).expect("re-encoded data failed to decode");
    assert_eq!(decoded.width(), width);
    assert_eq!(decoded.height(), height);
    assert_eq!(decoded.color_format(), color_format);
    assert_eq!(decoded.as_raw().len(), pixels.len());
});
