#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must never panic
    let _ = bitgrain::BitgrainPicture::decode(data);

    // A failed decode must leave the destination alone
    let mut dest = vec![0xC3u8; 4096];
    if bitgrain::decode_into(data, &mut dest).is_err() {
        assert!(dest.iter().all(|&b| b == 0xC3), "partial write on failure");
    }
});
