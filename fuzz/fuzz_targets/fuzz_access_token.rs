#![no_main]

use libfuzzer_sys::fuzz_target;
use rustmotion_core::access_token;

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }
    let (key, token) = data.split_at(16);
    if let Ok(hex) = access_token(key, token) {
        assert_eq!(hex.len(), token.len() * 2);
    }
});
