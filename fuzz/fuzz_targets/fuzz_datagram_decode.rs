#![no_main]

use libfuzzer_sys::fuzz_target;
use rustmotion_core::{decode_datagram, Inbound};

fuzz_target!(|data: &[u8]| {
    if let Ok(inbound) = decode_datagram(data) {
        let _ = inbound.session_token();
        if let Inbound::Ack(ack) = inbound {
            let _ = ack.wait_handle();
        }
    }
});
