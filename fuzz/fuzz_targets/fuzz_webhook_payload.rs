#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Webhook bodies come from the network; parsing must never panic, and
    // anything it accepts must carry a valid uid.
    if let Ok(event) = ltc_rpc::webhook::parse_event(data) {
        assert!(ltc_types::Uid::parse(event.reference.as_str()).is_ok());
    }
});
