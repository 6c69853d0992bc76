#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored records are bincode; a corrupted page must decode to an error,
    // never a panic or a record whose flag disagrees with its status.
    if let Ok(record) = bincode::deserialize::<ltc_types::VerificationRecord>(data) {
        assert_eq!(
            record.is_verified_21(),
            record.status == ltc_types::VerificationStatus::Approved
        );
    }
    let _ = bincode::deserialize::<ltc_types::Uid>(data);
});
