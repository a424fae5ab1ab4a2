//! Fuzz target for decoding stored session records.

#![no_main]

use libfuzzer_sys::fuzz_target;
use turnstile_session::SessionRecord;

fuzz_target!(|data: &str| {
    if let Ok(record) = SessionRecord::from_json(data) {
        let json = record.to_json().expect("encode decoded record");
        assert_eq!(SessionRecord::from_json(&json).ok(), Some(record));
    }
});
