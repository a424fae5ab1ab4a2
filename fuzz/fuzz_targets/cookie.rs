//! Fuzz target for `Cookie` header parsing and session id validation.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use turnstile_session::{CookieSettings, SessionId, find_cookie};

#[derive(Debug, Arbitrary)]
struct FuzzCookie {
    header: String,
    name: String,
}

fuzz_target!(|data: FuzzCookie| {
    if let Some(value) = find_cookie(&data.header, &data.name) {
        assert!(!value.is_empty());
        assert!(data.header.contains(value));

        // Anything accepted as an id must render back into a well-formed cookie
        if let Some(sid) = SessionId::parse(value) {
            assert_eq!(sid.as_str().len(), 32);
            let rendered = CookieSettings::default().set_cookie(&sid);
            assert_eq!(find_cookie(&rendered, "sessionid"), Some(sid.as_str()));
        }
    }
});
