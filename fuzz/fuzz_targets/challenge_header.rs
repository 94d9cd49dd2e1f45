#![no_main]

use citadel_fetch::credentials::parse_challenge;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = std::str::from_utf8(data) {
        if header.len() > 4096 {
            return;
        }
        if let Ok(challenge) = parse_challenge(header) {
            // a parsed realm is always a slice of the input
            assert!(challenge.realm == "NTLM" || header.contains(challenge.realm.as_str()));
        }
    }
});
