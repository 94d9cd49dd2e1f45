#![no_main]

use citadel_fetch::synthetic::{data_url_events, decode_data_url};
use citadel_fetch::TransportEvent;
use libfuzzer_sys::fuzz_target;
use url::Url;

fuzz_target!(|data: &[u8]| {
    let Ok(tail) = std::str::from_utf8(data) else {
        return;
    };
    if tail.len() > 10_000 {
        return;
    }
    let Ok(url) = Url::parse(&format!("data:{}", tail)) else {
        return;
    };

    let decoded = decode_data_url(&url);
    assert!(!decoded.content_type.is_empty());

    let events = data_url_events(&url);
    assert_eq!(events.last(), Some(&TransportEvent::Done));
});
