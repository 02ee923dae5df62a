#![no_main]

use libfuzzer_sys::fuzz_target;
use safe_saphyr::scalar::coerce;

const TAGS: &[Option<&str>] = &[
    None,
    Some("!!int"),
    Some("!!float"),
    Some("!!bool"),
    Some("!!null"),
    Some("!!timestamp"),
    Some("!!binary"),
];

// Scalar coercion must never panic, whatever the text and tag.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for tag in TAGS {
        let _ = coerce(text, *tag, false);
        let _ = coerce(text, *tag, true);
    }
});
