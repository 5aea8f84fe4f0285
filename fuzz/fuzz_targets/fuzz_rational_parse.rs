#![no_main]

use libfuzzer_sys::fuzz_target;
use structree_core::Rational;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(value) = text.parse::<Rational>() {
        // Display output must parse back to the same reduced value.
        let reparsed = value.to_string().parse::<Rational>();
        assert_eq!(reparsed, Ok(value));
        assert!(value.denominator() > 0);
    }
});
