/*
 * fuzz_targets/parse_signal.rs
 *
 * resolve_signal and parse_signal must never panic, and must agree:
 * 0 from resolve means Err from parse.
 *
 * edge cases: "SIG", "sig9", "-1", "SIGSIGTERM", huge numbers, unicode
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data) {
        let raw = killjoy::signal::resolve_signal(s);
        match killjoy::signal::parse_signal(s) {
            Ok(sig) => assert_eq!(sig.as_raw(), raw),
            Err(_) => assert_eq!(raw, 0),
        }
    }
});
