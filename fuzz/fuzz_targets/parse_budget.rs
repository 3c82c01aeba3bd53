/*
 * fuzz_targets/parse_budget.rs
 *
 * parse_budget must never panic. Overflow is the only error it may return.
 *
 * edge cases: "", ":::", "1:2:3:4:5", "99999999999999999999", " 7x", unicode
 */

#![no_main]

use killjoy::error::KilljoyError;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = core::str::from_utf8(data) {
        match killjoy::duration::parse_budget(s) {
            Ok(_) | Err(KilljoyError::DurationOverflow) => {}
            Err(e) => panic!("unexpected error for {s:?}: {e}"),
        }
    }
});
