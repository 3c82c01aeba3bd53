/*
 * fuzz_targets/parse_args.rs
 *
 * CLI parsing plus config building must never panic on any argument list.
 *
 * edge cases: "-t" (missing value), "-qd", "-t5s", "--", very long args,
 * KILLJOY_TIME-style values passed inline
 */

#![no_main]

use clap::Parser;
use killjoy::args::Args;
use killjoy::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    /* split input on null bytes to simulate multiple arguments */
    let args: Vec<String> = core::iter::once("killjoy".to_string())
        .chain(
            data.split(|&b| b == 0)
                .filter_map(|chunk| core::str::from_utf8(chunk).ok())
                .map(String::from),
        )
        .collect();

    /* try_parse_from returns --version as an Err, it never exits */
    if let Ok(parsed) = Args::try_parse_from(&args) {
        let _ = Config::from_args(&parsed);
        let _ = parsed.program();
        let _ = parsed.program_args();
    }
});
