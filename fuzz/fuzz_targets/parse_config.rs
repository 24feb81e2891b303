/*
 * fuzz_targets/parse_config.rs
 *
 * fuzz target for startup validation. the parser and the config builder
 * must never panic on arbitrary argv shapes - they decide between "fork a
 * child" and "exit 2", and a panic would be a third, unspecified outcome.
 *
 * edge cases: empty strings, leading zeros, huge digit runs, embedded
 * NULs (argv separators), non-UTF8 chunks, arg counts other than two.
 */

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    /* the integer parser on the raw bytes as one token */
    if let Ok(s) = core::str::from_utf8(data) {
        let _ = procwrap::config::parse_positive_int(s);
    }

    /* split on NULs to simulate an argv; the builder must reject bad
     * shapes with an error, never a panic. the descriptor probe is a
     * no-op fcntl flag query, harmless on any fd number. */
    let args: Vec<String> = data
        .split(|&b| b == 0)
        .filter_map(|chunk| core::str::from_utf8(chunk).ok())
        .map(String::from)
        .collect();
    let _ = procwrap::config::SupervisionConfig::from_args(&args);
});
