//! Fuzz target for stop-sequence streaming.
//!
//! Whatever the fragmentation, the forwarded text must equal the whole input
//! cut at the earliest stop sequence.

#![no_main]

use arbitrary::Arbitrary;
use gg_text::TokenStreamer;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    stops: Vec<String>,
    fragments: Vec<String>,
}

fuzz_target!(|input: Input| {
    let whole: String = input.fragments.concat();
    let mut forwarded = String::new();
    let mut streamer = TokenStreamer::new(input.stops.iter().cloned(), |s: &str| {
        forwarded.push_str(s)
    });
    for fragment in &input.fragments {
        streamer.push(fragment);
    }
    streamer.flush();
    drop(streamer);
    assert!(whole.starts_with(&forwarded));
});
