//! Fuzz target for SentencePiece tokenizer descriptions.
//!
//! Arbitrary JSON must either fail to load or produce a tokenizer that can
//! encode and decode without panicking.

#![no_main]

use gg_text::tokenizer::{SentencePiece, SentencePieceConfig, Tokenizer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(sp) = SentencePiece::from_json(json, SentencePieceConfig::default()) {
            if let Ok(encoded) = sp.encode_with_length("hello wörld <s>", 32) {
                let _ = sp.decode(encoded.input_ids());
            }
        }
    }
});
