//! Fuzz target for WordPiece normalization and segmentation.

#![no_main]

use std::sync::OnceLock;

use gg_text::tokenizer::{Tokenizer, WordPiece, WordPieceConfig};
use libfuzzer_sys::fuzz_target;

const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\na\nb\n##a\n##b\nab\n日\n!";

fn tokenizer() -> Option<&'static WordPiece> {
    static TOKENIZER: OnceLock<Option<WordPiece>> = OnceLock::new();
    TOKENIZER
        .get_or_init(|| WordPiece::from_vocab_str(VOCAB, WordPieceConfig::default()).ok())
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let Some(wp) = tokenizer() else { return };
    let text = String::from_utf8_lossy(data);
    if let Ok(encoded) = wp.encode_with_length(&text, 64) {
        assert_eq!(encoded.input_ids().len(), 64);
        let _ = wp.decode(encoded.input_ids());
    }
    let mid = (0..=text.len() / 2)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    let (first, second) = text.split_at(mid);
    let _ = wp.encode_pair(first, second, 64);
});
