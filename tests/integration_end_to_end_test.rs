//! End-to-end tests for the full text pipeline.
//!
//! Tests the complete flow: config → tokenizer → session → greedy → kernels.

mod common;

use common::{Role, ScriptedSession};
use gg_text::cli::tokenize_cmd::TokenizerArgs;
use gg_text::config;
use gg_text::generation::{DecoderSession, FinishReason, GenerationSession, GreedyGenerator};
use gg_text::kernels::{softmax, top_k};
use gg_text::tokenizer::{Tokenizer, WordPiece, WordPieceConfig};

const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\nhello\nworld\nhow\nare\nyou\n?\n!\n##s\nfine\nthanks\nbye";

fn unpadded() -> WordPiece {
    let config = WordPieceConfig { padding: false, ..WordPieceConfig::default() };
    WordPiece::from_vocab_str(VOCAB, config).unwrap()
}

#[test]
fn wordpiece_hello_world_without_padding() {
    let tokenizer = unpadded();
    let encoded = tokenizer.encode("hello world").unwrap();
    assert_eq!(encoded.input_ids(), &[2, 5, 6, 3]);
    assert_eq!(encoded.attention_mask(), &[1, 1, 1, 1]);
    assert_eq!(encoded.token_type_ids(), &[0, 0, 0, 0]);
}

#[test]
fn prompt_to_streamed_reply() {
    let tokenizer = unpadded();
    let prompt = tokenizer.encode("How are you?").unwrap().real_ids();
    assert_eq!(prompt, vec![2, 7, 8, 9, 10, 3]);

    let model = ScriptedSession::new(Role::Decoder, 2).with_script(vec![13, 14, 11, 15, 3]);
    let calls = model.shared();
    let mut session = DecoderSession::new(Box::new(model)).unwrap();

    let config = gg_text::generation::GreedyConfig {
        max_new_tokens: 16,
        eos_token_ids: vec![3],
        stop_sequences: vec!["bye".into()],
    };
    let mut streamed = String::new();
    let output = GreedyGenerator::new(&tokenizer, config)
        .generate(&mut session, &prompt, |s| streamed.push_str(s))
        .unwrap();

    assert_eq!(output.finish_reason, FinishReason::StopSequence);
    assert_eq!(output.text, "fine thanks ! ");
    assert_eq!(streamed, output.text);
    // Prompt plus the three tokens fed back before "bye" was produced.
    assert_eq!(session.cache_sequence_length(), prompt.len() + 3);
    assert_eq!(calls.calls.lock().unwrap()[0].input_ids, prompt);

    session.reset_cache();
    assert_eq!(session.cache_sequence_length(), 0);
    session.close().unwrap();
}

#[test]
fn config_file_drives_tokenizer_and_generation() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("gg-text.toml");
    std::fs::write(&config_path, "max_length = 6\nmax_new_tokens = 2\n").unwrap();
    let vocab_path = dir.path().join("vocab.txt");
    std::fs::write(&vocab_path, VOCAB).unwrap();

    let cfg = config::load_file(&config_path).unwrap();
    let args = TokenizerArgs::parse(&[
        "--kind".to_string(),
        "wordpiece".to_string(),
        vocab_path.display().to_string(),
        "hello world how are you".to_string(),
    ])
    .unwrap();
    let tokenizer = args.load(cfg.max_length).unwrap();
    let encoded = tokenizer.encode(&args.input).unwrap();
    assert_eq!(encoded.input_ids(), &[2, 5, 6, 7, 8, 3]);

    let model = ScriptedSession::new(Role::Decoder, 1).with_script(vec![13]);
    let mut session = DecoderSession::new(Box::new(model)).unwrap();
    let output = GreedyGenerator::new(tokenizer.as_ref(), cfg.greedy_config(vec![3]))
        .generate(&mut session, &encoded.real_ids(), |_| {})
        .unwrap();
    assert_eq!(output.tokens, vec![13, 13]);
    assert_eq!(output.finish_reason, FinishReason::MaxTokens);
}

#[test]
fn kernels_rank_final_logits() {
    let logits = [0.1, 2.5, -1.0, 2.4, 0.0];
    let probs = softmax(&logits);
    let best = top_k(&probs, 2);
    assert_eq!(best, vec![1, 3]);
    assert!(probs[1] > probs[3]);
}
