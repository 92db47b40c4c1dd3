//! Greedy generation over scripted sessions with a real tokenizer.

mod common;

use common::{Role, ScriptedSession};
use gg_text::generation::{
    DecoderSession, EncoderDecoderSession, FinishReason, GenerationError, GenerationSession,
    GreedyConfig, GreedyGenerator,
};
use gg_text::tokenizer::{WordPiece, WordPieceConfig};

// Sixteen entries so every scripted logit index maps to a token.
const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\nthe\ncat\nsat\non\nmat\n.\nend\n##s\ndog\nran\na";
const SEP: i64 = 3;

fn tokenizer() -> WordPiece {
    WordPiece::from_vocab_str(VOCAB, WordPieceConfig::default()).unwrap()
}

fn config(max_new_tokens: usize, stops: &[&str]) -> GreedyConfig {
    GreedyConfig {
        max_new_tokens,
        eos_token_ids: vec![SEP],
        stop_sequences: stops.iter().map(|s| s.to_string()).collect(),
    }
}

fn decoder(script: Vec<usize>) -> (DecoderSession, std::sync::Arc<common::Shared>) {
    let model = ScriptedSession::new(Role::Decoder, 2).with_script(script);
    let shared = model.shared();
    (DecoderSession::new(Box::new(model)).unwrap(), shared)
}

#[test]
fn stops_on_eos_and_excludes_it() {
    let tok = tokenizer();
    let (mut session, _) = decoder(vec![5, 6, 7, 3]);
    let generator = GreedyGenerator::new(&tok, config(32, &[]));

    let mut streamed = String::new();
    let output = generator
        .generate(&mut session, &[2, 13], |s| streamed.push_str(s))
        .unwrap();

    assert_eq!(output.tokens, vec![5, 6, 7]);
    assert_eq!(output.text, "the cat sat");
    assert_eq!(output.finish_reason, FinishReason::Stop);
    assert_eq!(streamed, output.text);
}

#[test]
fn stops_at_token_budget() {
    let tok = tokenizer();
    let (mut session, shared) = decoder(vec![5, 6]);
    let generator = GreedyGenerator::new(&tok, config(4, &[]));

    let output = generator.generate(&mut session, &[2], |_| {}).unwrap();
    assert_eq!(output.tokens, vec![5, 6, 6, 6]);
    assert_eq!(output.text, "the cat cat cat");
    assert_eq!(output.finish_reason, FinishReason::MaxTokens);
    // One prefill and three decodes; the last token is never fed back.
    assert_eq!(shared.calls.lock().unwrap().len(), 4);
    assert_eq!(session.cache_sequence_length(), 4);
}

#[test]
fn stop_sequence_truncates_text() {
    let tok = tokenizer();
    let (mut session, _) = decoder(vec![5, 6, 7, 8, 9]);
    let generator = GreedyGenerator::new(&tok, config(32, &["sat"]));

    let mut chunks = Vec::new();
    let output = generator
        .generate(&mut session, &[2], |s| chunks.push(s.to_string()))
        .unwrap();

    assert_eq!(output.finish_reason, FinishReason::StopSequence);
    assert_eq!(output.tokens, vec![5, 6, 7]);
    assert_eq!(output.text, "the cat ");
    assert_eq!(chunks.concat(), "the cat ");
}

#[test]
fn continuation_pieces_stream_without_spaces() {
    let tok = tokenizer();
    let (mut session, _) = decoder(vec![13, 12, 14, 3]);
    let generator = GreedyGenerator::new(&tok, config(32, &[]));

    let mut chunks = Vec::new();
    let output = generator
        .generate(&mut session, &[2], |s| chunks.push(s.to_string()))
        .unwrap();
    assert_eq!(output.text, "dogs ran");
    assert_eq!(chunks, vec!["dog", "s", " ran"]);
}

#[test]
fn empty_prompt_is_rejected() {
    let tok = tokenizer();
    let (mut session, shared) = decoder(vec![5]);
    let generator = GreedyGenerator::new(&tok, config(8, &[]));

    let err = generator.generate(&mut session, &[], |_| {}).unwrap_err();
    assert!(matches!(err, GenerationError::EmptyInput));
    assert!(shared.calls.lock().unwrap().is_empty());
}

#[test]
fn inference_failure_propagates() {
    let tok = tokenizer();
    let model = ScriptedSession::new(Role::Decoder, 1)
        .with_script(vec![5, 6, 7])
        .failing_run_at(2);
    let mut session = DecoderSession::new(Box::new(model)).unwrap();
    let generator = GreedyGenerator::new(&tok, config(8, &[]));

    let err = generator.generate(&mut session, &[2], |_| {}).unwrap_err();
    assert!(err.is_inference_failure());
}

#[test]
fn encoder_decoder_generation() {
    let tok = tokenizer();
    let encoder = ScriptedSession::new(Role::Encoder, 0);
    let first = ScriptedSession::new(Role::FirstDecoder, 2).with_script(vec![7]);
    let with_past = ScriptedSession::new(Role::DecoderWithPast, 2).with_script(vec![8, 3]);
    let with_past_calls = with_past.shared();
    let mut session =
        EncoderDecoderSession::new(Box::new(encoder), Box::new(first), Box::new(with_past), 0)
            .unwrap();
    let generator = GreedyGenerator::new(&tok, config(16, &[]));

    let output = generator.generate(&mut session, &[5, 6, 3], |_| {}).unwrap();
    assert_eq!(output.tokens, vec![7, 8]);
    assert_eq!(output.text, "sat on");
    assert_eq!(output.finish_reason, FinishReason::Stop);

    let calls = with_past_calls.calls.lock().unwrap();
    let fed: Vec<i64> = calls.iter().flat_map(|c| c.input_ids.clone()).collect();
    assert_eq!(fed, vec![7, 8]);
}
