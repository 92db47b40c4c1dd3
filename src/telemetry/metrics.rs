//! Counter helpers over the `metrics` facade.
//!
//! Without an installed recorder every call is a no-op.

use metrics::counter;

/// Content tokens produced by a tokenizer family (`wordpiece`, `bpe`, `sentencepiece`).
pub fn record_tokens_encoded(family: &'static str, count: usize) {
    counter!("gg_text_tokens_encoded_total", "family" => family).increment(count as u64);
}

/// One prefill forward pass.
pub fn record_prefill(session: &'static str, prompt_tokens: usize) {
    counter!("gg_text_prefill_total", "session" => session).increment(1);
    counter!("gg_text_prompt_tokens_total", "session" => session).increment(prompt_tokens as u64);
}

/// One incremental decode step.
pub fn record_decode_step(session: &'static str) {
    counter!("gg_text_decode_steps_total", "session" => session).increment(1);
}

/// A sub-session that failed to close.
pub fn record_close_failure(component: &'static str) {
    counter!("gg_text_close_failures_total", "component" => component).increment(1);
}

/// A finished greedy generation, labelled by why it stopped.
pub fn record_generation_finished(reason: &'static str, new_tokens: usize) {
    counter!("gg_text_generations_total", "reason" => reason).increment(1);
    counter!("gg_text_generated_tokens_total").increment(new_tokens as u64);
}
