//! Greedy (argmax) generation loop over any [`GenerationSession`].

use serde::Serialize;

use super::error::GenerationError;
use super::session::GenerationSession;
use crate::kernels::argmax;
use crate::streaming::TokenStreamer;
use crate::telemetry::{self, GenerationSpan, SpanExt};
use crate::tokenizer::{TokenId, Tokenizer};

/// Why generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// An end-of-sequence token was selected.
    Stop,
    /// A stop sequence appeared in the text.
    StopSequence,
    /// The new-token budget ran out.
    MaxTokens,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::StopSequence => "stop_sequence",
            Self::MaxTokens => "max_tokens",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// Generated ids, excluding the prompt and any EOS.
    pub tokens: Vec<TokenId>,
    /// Text forwarded before any stop sequence.
    pub text: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone)]
pub struct GreedyConfig {
    pub max_new_tokens: usize,
    pub eos_token_ids: Vec<TokenId>,
    pub stop_sequences: Vec<String>,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            eos_token_ids: Vec::new(),
            stop_sequences: Vec::new(),
        }
    }
}

/// Argmax decoding with incremental detokenization.
pub struct GreedyGenerator<'a> {
    tokenizer: &'a dyn Tokenizer,
    config: GreedyConfig,
}

impl<'a> GreedyGenerator<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, config: GreedyConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> &GreedyConfig {
        &self.config
    }

    /// Prefill `prompt`, then pick the highest-scoring token until EOS, a stop
    /// sequence, or the budget. `on_text` receives text as it becomes final.
    pub fn generate<S, F>(
        &self,
        session: &mut S,
        prompt: &[TokenId],
        on_text: F,
    ) -> Result<GenerationOutput, GenerationError>
    where
        S: GenerationSession + ?Sized,
        F: FnMut(&str),
    {
        let span = GenerationSpan::new(session.kind(), prompt.len());
        let _guard = span.enter();

        let result = self.run(session, prompt, on_text);
        span.record_result(&result);
        if let Ok(output) = &result {
            span.record("steps", output.tokens.len());
            span.record("finish_reason", output.finish_reason.as_str());
            telemetry::record_generation_finished(output.finish_reason.as_str(), output.tokens.len());
        }
        result
    }

    fn run<S, F>(
        &self,
        session: &mut S,
        prompt: &[TokenId],
        on_text: F,
    ) -> Result<GenerationOutput, GenerationError>
    where
        S: GenerationSession + ?Sized,
        F: FnMut(&str),
    {
        let mut streamer = TokenStreamer::new(self.config.stop_sequences.iter().cloned(), on_text);
        let mut tokens = Vec::new();
        let mut window = DecodeWindow::default();
        let mut finish_reason = FinishReason::MaxTokens;

        let mut logits = session.prefill(prompt)?;
        while tokens.len() < self.config.max_new_tokens {
            let next = argmax(&logits)
                .ok_or_else(|| GenerationError::MissingOutput("empty logits".into()))?
                as TokenId;
            if self.config.eos_token_ids.contains(&next) {
                finish_reason = FinishReason::Stop;
                break;
            }
            tokens.push(next);

            if let Some(delta) = window.advance(self.tokenizer, &tokens)? {
                streamer.push(&delta);
            }
            if streamer.is_stopped() {
                finish_reason = FinishReason::StopSequence;
                break;
            }
            if tokens.len() == self.config.max_new_tokens {
                break;
            }
            logits = session.decode(next)?;
        }

        streamer.flush();
        Ok(GenerationOutput {
            text: streamer.text().to_string(),
            tokens,
            finish_reason,
        })
    }
}

/// Incremental detokenization over a short token window.
///
/// Only `tokens[prefix..]` is decoded each step. The token before the new
/// ones stays in the window so spacing and `##`-style joins resolve the same
/// way as in a full decode.
#[derive(Debug, Default)]
struct DecodeWindow {
    prefix: usize,
    read: usize,
}

impl DecodeWindow {
    /// Text added by the tokens past `read`, or `None` while a multi-token
    /// character is still incomplete.
    fn advance(
        &mut self,
        tokenizer: &dyn Tokenizer,
        tokens: &[TokenId],
    ) -> Result<Option<String>, GenerationError> {
        let before = tokenizer.decode(&tokens[self.prefix..self.read])?;
        let after = tokenizer.decode(&tokens[self.prefix..])?;
        if after.ends_with(char::REPLACEMENT_CHARACTER) {
            return Ok(None);
        }
        let delta = after[common_prefix_len(&before, &after)..].to_string();
        self.prefix = self.read;
        self.read = tokens.len();
        Ok(Some(delta))
    }
}

/// Byte length of the longest common character prefix.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i)
}
