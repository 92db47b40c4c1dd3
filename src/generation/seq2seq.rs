//! Encoder-decoder generation session.
//!
//! Three models cooperate: the encoder, a first-step decoder that also emits
//! the cross-attention cache, and a decoder-with-past for every later step.
//! Cross-attention tensors come from the first decoder pass and are fed back
//! by reference on every step without being recomputed.

use std::sync::Arc;

use super::cache::{CacheNaming, KvCache};
use super::error::{GenerationError, SessionError};
use super::session::{take_output, GenerationSession, InferenceSession, TensorMap};
use super::tensor::Tensor;
use crate::telemetry;
use crate::tokenizer::TokenId;

const INPUT_IDS: &str = "input_ids";
const ATTENTION_MASK: &str = "attention_mask";
const ENCODER_HIDDEN_STATES: &str = "encoder_hidden_states";
const ENCODER_ATTENTION_MASK: &str = "encoder_attention_mask";
const LAST_HIDDEN_STATE: &str = "last_hidden_state";
const LOGITS: &str = "logits";

/// Source-side state fixed by `prefill`.
#[derive(Debug, Clone)]
struct EncoderState {
    hidden: Arc<Tensor>,
    mask: Arc<Tensor>,
}

/// Prefill/decode over an encoder, a decoder and a decoder-with-past.
pub struct EncoderDecoderSession {
    encoder: Box<dyn InferenceSession>,
    decoder: Box<dyn InferenceSession>,
    decoder_with_past: Box<dyn InferenceSession>,
    naming: CacheNaming,
    num_layers: usize,
    decoder_start_token: TokenId,
    /// `encoder_hidden_states` is only fed to the with-past decoder if declared.
    with_past_takes_hidden: bool,
    encoder_state: Option<EncoderState>,
    cache: KvCache,
    closed: bool,
}

impl std::fmt::Debug for EncoderDecoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderDecoderSession")
            .field("num_layers", &self.num_layers)
            .field("decoder_start_token", &self.decoder_start_token)
            .field("sequence_length", &self.cache.sequence_length())
            .field("closed", &self.closed)
            .finish()
    }
}

impl EncoderDecoderSession {
    /// Layer count is discovered from the decoder-with-past inputs.
    pub fn new(
        encoder: Box<dyn InferenceSession>,
        decoder: Box<dyn InferenceSession>,
        decoder_with_past: Box<dyn InferenceSession>,
        decoder_start_token: TokenId,
    ) -> Result<Self, GenerationError> {
        Self::with_naming(
            encoder,
            decoder,
            decoder_with_past,
            decoder_start_token,
            CacheNaming::encoder_decoder(),
        )
    }

    pub fn with_naming(
        encoder: Box<dyn InferenceSession>,
        decoder: Box<dyn InferenceSession>,
        decoder_with_past: Box<dyn InferenceSession>,
        decoder_start_token: TokenId,
        naming: CacheNaming,
    ) -> Result<Self, GenerationError> {
        if !naming.has_cross_attention() {
            return Err(GenerationError::Discovery(
                "encoder-decoder naming needs cross-attention names".into(),
            ));
        }
        let names = decoder_with_past.input_names();
        let num_layers = naming.count_layers(&names);
        if num_layers == 0 {
            return Err(GenerationError::Discovery(format!(
                "decoder-with-past has no input matching {}",
                naming.past_key
            )));
        }
        let with_past_takes_hidden = names.contains(ENCODER_HIDDEN_STATES);

        tracing::info!(
            layers = num_layers,
            decoder_start_token,
            "encoder-decoder session ready"
        );

        Ok(Self {
            encoder,
            decoder,
            decoder_with_past,
            naming,
            num_layers,
            decoder_start_token,
            with_past_takes_hidden,
            encoder_state: None,
            cache: KvCache::default(),
            closed: false,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn cache(&self) -> &KvCache {
        &self.cache
    }

    fn ensure_open(&self) -> Result<(), GenerationError> {
        if self.closed {
            Err(SessionError::Closed.into())
        } else {
            Ok(())
        }
    }
}

impl GenerationSession for EncoderDecoderSession {
    /// Encode the source, then run the first decoder step from the start token.
    fn prefill(&mut self, tokens: &[TokenId]) -> Result<Vec<f32>, GenerationError> {
        self.ensure_open()?;
        if tokens.is_empty() {
            return Err(GenerationError::EmptyInput);
        }

        let mask = Arc::new(Tensor::row_i64(vec![1; tokens.len()]));
        let mut encoder_inputs = TensorMap::new();
        encoder_inputs.insert(INPUT_IDS.into(), Arc::new(Tensor::row_i64(tokens.to_vec())));
        encoder_inputs.insert(ATTENTION_MASK.into(), Arc::clone(&mask));
        let mut encoded = self.encoder.run(&encoder_inputs)?;
        let hidden = take_output(&mut encoded, LAST_HIDDEN_STATE)?;

        let mut decoder_inputs = TensorMap::new();
        decoder_inputs.insert(
            INPUT_IDS.into(),
            Arc::new(Tensor::row_i64(vec![self.decoder_start_token])),
        );
        decoder_inputs.insert(ENCODER_HIDDEN_STATES.into(), Arc::clone(&hidden));
        decoder_inputs.insert(ENCODER_ATTENTION_MASK.into(), Arc::clone(&mask));
        let mut outputs = self.decoder.run(&decoder_inputs)?;

        let logits = take_output(&mut outputs, LOGITS)?.last_position_logits()?;
        let layers = KvCache::take_with_cross(&mut outputs, &self.naming, self.num_layers)?;

        self.cache.replace(layers, 1);
        self.encoder_state = Some(EncoderState { hidden, mask });

        telemetry::record_prefill(self.kind(), tokens.len());
        tracing::debug!(source_tokens = tokens.len(), "encoder-decoder prefill");
        Ok(logits)
    }

    /// Only the self-attention cache is replaced; cross-attention stays frozen.
    fn decode(&mut self, token: TokenId) -> Result<Vec<f32>, GenerationError> {
        self.ensure_open()?;
        let state = match (&self.encoder_state, self.cache.is_empty()) {
            (Some(state), false) => state.clone(),
            _ => return Err(GenerationError::NotPrimed),
        };

        let mut inputs = TensorMap::new();
        inputs.insert(INPUT_IDS.into(), Arc::new(Tensor::row_i64(vec![token])));
        inputs.insert(ENCODER_ATTENTION_MASK.into(), state.mask);
        if self.with_past_takes_hidden {
            inputs.insert(ENCODER_HIDDEN_STATES.into(), state.hidden);
        }
        self.cache.write_inputs(&self.naming, &mut inputs);

        let mut outputs = self.decoder_with_past.run(&inputs)?;
        let logits = take_output(&mut outputs, LOGITS)?.last_position_logits()?;
        let layers = KvCache::take_self_attention(
            &mut outputs,
            &self.naming,
            self.num_layers,
            self.cache.layers(),
        )?;

        let sequence_length = self.cache.sequence_length() + 1;
        self.cache.replace(layers, sequence_length);

        telemetry::record_decode_step(self.kind());
        tracing::debug!(token, sequence_length, "encoder-decoder step");
        Ok(logits)
    }

    fn cache_sequence_length(&self) -> usize {
        self.cache.sequence_length()
    }

    fn reset_cache(&mut self) {
        self.cache.clear();
        self.encoder_state = None;
    }

    /// Every sub-session is closed even when an earlier one fails.
    fn close(&mut self) -> Result<(), GenerationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reset_cache();

        let sessions: [(&'static str, &mut Box<dyn InferenceSession>); 3] = [
            ("encoder", &mut self.encoder),
            ("decoder", &mut self.decoder),
            ("decoder_with_past", &mut self.decoder_with_past),
        ];
        let mut failures = Vec::new();
        for (component, session) in sessions {
            if let Err(e) = session.close() {
                telemetry::record_close_failure(component);
                tracing::warn!(component, error = %e, "sub-session close failed");
                failures.push(format!("{}: {}", component, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::CloseFailed { failures })
        }
    }

    fn kind(&self) -> &'static str {
        "encoder_decoder"
    }
}

impl Drop for EncoderDecoderSession {
    fn drop(&mut self) {
        let _ = GenerationSession::close(self);
    }
}
