//! Decoder-only generation session.

use std::sync::Arc;

use super::cache::{CacheGeometry, CacheNaming, KvCache, LayerCache};
use super::error::{GenerationError, SessionError};
use super::session::{take_output, GenerationSession, InferenceSession, TensorMap};
use super::tensor::Tensor;
use crate::telemetry;
use crate::tokenizer::TokenId;

const INPUT_IDS: &str = "input_ids";
const ATTENTION_MASK: &str = "attention_mask";
const POSITION_IDS: &str = "position_ids";
const LOGITS: &str = "logits";

/// Prefill/decode over a single decoder model with a self-attention cache.
pub struct DecoderSession {
    session: Box<dyn InferenceSession>,
    naming: CacheNaming,
    geometry: CacheGeometry,
    /// Supply `position_ids` only when the model declares it.
    uses_position_ids: bool,
    cache: KvCache,
    closed: bool,
}

impl std::fmt::Debug for DecoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderSession")
            .field("geometry", &self.geometry)
            .field("sequence_length", &self.cache.sequence_length())
            .field("closed", &self.closed)
            .finish()
    }
}

impl DecoderSession {
    /// Wrap a session using the `past_key_values.{i}.key` naming.
    pub fn new(session: Box<dyn InferenceSession>) -> Result<Self, GenerationError> {
        Self::with_naming(session, CacheNaming::decoder_only())
    }

    /// Layer count and head geometry are read from the model's inputs.
    pub fn with_naming(
        session: Box<dyn InferenceSession>,
        naming: CacheNaming,
    ) -> Result<Self, GenerationError> {
        let geometry = CacheGeometry::discover(session.as_ref(), &naming)?;
        let uses_position_ids = session.input_names().contains(POSITION_IDS);

        tracing::info!(
            layers = geometry.num_layers,
            heads = geometry.num_heads,
            head_dim = geometry.head_dim,
            position_ids = uses_position_ids,
            "decoder session ready"
        );

        Ok(Self {
            session,
            naming,
            geometry,
            uses_position_ids,
            cache: KvCache::default(),
            closed: false,
        })
    }

    pub fn geometry(&self) -> CacheGeometry {
        self.geometry
    }

    pub fn cache(&self) -> &KvCache {
        &self.cache
    }

    /// Zero-length cache inputs so the first pass sees a well-formed cache.
    fn empty_cache(&self) -> KvCache {
        let shape = vec![1, self.geometry.num_heads, 0, self.geometry.head_dim];
        let layers = (0..self.geometry.num_layers)
            .map(|_| LayerCache {
                self_key: Arc::new(Tensor::zeros_f32(shape.clone())),
                self_value: Arc::new(Tensor::zeros_f32(shape.clone())),
                cross_key: None,
                cross_value: None,
            })
            .collect();
        let mut cache = KvCache::default();
        cache.replace(layers, 0);
        cache
    }

    /// One forward pass feeding `tokens` at positions `past..past + tokens.len()`.
    fn step(&mut self, tokens: Vec<TokenId>, past: &KvCache) -> Result<Vec<f32>, GenerationError> {
        if self.closed {
            return Err(SessionError::Closed.into());
        }
        let past_length = past.sequence_length();
        let new_length = past_length + tokens.len();
        let positions = (past_length as i64..new_length as i64).collect();

        let mut inputs = TensorMap::new();
        inputs.insert(INPUT_IDS.into(), Arc::new(Tensor::row_i64(tokens)));
        inputs.insert(ATTENTION_MASK.into(), Arc::new(Tensor::row_i64(vec![1; new_length])));
        if self.uses_position_ids {
            inputs.insert(POSITION_IDS.into(), Arc::new(Tensor::row_i64(positions)));
        }
        past.write_inputs(&self.naming, &mut inputs);

        let mut outputs = self.session.run(&inputs)?;
        let logits = take_output(&mut outputs, LOGITS)?.last_position_logits()?;
        let layers =
            KvCache::take_self_attention(&mut outputs, &self.naming, self.geometry.num_layers, &[])?;

        self.cache.replace(layers, new_length);
        Ok(logits)
    }
}

impl GenerationSession for DecoderSession {
    fn prefill(&mut self, tokens: &[TokenId]) -> Result<Vec<f32>, GenerationError> {
        if tokens.is_empty() {
            return Err(GenerationError::EmptyInput);
        }
        let empty = self.empty_cache();
        let logits = self.step(tokens.to_vec(), &empty)?;

        telemetry::record_prefill(self.kind(), tokens.len());
        tracing::debug!(tokens = tokens.len(), "decoder prefill");
        Ok(logits)
    }

    fn decode(&mut self, token: TokenId) -> Result<Vec<f32>, GenerationError> {
        if self.cache.is_empty() {
            return Err(GenerationError::NotPrimed);
        }
        let past = self.cache.clone();
        let logits = self.step(vec![token], &past)?;

        telemetry::record_decode_step(self.kind());
        tracing::debug!(token, sequence_length = self.cache.sequence_length(), "decoder step");
        Ok(logits)
    }

    fn cache_sequence_length(&self) -> usize {
        self.cache.sequence_length()
    }

    fn reset_cache(&mut self) {
        self.cache.clear();
    }

    fn close(&mut self) -> Result<(), GenerationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cache.clear();
        self.session.close().map_err(|e| {
            telemetry::record_close_failure("decoder");
            tracing::warn!(error = %e, "decoder session close failed");
            GenerationError::CloseFailed { failures: vec![format!("decoder: {}", e)] }
        })
    }

    fn kind(&self) -> &'static str {
        "decoder"
    }
}

impl Drop for DecoderSession {
    fn drop(&mut self) {
        let _ = GenerationSession::close(self);
    }
}
