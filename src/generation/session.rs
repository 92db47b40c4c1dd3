//! The inference-session boundary and the generation-session capability.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::{GenerationError, SessionError};
use super::tensor::Tensor;
use crate::tokenizer::TokenId;

/// Named tensors in or out of one forward pass.
///
/// Values are shared so cache tensors can be fed back without copying.
pub type TensorMap = HashMap<String, Arc<Tensor>>;

/// One loaded model that runs a named-tensor forward pass.
///
/// Implementations are called synchronously and are not required to be
/// shareable across threads.
pub trait InferenceSession: Send {
    /// Run one forward pass.
    fn run(&mut self, inputs: &TensorMap) -> Result<TensorMap, SessionError>;

    /// Names of the inputs the model declares.
    fn input_names(&self) -> HashSet<String>;

    /// Static shape of an input; dynamic dimensions are negative.
    fn input_shape(&self, name: &str) -> Option<Vec<i64>>;

    /// Release native resources. Calling again is a no-op.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// Prefill/decode over a KV cache.
///
/// A session is stateful and serves one generation stream at a time.
pub trait GenerationSession {
    /// Run the prompt and return the last-position logits. Replaces any cache.
    fn prefill(&mut self, tokens: &[TokenId]) -> Result<Vec<f32>, GenerationError>;

    /// Feed one token after a prefill and return its logits.
    fn decode(&mut self, token: TokenId) -> Result<Vec<f32>, GenerationError>;

    /// Positions held in the cache; 0 when empty.
    fn cache_sequence_length(&self) -> usize;

    /// Drop the cache. The next call must be `prefill`.
    fn reset_cache(&mut self);

    /// Close every owned inference session.
    fn close(&mut self) -> Result<(), GenerationError>;

    /// Short label used in logs and metrics.
    fn kind(&self) -> &'static str;
}

/// Fetch a required output tensor.
pub(crate) fn take_output(outputs: &mut TensorMap, name: &str) -> Result<Arc<Tensor>, GenerationError> {
    outputs
        .remove(name)
        .ok_or_else(|| GenerationError::MissingOutput(name.to_string()))
}
