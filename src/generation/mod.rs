//! Incremental generation over a KV cache.
//!
//! [`InferenceSession`] is the only boundary to a model runtime. The
//! decoder-only and encoder-decoder sessions own their inference sessions
//! and cache, and [`GreedyGenerator`] drives either one.

mod cache;
#[cfg(feature = "onnx")]
mod candle;
mod decoder;
mod error;
mod greedy;
mod seq2seq;
mod session;
mod tensor;

pub use cache::{CacheGeometry, CacheNaming, KvCache, LayerCache};
#[cfg(feature = "onnx")]
pub use candle::CandleSession;
pub use decoder::DecoderSession;
pub use error::{GenerationError, SessionError, TensorError};
pub use greedy::{FinishReason, GenerationOutput, GreedyConfig, GreedyGenerator};
pub use seq2seq::EncoderDecoderSession;
pub use session::{GenerationSession, InferenceSession, TensorMap};
pub use tensor::{DataType, Tensor, TensorData};
