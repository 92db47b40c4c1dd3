//! gg-text: tokenization, incremental generation and post-processing kernels.
//!
//! - [`tokenizer`]: WordPiece, byte-level BPE and SentencePiece (BPE / Unigram)
//!   behind one [`tokenizer::Tokenizer`] trait.
//! - [`generation`]: prefill/decode sessions over a KV cache for decoder-only
//!   and encoder-decoder models, plus a greedy generator.
//! - [`streaming`]: stop-sequence aware text streaming.
//! - [`kernels`]: softmax family, top-k, NMS and CTC decoding.
//!
//! The model runtime is reached only through [`generation::InferenceSession`];
//! the `onnx` feature provides one backed by candle.

pub mod cli;
pub mod config;
pub mod generation;
pub mod kernels;
pub mod streaming;
pub mod telemetry;
pub mod tokenizer;

pub use generation::{
    DecoderSession, EncoderDecoderSession, GenerationError, GenerationSession, GreedyGenerator,
    InferenceSession, Tensor,
};
pub use streaming::TokenStreamer;
pub use tokenizer::{EncodedInput, Tokenizer, TokenizerError};
