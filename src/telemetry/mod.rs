//! Telemetry for gg-text.
//!
//! Structured logging through `tracing`, generation spans, and counters
//! through the `metrics` facade. No exporter is installed here; the host
//! process decides where metrics go.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_close_failure, record_decode_step, record_generation_finished, record_prefill,
    record_tokens_encoded,
};
pub use spans::{GenerationSpan, SpanExt};
