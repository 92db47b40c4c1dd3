//! Span helpers for generation sessions.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for generation spans.
pub struct GenerationSpan;

impl GenerationSpan {
    /// Span covering one generation run.
    ///
    /// `status` and `error.message` are filled by [`SpanExt::record_result`];
    /// `steps` and `finish_reason` by the caller once the run ends.
    pub fn new(session_kind: &str, prompt_tokens: usize) -> Span {
        info_span!(
            "generation",
            session_kind = %session_kind,
            prompt_tokens = prompt_tokens,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            steps = tracing::field::Empty,
            finish_reason = tracing::field::Empty,
        )
    }
}
