//! Stop-sequence aware text streaming.
//!
//! Generated text arrives in fragments. [`TokenStreamer`] forwards it to a
//! sink as soon as it can no longer be the start of a stop sequence, and cuts
//! the stream at the first stop sequence it sees.

/// Incremental text filter that halts at configured stop sequences.
pub struct TokenStreamer<F>
where
    F: FnMut(&str),
{
    stop_sequences: Vec<String>,
    /// Characters kept back: longest stop sequence minus one.
    hold: usize,
    buffer: String,
    text: String,
    stopped: bool,
    sink: F,
}

impl<F> TokenStreamer<F>
where
    F: FnMut(&str),
{
    /// Empty stop strings are ignored.
    pub fn new<I, S>(stop_sequences: I, sink: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop_sequences: Vec<String> = stop_sequences
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        let longest = stop_sequences
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);

        Self {
            stop_sequences,
            hold: longest.saturating_sub(1),
            buffer: String::new(),
            text: String::new(),
            stopped: false,
            sink,
        }
    }

    /// Feed one fragment. Ignored once stopped.
    pub fn push(&mut self, fragment: &str) {
        if self.stopped {
            return;
        }
        self.buffer.push_str(fragment);

        if let Some(at) = self.find_stop() {
            let before = self.buffer[..at].to_string();
            self.emit(&before);
            self.buffer.clear();
            self.stopped = true;
            tracing::debug!(forwarded = self.text.len(), "stop sequence reached");
            return;
        }

        let char_count = self.buffer.chars().count();
        if char_count > self.hold {
            let split = self
                .buffer
                .char_indices()
                .nth(char_count - self.hold)
                .map_or(self.buffer.len(), |(i, _)| i);
            let ready: String = self.buffer.drain(..split).collect();
            self.emit(&ready);
        }
    }

    /// Forward whatever is still held. No-op once stopped.
    pub fn flush(&mut self) {
        if self.stopped {
            return;
        }
        let rest = std::mem::take(&mut self.buffer);
        self.emit(&rest);
    }

    /// All text forwarded to the sink so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Text held back awaiting more input.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Earliest match in the buffer; the longest stop sequence wins a tie.
    fn find_stop(&self) -> Option<usize> {
        self.stop_sequences
            .iter()
            .filter_map(|stop| self.buffer.find(stop.as_str()).map(|at| (at, stop.len())))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(at, _)| at)
    }

    fn emit(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        (self.sink)(chunk);
        self.text.push_str(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(stops: &[&str], fragments: &[&str]) -> (String, bool, Vec<String>) {
        let mut seen = Vec::new();
        let mut streamer = TokenStreamer::new(stops.iter().copied(), |s: &str| seen.push(s.to_string()));
        for fragment in fragments {
            streamer.push(fragment);
        }
        let text = streamer.text().to_string();
        let stopped = streamer.is_stopped();
        drop(streamer);
        (text, stopped, seen)
    }

    #[test]
    fn holds_possible_prefix() {
        let mut streamer = TokenStreamer::new(["world"], |_: &str| {});
        streamer.push("Hello wor");
        assert_eq!(streamer.text(), "Hello");
        assert_eq!(streamer.pending(), " wor");
        streamer.flush();
        assert_eq!(streamer.text(), "Hello wor");
    }

    #[test]
    fn stop_spanning_fragments() {
        let (text, stopped, _) = collect(&["world"], &["Hello wor", "ld", "ignored"]);
        assert_eq!(text, "Hello ");
        assert!(stopped);
    }

    #[test]
    fn earliest_match_wins() {
        let (text, _, _) = collect(&["cd", "abc"], &["xxabcd"]);
        assert_eq!(text, "xx");
    }

    #[test]
    fn no_stops_forwards_everything() {
        let (text, stopped, seen) = collect(&[], &["a", "b"]);
        assert_eq!(text, "ab");
        assert!(!stopped);
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn empty_stop_strings_ignored() {
        let (text, stopped, _) = collect(&[""], &["abc"]);
        assert_eq!(text, "abc");
        assert!(!stopped);
    }

    #[test]
    fn flush_after_stop_is_noop() {
        let mut streamer = TokenStreamer::new(["end"], |_: &str| {});
        streamer.push("the end of it");
        streamer.flush();
        assert_eq!(streamer.text(), "the ");
        assert!(streamer.pending().is_empty());
    }

    #[test]
    fn hold_counts_characters() {
        let mut streamer = TokenStreamer::new(["éé"], |_: &str| {});
        streamer.push("aéb");
        assert_eq!(streamer.text(), "aé");
        assert_eq!(streamer.pending(), "b");
    }
}
