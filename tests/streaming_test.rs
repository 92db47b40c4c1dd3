//! Stop-sequence streaming tests.

use gg_text::TokenStreamer;

fn collect(stops: &[&str], fragments: &[&str]) -> (String, bool, Vec<String>) {
    let mut chunks = Vec::new();
    let stopped;
    {
        let mut streamer = TokenStreamer::new(stops.iter().copied(), |s: &str| {
            if !s.is_empty() {
                chunks.push(s.to_string())
            }
        });
        for fragment in fragments {
            streamer.push(fragment);
        }
        stopped = streamer.is_stopped();
        streamer.flush();
    }
    (chunks.concat(), stopped, chunks)
}

// =============================================================================
// Stop sequences
// =============================================================================

#[test]
fn test_stop_sequence_split_across_fragments() {
    let (text, stopped, _) = collect(&["world"], &["Hello wor", "ld"]);
    assert_eq!(text, "Hello ");
    assert!(stopped);
}

#[test]
fn test_stop_sequence_inside_one_fragment() {
    let (text, stopped, _) = collect(&["end"], &["the end"]);
    assert_eq!(text, "the ");
    assert!(stopped);
}

#[test]
fn test_input_after_stop_is_ignored() {
    let (text, _, _) = collect(&["#"], &["a#b", "more text"]);
    assert_eq!(text, "a");
}

#[test]
fn test_earliest_stop_sequence_wins() {
    let (text, _, _) = collect(&["cd", "b"], &["abcd"]);
    assert_eq!(text, "a");
}

#[test]
fn test_partial_match_that_diverges_is_released() {
    let (text, stopped, chunks) = collect(&["</s>"], &["x </", "p> y"]);
    assert_eq!(text, "x </p> y");
    assert!(!stopped);
    // "x </" must not be forwarded whole before the next fragment arrives.
    assert_ne!(chunks.first().map(String::as_str), Some("x </"));
}

// =============================================================================
// Pass-through
// =============================================================================

#[test]
fn test_no_stop_sequences_forwards_immediately() {
    let mut seen = Vec::new();
    let mut streamer = TokenStreamer::new(Vec::<String>::new(), |s: &str| seen.push(s.to_string()));
    streamer.push("ab");
    assert_eq!(streamer.pending(), "");
    streamer.push("cd");
    assert_eq!(streamer.text(), "abcd");
    drop(streamer);
    assert_eq!(seen, vec!["ab", "cd"]);
}

#[test]
fn test_flush_releases_held_tail() {
    let (text, stopped, _) = collect(&["STOP"], &["almost ST"]);
    assert_eq!(text, "almost ST");
    assert!(!stopped);
}

#[test]
fn test_multibyte_text_is_held_on_char_boundaries() {
    let mut streamer = TokenStreamer::new(["日本"], |_: &str| {});
    streamer.push("こんにちは日");
    assert_eq!(streamer.text(), "こんにちは");
    assert_eq!(streamer.pending(), "日");
    streamer.push("本語");
    assert!(streamer.is_stopped());
    assert_eq!(streamer.text(), "こんにちは");
}
