//! Line reassembly over engine log frames.
//!
//! Engine frames do not respect line boundaries, so each stream keeps its
//! own partial-line buffer. Complete lines are classified in arrival order.

use crate::classifier::classify;
use crate::types::{LogChunk, LogEntry, StreamKind};

/// Longest line kept in a splitter buffer. A longer unterminated run is
/// emitted as a line of its own once it reaches this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into lines, carrying partial lines across pushes.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Creates an empty splitter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends bytes and returns every line they complete.
    ///
    /// Returned lines have their `\n` (and a preceding `\r`) removed. The
    /// buffer never holds more than [`MAX_LINE_BYTES`]; a run that fills it
    /// without a newline is returned as a line.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let room = MAX_LINE_BYTES - self.pending.len();
            let window = &rest[..rest.len().min(room)];
            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                self.pending.extend_from_slice(&window[..pos]);
                lines.push(take_line(&mut self.pending));
                rest = &rest[pos + 1..];
            } else {
                self.pending.extend_from_slice(window);
                rest = &rest[window.len()..];
                if self.pending.len() == MAX_LINE_BYTES {
                    lines.push(take_line(&mut self.pending));
                }
            }
        }
        lines
    }

    /// Returns the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(take_line(&mut self.pending))
        }
    }

    /// Number of buffered bytes not yet forming a line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn take_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    line
}

/// Turns engine frames into classified entries.
///
/// Blank lines are dropped. Order is preserved within each stream.
#[derive(Debug, Default)]
pub struct LineDecoder {
    stdout: LineSplitter,
    stderr: LineSplitter,
}

impl LineDecoder {
    /// Creates a decoder with empty buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stdout: LineSplitter::new(),
            stderr: LineSplitter::new(),
        }
    }

    /// Feeds one frame and returns the entries it completes.
    pub fn push(&mut self, chunk: &LogChunk) -> Vec<LogEntry> {
        let lines = self.splitter(chunk.stream).push(&chunk.data);
        classify_lines(lines, chunk.stream)
    }

    /// Flushes partial lines at end of input, stdout first.
    pub fn finish(&mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        for stream in [StreamKind::Stdout, StreamKind::Stderr] {
            if let Some(line) = self.splitter(stream).finish() {
                entries.extend(classify_lines([line], stream));
            }
        }
        entries
    }

    fn splitter(&mut self, stream: StreamKind) -> &mut LineSplitter {
        match stream {
            StreamKind::Stdout => &mut self.stdout,
            StreamKind::Stderr => &mut self.stderr,
        }
    }
}

fn classify_lines(lines: impl IntoIterator<Item = String>, stream: StreamKind) -> Vec<LogEntry> {
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| classify(&line, stream))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    // ===========================================
    // LineSplitter Tests
    // ===========================================

    #[test]
    fn splitter_returns_complete_lines() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"one\ntwo\nthr");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(splitter.pending_len(), 3);

        let lines = splitter.push(b"ee\n");
        assert_eq!(lines, vec!["three"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn splitter_strips_carriage_return() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"dos line\r\n"), vec!["dos line"]);
    }

    #[test]
    fn splitter_finish_returns_tail() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"no newline").is_empty());
        assert_eq!(splitter.finish().as_deref(), Some("no newline"));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn splitter_replaces_invalid_utf8() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"bad \xff byte\n");
        assert_eq!(lines, vec!["bad \u{fffd} byte"]);
    }

    #[test]
    fn splitter_joins_multibyte_split_across_pushes() {
        let mut splitter = LineSplitter::new();
        let bytes = "héllo\n".as_bytes();
        assert!(splitter.push(&bytes[..2]).is_empty());
        assert_eq!(splitter.push(&bytes[2..]), vec!["héllo"]);
    }

    #[test]
    fn splitter_caps_unterminated_run() {
        let mut splitter = LineSplitter::new();
        let run = vec![b'x'; MAX_LINE_BYTES * 2 + 10];

        let lines = splitter.push(&run);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == MAX_LINE_BYTES));
        assert_eq!(splitter.pending_len(), 10);
    }

    #[test]
    fn splitter_caps_across_small_pushes() {
        let mut splitter = LineSplitter::new();
        let piece = vec![b'y'; 1000];
        let mut emitted = 0;
        for _ in 0..100 {
            emitted += splitter.push(&piece).len();
            assert!(splitter.pending_len() <= MAX_LINE_BYTES);
        }
        assert_eq!(emitted, 100_000 / MAX_LINE_BYTES);
        assert_eq!(splitter.push(b"end\n").len(), 1);
        assert_eq!(splitter.pending_len(), 0);
    }

    // ===========================================
    // LineDecoder Tests
    // ===========================================

    #[test]
    fn decoder_keeps_streams_apart() {
        let mut decoder = LineDecoder::new();
        let mut entries = decoder.push(&LogChunk::stdout("out part"));
        entries.extend(decoder.push(&LogChunk::stderr("ERROR on stderr\n")));
        entries.extend(decoder.push(&LogChunk::stdout(" done\n")));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stream, StreamKind::Stderr);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert_eq!(entries[1].stream, StreamKind::Stdout);
        assert_eq!(entries[1].raw, "out part done");
    }

    #[test]
    fn decoder_skips_blank_lines() {
        let mut decoder = LineDecoder::new();
        let entries = decoder.push(&LogChunk::stdout("a\n\n   \nb\n"));
        let raws: Vec<_> = entries.iter().map(|e| e.raw.as_str()).collect();
        assert_eq!(raws, vec!["a", "b"]);
    }

    #[test]
    fn decoder_finish_flushes_both_streams() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&LogChunk::stderr("err tail")).is_empty());
        assert!(decoder.push(&LogChunk::stdout("out tail")).is_empty());

        let entries = decoder.finish();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stream, StreamKind::Stdout);
        assert_eq!(entries[1].stream, StreamKind::Stderr);
        assert!(decoder.finish().is_empty());
    }
}
