//! Newline-delimited entry parsing.
//!
//! [`LineSplitter`] accepts arbitrary byte chunks and yields complete, trimmed,
//! non-empty lines. An incomplete trailing line is buffered until the next
//! chunk (or [`LineSplitter::finish`]) completes it, so chunk boundaries may
//! fall anywhere, including inside a multi-byte UTF-8 sequence.

use crate::{domain::metadata::normalize_entry, fetch::FetchError};

/// Incremental line splitter over a byte stream.
#[derive(Debug, Default)]
pub struct LineSplitter {
  pending: Vec<u8>,
}

impl LineSplitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Feed one chunk, returning every line it completes.
  pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FetchError> {
    let mut lines = Vec::new();
    let mut rest = chunk;

    while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
      let (line, tail) = rest.split_at(pos);
      rest = &tail[1..];

      if self.pending.is_empty() {
        push_line(&mut lines, line)?;
      } else {
        self.pending.extend_from_slice(line);
        let joined = std::mem::take(&mut self.pending);
        push_line(&mut lines, &joined)?;
      }
    }

    self.pending.extend_from_slice(rest);
    Ok(lines)
  }

  /// Flush the buffered trailing line, if any.
  pub fn finish(mut self) -> Result<Option<String>, FetchError> {
    let pending = std::mem::take(&mut self.pending);
    let mut lines = Vec::with_capacity(1);
    push_line(&mut lines, &pending)?;
    Ok(lines.pop())
  }
}

fn push_line(lines: &mut Vec<String>, raw: &[u8]) -> Result<(), FetchError> {
  // '\n' never occurs inside a multi-byte sequence, so a complete line is
  // always a complete UTF-8 unit
  let text = std::str::from_utf8(raw).map_err(|e| FetchError::Decode(e.to_string()))?;
  if let Some(entry) = normalize_entry(text) {
    lines.push(entry);
  }
  Ok(())
}

/// Parse a complete body into entries, preserving order.
pub fn parse_lines(body: &str) -> Vec<String> {
  body.lines().filter_map(normalize_entry).collect()
}
