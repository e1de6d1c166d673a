// src/decode/mod.rs

use std::collections::VecDeque;
use std::io::Read;

use thiserror::Error;

use crate::record::StepRecord;

/// A line carries a record iff it starts with these six bytes.
const DATA_PREFIX: &[u8] = b"data: ";

const READ_CHUNK: usize = 8 * 1024;

/// Fatal conditions that terminate a planning stream.
///
/// Malformed individual data lines are *not* represented here: they are
/// skipped inside the decoder (see [`StepStream::issues`]) and never reach
/// the consumer as errors.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream could not be opened at all; no records were ever produced.
    #[error("planning request failed: {0}")]
    Connection(String),
    /// The byte source failed mid-stream; records already yielded stand.
    #[error("planning stream interrupted: {0}")]
    Read(#[from] std::io::Error),
}

/// A malformed data line the decoder skipped, kept for diagnostics.
#[derive(Clone, Debug)]
pub struct DecodeIssue {
    pub line: String,
    pub reason: String,
}

/// Pull-based decoder turning a chunked byte stream into an ordered sequence
/// of [`StepRecord`]s.
///
/// Framing: UTF-8 text split on `\n`; a line starting with `data: ` carries
/// one JSON record, everything else is ignored. Chunks may split lines, JSON
/// payloads, or multi-byte characters at any byte offset — the internal
/// buffer carries the unterminated tail (and any partial code point inside
/// it) over to the next chunk.
///
/// Each stream is single-use: once it reports end-of-stream or a fatal
/// error, the underlying source is dropped and the iterator stays exhausted.
pub struct StepStream<R: Read> {
    source: Option<R>,
    buffer: Vec<u8>,
    ready: VecDeque<StepRecord>,
    issues: Vec<DecodeIssue>,
}

impl<R: Read> StepStream<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: Some(source),
            buffer: Vec::new(),
            ready: VecDeque::new(),
            issues: Vec::new(),
        }
    }

    /// Malformed data lines skipped so far.
    pub fn issues(&self) -> &[DecodeIssue] {
        &self.issues
    }

    /// Drops the source and any unterminated tail. Called on every terminal
    /// path so the underlying connection is released promptly rather than
    /// when the stream value itself is dropped.
    fn release(&mut self) {
        self.source = None;
        self.buffer.clear();
    }

    /// Resolves every complete line currently buffered, keeping the piece
    /// after the last newline as the new buffer content.
    fn drain_lines(&mut self) {
        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return;
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        for line in complete.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            self.decode_line(line);
        }
    }

    fn decode_line(&mut self, line: &[u8]) {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(err) => {
                self.skip(line, &format!("invalid utf-8: {err}"));
                return;
            }
        };
        match serde_json::from_str::<StepRecord>(payload) {
            Ok(record) => self.ready.push_back(record),
            Err(err) => self.skip(line, &format!("invalid step json: {err}")),
        }
    }

    fn skip(&mut self, line: &[u8], reason: &str) {
        self.issues.push(DecodeIssue {
            line: String::from_utf8_lossy(line).into_owned(),
            reason: reason.to_string(),
        });
    }
}

impl<R: Read> Iterator for StepStream<R> {
    type Item = Result<StepRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(Ok(record));
            }
            let source = self.source.as_mut()?;
            let mut chunk = [0u8; READ_CHUNK];
            match source.read(&mut chunk) {
                Ok(0) => {
                    // End of stream: a trailing unterminated line is never data.
                    self.release();
                    return None;
                }
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    self.drain_lines();
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.release();
                    return Some(Err(StreamError::Read(err)));
                }
            }
        }
    }
}
