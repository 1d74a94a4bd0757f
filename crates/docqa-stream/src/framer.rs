//! Newline framing over an arbitrarily chunked byte stream.
//!
//! Bytes are buffered raw and split on `\n`. A newline byte never occurs inside
//! a UTF-8 multi-byte sequence, so a character split across two chunks is
//! reassembled before its line is decoded.

use std::fmt;

use crate::errors::FramingError;

/// One complete line of the stream, without its terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineRecord {
    number: u64,
    text: String,
}

impl LineRecord {
    /// 1-based position of the line in its stream.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for LineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Splits pushed bytes into [`LineRecord`]s, retaining the trailing fragment.
///
/// A framer belongs to exactly one stream. After the first error it yields
/// nothing more.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
    /// Start of the first line not yet emitted.
    start: usize,
    /// Bytes before this index hold no newline.
    scanned: usize,
    lines: u64,
    max_line_bytes: Option<usize>,
    failed: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how many bytes a single line may hold.
    pub fn with_max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_line_bytes = limit;
        self
    }

    /// Appends a chunk and returns the lines it completed, in order.
    ///
    /// Lines not pulled from the iterator stay buffered and are returned by
    /// the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.push(chunk);
        Lines { framer: self }
    }

    /// Appends a chunk without draining lines.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.failed {
            return;
        }
        self.compact();
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<Result<LineRecord, FramingError>> {
        if self.failed {
            return None;
        }
        match self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                let begin = self.start;
                self.start = end + 1;
                self.scanned = self.start;
                self.lines += 1;
                let result = decode(self.lines, &self.buf[begin..end], self.max_line_bytes);
                self.failed = result.is_err();
                Some(result)
            }
            None => {
                self.scanned = self.buf.len();
                let pending = &self.buf[self.start..];
                // A trailing '\r' may still turn out to be half of a CRLF.
                let counted = pending.strip_suffix(b"\r").unwrap_or(pending).len();
                let limit = self.max_line_bytes.filter(|limit| counted > *limit)?;
                self.failed = true;
                Some(Err(FramingError::LineTooLong {
                    line: self.lines + 1,
                    limit,
                }))
            }
        }
    }

    /// Emits the retained fragment at end of stream.
    ///
    /// Whitespace-only fragments are dropped. Call after draining
    /// [`LineFramer::next_line`]; the framer is empty afterwards.
    pub fn flush(&mut self) -> Result<Option<LineRecord>, FramingError> {
        if self.failed {
            return Ok(None);
        }
        let raw = std::mem::take(&mut self.buf);
        let tail = &raw[self.start..];
        self.start = 0;
        self.scanned = 0;
        if tail.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.lines += 1;
        let result = decode(self.lines, tail, self.max_line_bytes);
        self.failed = result.is_err();
        result.map(Some)
    }

    /// Number of bytes waiting for a newline.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Drops emitted lines from the front of the buffer.
    fn compact(&mut self) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }
}

fn decode(number: u64, raw: &[u8], max_line_bytes: Option<usize>) -> Result<LineRecord, FramingError> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if let Some(limit) = max_line_bytes.filter(|limit| raw.len() > *limit) {
        return Err(FramingError::LineTooLong {
            line: number,
            limit,
        });
    }
    match std::str::from_utf8(raw) {
        Ok(text) => Ok(LineRecord {
            number,
            text: text.to_string(),
        }),
        Err(e) => Err(FramingError::InvalidUtf8 {
            line: number,
            reason: e.to_string(),
        }),
    }
}

/// Lines completed by a [`LineFramer::feed`] call.
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = Result<LineRecord, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_line()
    }
}
