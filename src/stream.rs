//! Byte buffer and cursor primitives for incremental parsing.
//!
//! [`ArrayBuffer`] accumulates bytes as they arrive from the transport,
//! bounded by a fixed capacity. [`StreamCursor`] is a read-only positional
//! view over those bytes; parser steps move it forward and use a [`Revert`]
//! guard to fall back to the start of the current section when the input
//! runs out mid-section. [`Token`] captures the half-open span between a
//! saved start position and the current cursor position.

use std::ops::{Deref, DerefMut};

use bytes::BytesMut;

/// Append-only buffer with a hard capacity limit.
pub struct ArrayBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl ArrayBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity }
    }

    /// Appends `bytes`, or returns `false` without appending anything if the
    /// capacity would be exceeded.
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        if self.buf.len() + bytes.len() > self.capacity {
            return false;
        }
        self.buf.extend_from_slice(bytes);
        true
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// A moving read position over a borrowed byte slice.
///
/// Every operation that would move past the end of the input fails without
/// moving the cursor, so a suspended parser step can always resume from a
/// well-defined position.
pub struct StreamCursor<'buf> {
    buf: &'buf [u8],
    pos: usize,
}

impl<'buf> StreamCursor<'buf> {
    pub fn new(buf: &'buf [u8]) -> Self {
        Self::with_position(buf, 0)
    }

    pub fn with_position(buf: &'buf [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// The byte at the current position, if any.
    pub fn current(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Moves forward by `n` bytes; fails (and stays put) if fewer remain.
    pub fn advance(&mut self, n: usize) -> bool {
        if self.remaining() < n {
            return false;
        }
        self.pos += n;
        true
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// True iff the two bytes at the current position are CR, LF.
    pub fn eol(&self) -> bool {
        self.buf[self.pos..].starts_with(b"\r\n")
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// The bytes between `start` and the current position.
    pub fn slice_from(&self, start: usize) -> &'buf [u8] {
        &self.buf[start..self.pos]
    }

    /// The bytes from the current position to the end of the input.
    pub fn tail(&self) -> &'buf [u8] {
        &self.buf[self.pos..]
    }
}

/// Scope guard that restores the cursor position on drop unless committed.
///
/// Parser steps open one of these at entry and commit it only once a whole
/// section has been consumed, which makes suspension transactional: a step
/// that returns for more input leaves the cursor exactly where the section
/// began.
pub struct Revert<'c, 'buf> {
    cursor: &'c mut StreamCursor<'buf>,
    saved: usize,
    committed: bool,
}

impl<'c, 'buf> Revert<'c, 'buf> {
    pub fn new(cursor: &'c mut StreamCursor<'buf>) -> Self {
        let saved = cursor.pos;
        Self { cursor, saved, committed: false }
    }

    /// Keeps the cursor where it is instead of restoring the saved position.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<'buf> Deref for Revert<'_, 'buf> {
    type Target = StreamCursor<'buf>;

    fn deref(&self) -> &Self::Target {
        self.cursor
    }
}

impl DerefMut for Revert<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor
    }
}

impl Drop for Revert<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            self.cursor.pos = self.saved;
        }
    }
}

/// Records a start position and later yields the span read since then.
pub struct Token {
    start: usize,
}

impl Token {
    pub fn new(cursor: &StreamCursor) -> Self {
        Self { start: cursor.position() }
    }

    pub fn raw<'buf>(&self, cursor: &StreamCursor<'buf>) -> &'buf [u8] {
        cursor.slice_from(self.start)
    }

    pub fn text(&self, cursor: &StreamCursor) -> String {
        String::from_utf8_lossy(self.raw(cursor)).into_owned()
    }
}

/// Advances the cursor past `literal` iff the input matches it at the
/// current position.
pub fn match_literal(literal: &[u8], cursor: &mut StreamCursor) -> bool {
    if cursor.remaining() < literal.len() || !cursor.tail().starts_with(literal) {
        return false;
    }
    cursor.pos += literal.len();
    true
}

/// Advances until the current byte is one of `delimiters`, leaving the
/// cursor on the delimiter. Returns `false` if the input ran out first.
pub fn match_until(delimiters: &[u8], cursor: &mut StreamCursor) -> bool {
    loop {
        match cursor.current() {
            None => return false,
            Some(byte) if delimiters.contains(&byte) => return true,
            Some(_) => {
                cursor.pos += 1;
            }
        }
    }
}
