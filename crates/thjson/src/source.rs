//! Byte-level input for the THJSON parser.
//!
//! [`ByteSource`] walks a fully available byte buffer, collapsing `\r` and
//! `\r\n` line endings into a single `\n` and keeping 1-based line and column
//! counters as it goes. Columns account for tab expansion with a configurable
//! tab size; the counters always describe the *next* byte to be read.
//!
//! The grammar needs at most three bytes of look-ahead (`'''`, `<<<`, `>>>`,
//! `//`, `/*`), which [`ByteSource::peek`] serves without consuming input.
//! Raw sub-slices of the underlying buffer are available through
//! [`ByteSource::slice`] so tokens that required no rewriting can be handed
//! to listeners without copying.

/// Default tab size used for column accounting.
pub const DEFAULT_TAB_SIZE: u32 = 4;

/// A cursor over THJSON input bytes with line-ending normalization and
/// position tracking.
#[derive(Debug)]
pub struct ByteSource<'src> {
    data: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
    tab_size: u32,
}

impl<'src> ByteSource<'src> {
    /// Creates a source over `data` with the default tab size.
    #[must_use]
    pub fn new(data: &'src [u8]) -> Self {
        Self::with_tab_size(data, DEFAULT_TAB_SIZE)
    }

    /// Creates a source over `data` with the given tab size.
    ///
    /// # Panics
    ///
    /// Panics if `tab_size` is zero.
    #[must_use]
    pub fn with_tab_size(data: &'src [u8], tab_size: u32) -> Self {
        assert!(tab_size >= 1, "tab_size must be >= 1");
        Self {
            data,
            pos: 0,
            line: 1,
            column: 1,
            tab_size,
        }
    }

    /// The 1-based line of the next byte to be read.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The 1-based column of the next byte to be read.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Byte offset into the raw (unnormalized) input of the next byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// The configured tab size, in columns.
    #[must_use]
    pub fn tab_size(&self) -> u32 {
        self.tab_size
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads the next byte, or `None` at end of input.
    ///
    /// `\r\n` sequences collapse into a single `\n`, and a bare `\r` is
    /// delivered as `\n`; callers never observe a carriage return. A newline
    /// increments the line counter and resets the column to 1; a tab advances
    /// the column to the next tab stop; any other byte advances it by one.
    pub fn read(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        if b == b'\r' {
            self.pos += 1;
            if self.data.get(self.pos) == Some(&b'\n') {
                self.pos += 1;
            }
            self.line += 1;
            self.column = 1;
            return Some(b'\n');
        }
        self.pos += 1;
        match b {
            b'\n' => {
                self.line += 1;
                self.column = 1;
            }
            b'\t' => {
                self.column += self.tab_size - self.column % self.tab_size;
            }
            _ => self.column += 1,
        }
        Some(b)
    }

    /// Peeks `n` bytes ahead without consuming anything; `peek(0)` is the
    /// byte the next [`read`](Self::read) would return.
    ///
    /// Peeked bytes see the same line-ending normalization as `read`.
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<u8> {
        let mut i = self.pos;
        let mut remaining = n;
        loop {
            let b = *self.data.get(i)?;
            let (b, width) = if b == b'\r' {
                let width = if self.data.get(i + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                (b'\n', width)
            } else {
                (b, 1)
            };
            if remaining == 0 {
                return Some(b);
            }
            remaining -= 1;
            i += width;
        }
    }

    /// A raw sub-slice of the input, by byte offsets as reported by
    /// [`offset`](Self::offset).
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'src [u8] {
        &self.data[start..end]
    }
}
