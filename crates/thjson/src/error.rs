//! Parse and write errors.

use core::fmt;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// An error raised while parsing or writing THJSON.
///
/// Parse errors carry the 1-based line and column and the byte offset of the
/// offending input. Errors raised by the writer (or by a listener callback)
/// have no source position; their line and column are zero.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    line: u32,
    column: u32,
    offset: usize,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// What went wrong.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The underlying reader failed while the input was being ingested.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The input ended with a delimiter, string, comment, or byte literal
    /// still open.
    #[error("unexpected end of input {0}")]
    UnexpectedEof(&'static str),

    /// A byte that is illegal in the current context.
    #[error("unexpected character {0:?}")]
    UnexpectedByte(char),

    /// An unknown `\x` escape or a truncated `\uXXXX` sequence.
    #[error("malformed escape sequence: {0}")]
    MalformedEscape(String),

    /// A byte literal whose body is not valid Base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A token that is not valid UTF-8.
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] core::str::Utf8Error),

    /// Function-call expansion exceeded
    /// [`MAX_RECURSION`](crate::parser::MAX_RECURSION) levels.
    #[error("maximum function recursion exceeded")]
    RecursionLimit,

    /// Mismatched open/close, or a writer event that does not fit the
    /// currently open container.
    #[error("structure error: {0}")]
    Structure(&'static str),

    /// An error raised by a listener callback.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, line: u32, column: u32, offset: usize) -> Self {
        Self {
            kind,
            line,
            column,
            offset,
        }
    }

    /// An error without a source position, as raised by the writer.
    pub(crate) fn positionless(kind: ErrorKind) -> Self {
        Self::new(kind, 0, 0, 0)
    }

    /// Creates a listener error from any displayable message.
    ///
    /// # Examples
    ///
    /// ```
    /// let err = thjson::Error::custom("unknown class tag");
    /// assert_eq!(err.to_string(), "unknown class tag");
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::positionless(ErrorKind::Custom(msg.to_string()))
    }

    /// What went wrong.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// 1-based line of the offending input, or 0 when positionless.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the offending input, or 0 when positionless.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Byte offset of the offending input.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            self.kind.fmt(f)
        } else {
            write!(f, "{} at {}:{}", self.kind, self.line, self.column)
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::positionless(ErrorKind::Io(err))
    }
}
