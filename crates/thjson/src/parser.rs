//! The THJSON streaming parser.
//!
//! [`Parser`] drives a [`ByteSource`] to completion, delivering structural
//! events to a [`Listener`] as they are recognized. It is a push-down
//! machine: open containers live on an explicit stack, so deeply nested
//! input cannot overflow the host stack. All lexical decisions are made in
//! parser context: the same bytes lex differently as a key, a member value,
//! or an array element, which is what makes quoteless strings workable.
//!
//! Tokens that needed no rewriting (no escapes, no line-ending collapse, no
//! de-indentation) are delivered as borrowed views over the input buffer;
//! everything else goes through reusable scratch buffers owned by the
//! parser.
//!
//! # Examples
//!
//! ```
//! use thjson::{parse_str, Listener, Result, Scalar};
//!
//! #[derive(Default)]
//! struct Keys(Vec<String>);
//!
//! impl Listener for Keys {
//!     fn property(&mut self, key: &str, _value: Scalar<'_>) -> Result<()> {
//!         self.0.push(key.to_string());
//!         Ok(())
//!     }
//! }
//!
//! let mut keys = Keys::default();
//! parse_str("name: Widget\nprice: 45\n", &mut keys)?;
//! assert_eq!(keys.0, ["name", "price"]);
//! # Ok::<(), thjson::Error>(())
//! ```

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::classify::{classify, Classified};
use crate::error::{Error, ErrorKind, Result};
use crate::escape_buffer::UnicodeEscapeBuffer;
use crate::event::{CommentKind, IntegerKind, Listener, Scalar, StringKind};
use crate::options::ParserOptions;
use crate::source::ByteSource;

/// Allowed levels of function-call nesting.
pub const MAX_RECURSION: u32 = 16;

/// Parses a THJSON document from a string.
pub fn parse_str<L: Listener>(input: &str, listener: &mut L) -> Result<()> {
    Parser::new(input.as_bytes()).parse(listener)
}

/// Parses a THJSON document from a byte buffer.
pub fn parse_slice<L: Listener>(input: &[u8], listener: &mut L) -> Result<()> {
    Parser::new(input).parse(listener)
}

/// Reads `reader` to its end and parses the bytes as a THJSON document.
///
/// The grammar never suspends, so the input is ingested up front; reader
/// failures surface as [`ErrorKind::Io`].
pub fn parse_reader<R: Read, L: Listener>(mut reader: R, listener: &mut L) -> Result<()> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Parser::new(&buf).parse(listener)
}

// ------------------------------------------------------------------------------------------------
// Internal machinery
// ------------------------------------------------------------------------------------------------

/// One open container on the parse stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// `{ … }` without a class tag.
    Map,
    /// `(class) { … }`.
    Object,
    /// `[ … ]` without a class tag.
    Array,
    /// `(class) [ … ]`.
    List,
}

/// Whether a value is being read as an object member or a list element.
/// Quoteless comma handling differs between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueCtx {
    Member,
    Element,
}

/// Where a token's bytes live: a raw input slice, the key scratch buffer, or
/// the value scratch buffer.
#[derive(Debug, Clone, Copy)]
enum Span {
    Src { start: usize, end: usize },
    Key,
    Val,
}

/// Which scratch buffer an owned token is accumulated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Buf {
    Key,
    Val,
}

fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n'
}

fn is_base64_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Structural bytes that end a quoteless value.
fn ends_quoteless_value(b: u8) -> bool {
    matches!(b, b'{' | b'}' | b'[' | b']' | b':' | b'#')
}

/// Bytes that end a bareword key (quoteless keys also stop at whitespace).
fn ends_key(b: u8) -> bool {
    matches!(
        b,
        b',' | b'[' | b']' | b'{' | b'}' | b'(' | b')' | b':' | b'#' | b'\\'
    )
}

/// The THJSON streaming parser.
///
/// A parser instance is single use and not reentrant: one parser drives one
/// byte source to completion. Function-call expansion runs a nested parser
/// over the expansion text, sharing the same listener, bounded by
/// [`MAX_RECURSION`].
#[derive(Debug)]
pub struct Parser<'src> {
    src: ByteSource<'src>,

    /// Open containers; the machine's push-down stack.
    stack: Vec<Frame>,

    /// Scratch for keys that needed escape processing.
    key_buf: Vec<u8>,
    /// Scratch for values: escaped strings, de-indented multiline bodies,
    /// Base64 character runs, comment bodies spanning collapsed line endings.
    val_buf: Vec<u8>,
    /// Decoded Base64 output.
    bytes_buf: Vec<u8>,
    unicode: UnicodeEscapeBuffer,

    /// Function-call nesting level of this parser.
    recursion: u32,

    has_root_brace: bool,
    has_member: bool,
    closed_root_brace: bool,

    /// Position of the token currently being emitted.
    token_line: u32,
    token_column: u32,
}

impl<'src> Parser<'src> {
    /// Creates a parser over `input` with default options.
    #[must_use]
    pub fn new(input: &'src [u8]) -> Self {
        Self::with_options(input, ParserOptions::default())
    }

    /// Creates a parser over `input` with the given options.
    #[must_use]
    pub fn with_options(input: &'src [u8], options: ParserOptions) -> Self {
        Self {
            src: ByteSource::with_tab_size(input, options.tab_size),
            stack: Vec::new(),
            key_buf: Vec::new(),
            val_buf: Vec::new(),
            bytes_buf: Vec::new(),
            unicode: UnicodeEscapeBuffer::new(),
            recursion: 0,
            has_root_brace: false,
            has_member: false,
            closed_root_brace: false,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Parses the whole document, delivering events to `listener`.
    ///
    /// On a malformed document the error names the offending byte with its
    /// line and column; every event recognized before the error has already
    /// been delivered.
    pub fn parse<L: Listener>(mut self, listener: &mut L) -> Result<()> {
        listener.begin()?;
        self.run(listener)?;
        listener.end()?;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Main loop
    // --------------------------------------------------------------------------------------------

    fn run<L: Listener>(&mut self, l: &mut L) -> Result<()> {
        loop {
            self.skip_ws_comments(l, !self.stack.is_empty())?;
            let Some(b) = self.src.peek(0) else {
                return match self.stack.last() {
                    Some(Frame::Map | Frame::Object) => Err(self.err(ErrorKind::UnexpectedEof(
                        "expecting key or closing brace",
                    ))),
                    Some(Frame::Array | Frame::List) => Err(self.err(ErrorKind::UnexpectedEof(
                        "expecting value or closing bracket",
                    ))),
                    None if self.has_root_brace && !self.closed_root_brace => {
                        Err(self.err(ErrorKind::UnexpectedEof("expecting closing root brace")))
                    }
                    None => Ok(()),
                };
            };
            match self.stack.last().copied() {
                None => self.root_item(b, l)?,
                Some(Frame::Map | Frame::Object) => self.object_item(b, l)?,
                Some(Frame::Array | Frame::List) => self.array_item(b, l)?,
            }
        }
    }

    /// One item at root level: the optional root braces, a directive, a
    /// member, or an anonymous child value.
    fn root_item<L: Listener>(&mut self, b: u8, l: &mut L) -> Result<()> {
        if b == b'#' || b == b'@' {
            return self.read_root_directive(l);
        }
        if self.closed_root_brace {
            return Err(self.err(ErrorKind::UnexpectedByte(b as char)));
        }
        match b {
            b'{' if !self.has_root_brace && !self.has_member => {
                self.src.read();
                self.has_root_brace = true;
                Ok(())
            }
            b'{' => {
                self.has_member = true;
                self.mark_token();
                self.open_container(l, None, None, b'{')
            }
            b'}' if self.has_root_brace => {
                self.src.read();
                self.closed_root_brace = true;
                Ok(())
            }
            b'[' => {
                self.has_member = true;
                self.mark_token();
                self.open_container(l, None, None, b'[')
            }
            b'(' => {
                self.has_member = true;
                self.mark_token();
                let class = self.read_paren_class()?;
                let bracket = self.expect_bracket()?;
                self.open_container(l, None, Some(class), bracket)
            }
            b'}' | b']' | b')' | b':' | b',' => {
                Err(self.err(ErrorKind::UnexpectedByte(b as char)))
            }
            _ => {
                // A member key, or the class tag of an anonymous value.
                self.mark_token();
                let key = if b == b'"' {
                    self.read_quoted_string(Buf::Key)?
                } else {
                    self.read_bareword_key()?
                };
                self.skip_inline_space();
                match self.src.peek(0) {
                    Some(bracket @ (b'{' | b'[')) => {
                        self.has_member = true;
                        self.require_class(key)?;
                        self.open_container(l, None, Some(key), bracket)
                    }
                    _ => {
                        self.require_key(key)?;
                        self.expect_colon(l)?;
                        self.has_member = true;
                        let opened = self.read_value(Some(key), ValueCtx::Member, l)?;
                        if !opened {
                            self.after_value(l)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    /// One item inside an object or map: a member or the closing brace.
    fn object_item<L: Listener>(&mut self, b: u8, l: &mut L) -> Result<()> {
        match b {
            b'}' => {
                self.mark_token();
                self.src.read();
                let frame = self.stack.pop().expect("object frame");
                l.position(self.token_line, self.token_column)?;
                match frame {
                    Frame::Object => l.end_object()?,
                    Frame::Map => l.end_map()?,
                    _ => unreachable!(),
                }
                self.after_value(l)
            }
            b']' => Err(self.err(ErrorKind::Structure("']' cannot close an object"))),
            b',' | b':' | b'(' | b')' | b'[' | b'{' => {
                Err(self.err(ErrorKind::UnexpectedByte(b as char)))
            }
            _ => {
                self.mark_token();
                let key = if b == b'"' {
                    self.read_quoted_string(Buf::Key)?
                } else {
                    self.read_bareword_key()?
                };
                self.require_key(key)?;
                self.expect_colon(l)?;
                let opened = self.read_value(Some(key), ValueCtx::Member, l)?;
                if !opened {
                    self.after_value(l)?;
                }
                Ok(())
            }
        }
    }

    /// One item inside an array or list: an element or the closing bracket.
    fn array_item<L: Listener>(&mut self, b: u8, l: &mut L) -> Result<()> {
        match b {
            b']' => {
                self.mark_token();
                self.src.read();
                let frame = self.stack.pop().expect("array frame");
                l.position(self.token_line, self.token_column)?;
                match frame {
                    Frame::List => l.end_list()?,
                    Frame::Array => l.end_array()?,
                    _ => unreachable!(),
                }
                self.after_value(l)
            }
            b'}' => Err(self.err(ErrorKind::Structure("'}' cannot close an array"))),
            b',' | b':' | b')' => Err(self.err(ErrorKind::UnexpectedByte(b as char))),
            _ => {
                let opened = self.read_value(None, ValueCtx::Element, l)?;
                if !opened {
                    self.after_value(l)?;
                }
                Ok(())
            }
        }
    }

    // --------------------------------------------------------------------------------------------
    // Values
    // --------------------------------------------------------------------------------------------

    /// Reads one value in member or element position. Returns `true` when the
    /// value opened a container (whose body the main loop will drive).
    fn read_value<L: Listener>(
        &mut self,
        key: Option<Span>,
        ctx: ValueCtx,
        l: &mut L,
    ) -> Result<bool> {
        // Comments may sit between a colon and its value; `#` is not a
        // comment here because a hash in value position is a function call.
        self.skip_ws_comments(l, false)?;
        self.mark_token();
        let Some(b) = self.src.peek(0) else {
            // End of input in value position is null inside a function-call
            // expansion, and an error in the outermost document.
            if self.recursion > 0 {
                self.emit_null(key, l)?;
                return Ok(false);
            }
            return Err(self.err(ErrorKind::UnexpectedEof("expecting value")));
        };
        match b {
            b'"' => {
                let span = self.read_quoted_string(Buf::Val)?;
                self.skip_inline_space();
                match self.src.peek(0) {
                    Some(bracket @ (b'{' | b'[')) => {
                        self.require_class(span)?;
                        self.open_container(l, key, Some(span), bracket)?;
                        Ok(true)
                    }
                    _ => {
                        self.emit_str(key, span, StringKind::SingleLine, l)?;
                        Ok(false)
                    }
                }
            }
            b'\'' if self.src.peek(1) == Some(b'\'') && self.src.peek(2) == Some(b'\'') => {
                self.read_multiline_string()?;
                self.emit_str(key, Span::Val, StringKind::MultiLine, l)?;
                Ok(false)
            }
            b'`' => {
                self.read_quoted_bytes()?;
                self.emit_bytes(key, StringKind::SingleLine, l)?;
                Ok(false)
            }
            b'<' if self.src.peek(1) == Some(b'<') && self.src.peek(2) == Some(b'<') => {
                self.read_multiline_bytes()?;
                self.emit_bytes(key, StringKind::MultiLine, l)?;
                Ok(false)
            }
            b'{' | b'[' => {
                self.open_container(l, key, None, b)?;
                Ok(true)
            }
            b'(' => {
                let class = self.read_paren_class()?;
                let bracket = self.expect_bracket()?;
                self.open_container(l, key, Some(class), bracket)?;
                Ok(true)
            }
            b'@' | b'#' => {
                self.expand_function(key, ctx, l)?;
                Ok(false)
            }
            b'}' | b']' | b')' | b':' | b',' => {
                Err(self.err(ErrorKind::UnexpectedByte(b as char)))
            }
            _ => {
                let (span, eol) = self.read_quoteless(ctx)?;
                if !eol {
                    if let Some(bracket @ (b'{' | b'[')) = self.src.peek(0) {
                        self.require_class(span)?;
                        self.open_container(l, key, Some(span), bracket)?;
                        return Ok(true);
                    }
                }
                self.emit_quoteless(key, span, l)?;
                Ok(false)
            }
        }
    }

    /// Consumes `{` or `[`, pushes the matching frame, and emits the
    /// matching begin event for the key/class combination.
    fn open_container<L: Listener>(
        &mut self,
        l: &mut L,
        key: Option<Span>,
        class: Option<Span>,
        bracket: u8,
    ) -> Result<()> {
        self.src.read();
        let frame = match (bracket, class.is_some()) {
            (b'{', true) => Frame::Object,
            (b'{', false) => Frame::Map,
            (b'[', true) => Frame::List,
            (b'[', false) => Frame::Array,
            _ => unreachable!(),
        };
        l.position(self.token_line, self.token_column)?;
        match (frame, key) {
            (Frame::Object, Some(key)) => {
                let key = self.text(key)?;
                let class = self.text(class.expect("object class"))?;
                l.begin_object(key, class)?;
            }
            (Frame::Object, None) => {
                let class = self.text(class.expect("object class"))?;
                l.begin_object_value(class)?;
            }
            (Frame::Map, Some(key)) => l.begin_map(self.text(key)?)?,
            (Frame::Map, None) => l.begin_map_value()?,
            (Frame::List, Some(key)) => {
                let key = self.text(key)?;
                let class = self.text(class.expect("list class"))?;
                l.begin_list(key, class)?;
            }
            (Frame::List, None) => {
                let class = self.text(class.expect("list class"))?;
                l.begin_list_value(class)?;
            }
            (Frame::Array, Some(key)) => l.begin_array(self.text(key)?)?,
            (Frame::Array, None) => l.begin_array_value()?,
        }
        self.stack.push(frame);
        Ok(())
    }

    /// A class tag must be non-empty.
    fn require_class(&self, span: Span) -> Result<()> {
        if self.bytes_of(span).is_empty() {
            return Err(self.err(ErrorKind::Structure("empty class tag")));
        }
        Ok(())
    }

    /// A key must be non-empty; only a quoted key can fail this.
    fn require_key(&self, span: Span) -> Result<()> {
        if self.bytes_of(span).is_empty() {
            return Err(self.err(ErrorKind::Structure("empty key")));
        }
        Ok(())
    }

    /// Reads `( ident-or-quoted )` and returns the class span.
    fn read_paren_class(&mut self) -> Result<Span> {
        self.src.read(); // '('
        self.skip_inline_space();
        let span = if self.src.peek(0) == Some(b'"') {
            self.read_quoted_string(Buf::Val)?
        } else {
            let start = self.src.offset();
            while let Some(b) = self.src.peek(0) {
                if is_ws(b) || ends_key(b) {
                    break;
                }
                self.src.read();
            }
            let end = self.trim_back(start, self.src.offset());
            Span::Src { start, end }
        };
        self.require_class(span)?;
        self.skip_inline_space();
        match self.src.peek(0) {
            Some(b')') => {
                self.src.read();
                Ok(span)
            }
            Some(b) => Err(self.err(ErrorKind::UnexpectedByte(b as char))),
            None => Err(self.err(ErrorKind::UnexpectedEof("expecting ')'"))),
        }
    }

    /// After a parenthesized class tag: whitespace, then `{` or `[`.
    fn expect_bracket(&mut self) -> Result<u8> {
        while let Some(b) = self.src.peek(0) {
            if is_ws(b) {
                self.src.read();
            } else {
                break;
            }
        }
        match self.src.peek(0) {
            Some(b @ (b'{' | b'[')) => Ok(b),
            Some(b) => Err(self.err(ErrorKind::UnexpectedByte(b as char))),
            None => Err(self.err(ErrorKind::UnexpectedEof("expecting '{' or '['"))),
        }
    }

    /// Function-call expansion: read the call text, ask the listener for a
    /// replacement, and parse the replacement in this value position.
    fn expand_function<L: Listener>(
        &mut self,
        key: Option<Span>,
        ctx: ValueCtx,
        l: &mut L,
    ) -> Result<()> {
        self.src.read(); // '@' or '#'
        let span = self.read_directive_text()?;
        let text = self.text(span)?.to_string();
        let replacement = l.function(&text)?;
        if self.recursion + 1 >= MAX_RECURSION {
            return Err(self.err(ErrorKind::RecursionLimit));
        }
        let mut child = Parser {
            src: ByteSource::with_tab_size(replacement.as_bytes(), self.src.tab_size()),
            stack: Vec::new(),
            key_buf: match key {
                Some(span) => self.bytes_of(span).to_vec(),
                None => Vec::new(),
            },
            val_buf: Vec::new(),
            bytes_buf: Vec::new(),
            unicode: UnicodeEscapeBuffer::new(),
            recursion: self.recursion + 1,
            has_root_brace: false,
            has_member: false,
            closed_root_brace: false,
            token_line: 1,
            token_column: 1,
        };
        let key = key.map(|_| Span::Key);
        child.parse_value_document(key, ctx, l)
    }

    /// Parses the expansion text as a single value (possibly a container with
    /// a full body). Text after the value is ignored, matching the original.
    fn parse_value_document<L: Listener>(
        &mut self,
        key: Option<Span>,
        ctx: ValueCtx,
        l: &mut L,
    ) -> Result<()> {
        self.read_value(key, ctx, l)?;
        while !self.stack.is_empty() {
            self.skip_ws_comments(l, true)?;
            let Some(b) = self.src.peek(0) else {
                return Err(match self.stack.last() {
                    Some(Frame::Map | Frame::Object) => {
                        self.err(ErrorKind::UnexpectedEof("expecting key or closing brace"))
                    }
                    _ => self.err(ErrorKind::UnexpectedEof("expecting value or closing bracket")),
                });
            };
            match self.stack.last().copied() {
                Some(Frame::Map | Frame::Object) => self.object_item(b, l)?,
                _ => self.array_item(b, l)?,
            }
        }
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Lexing
    // --------------------------------------------------------------------------------------------

    /// Skips whitespace, emitting comment events along the way. `#` starts a
    /// comment only when `hash_comments` is set; at root it is a directive
    /// and in value position a function call.
    fn skip_ws_comments<L: Listener>(&mut self, l: &mut L, hash_comments: bool) -> Result<()> {
        loop {
            match self.src.peek(0) {
                Some(b) if is_ws(b) => {
                    self.src.read();
                }
                Some(b'/') if self.src.peek(1) == Some(b'/') => {
                    self.src.read();
                    self.src.read();
                    let span = self.read_line_comment();
                    l.comment(self.text(span)?, CommentKind::SlashSlash)?;
                }
                Some(b'/') if self.src.peek(1) == Some(b'*') => {
                    let span = self.read_block_comment()?;
                    l.comment(self.text(span)?, CommentKind::Block)?;
                }
                Some(b'#') if hash_comments => {
                    self.src.read();
                    let span = self.read_line_comment();
                    l.comment(self.text(span)?, CommentKind::Hash)?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Skips spaces and tabs only; never crosses a newline.
    fn skip_inline_space(&mut self) {
        while matches!(self.src.peek(0), Some(b' ' | b'\t')) {
            self.src.read();
        }
    }

    /// After a value or a container close: comments, then at most one comma.
    fn after_value<L: Listener>(&mut self, l: &mut L) -> Result<()> {
        self.skip_ws_comments(l, !self.stack.is_empty())?;
        if self.src.peek(0) == Some(b',') {
            self.src.read();
        }
        Ok(())
    }

    fn expect_colon<L: Listener>(&mut self, l: &mut L) -> Result<()> {
        self.skip_ws_comments(l, true)?;
        match self.src.peek(0) {
            Some(b':') => {
                self.src.read();
                Ok(())
            }
            Some(b) => Err(self.err(ErrorKind::UnexpectedByte(b as char))),
            None => Err(self.err(ErrorKind::UnexpectedEof("expecting ':'"))),
        }
    }

    /// A bareword key: bytes up to whitespace, a structural delimiter, or a
    /// comment opener. Must be non-empty.
    fn read_bareword_key(&mut self) -> Result<Span> {
        let start = self.src.offset();
        while let Some(b) = self.src.peek(0) {
            if is_ws(b) || ends_key(b) {
                break;
            }
            if b == b'/' && matches!(self.src.peek(1), Some(b'/' | b'*')) {
                break;
            }
            self.src.read();
        }
        let end = self.src.offset();
        if start == end {
            return match self.src.peek(0) {
                Some(b) => Err(self.err(ErrorKind::UnexpectedByte(b as char))),
                None => Err(self.err(ErrorKind::UnexpectedEof("expecting key"))),
            };
        }
        Ok(Span::Src { start, end })
    }

    /// A quoted string. Borrows the input until the first escape, then
    /// switches to the scratch buffer and copies the prefix.
    fn read_quoted_string(&mut self, dst: Buf) -> Result<Span> {
        let open = self.position_now();
        self.src.read(); // '"'
        let start = self.src.offset();
        let mut owned = false;
        self.buf_mut(dst).clear();
        loop {
            let Some(b) = self.src.peek(0) else {
                return Err(self.err_at(open, ErrorKind::UnexpectedEof("reading quoted string")));
            };
            match b {
                b'"' => {
                    let end = self.src.offset();
                    self.src.read();
                    return Ok(if owned {
                        Span::from(dst)
                    } else {
                        Span::Src { start, end }
                    });
                }
                b'\n' => return Err(self.err(ErrorKind::UnexpectedByte('\n'))),
                b'\\' => {
                    if !owned {
                        let prefix = self.src.offset();
                        let (from, to) = (start, prefix);
                        let slice = self.src.slice(from, to).to_vec();
                        self.buf_mut(dst).extend_from_slice(&slice);
                        owned = true;
                    }
                    self.src.read();
                    self.read_escape(dst)?;
                }
                _ => {
                    self.src.read();
                    if owned {
                        self.buf_mut(dst).push(b);
                    }
                }
            }
        }
    }

    /// One escape sequence, after the backslash. Decoded text lands in `dst`.
    fn read_escape(&mut self, dst: Buf) -> Result<()> {
        let Some(b) = self.src.read() else {
            return Err(self.err(ErrorKind::UnexpectedEof("reading escape")));
        };
        let ch = match b {
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'b' => '\u{0008}',
            b'f' => '\u{000C}',
            b'"' => '"',
            b'\'' => '\'',
            b'\\' => '\\',
            b'/' => '/',
            b'u' => {
                self.unicode.reset();
                loop {
                    let Some(d) = self.src.read() else {
                        return Err(self.err(ErrorKind::UnexpectedEof("reading unicode escape")));
                    };
                    match self.unicode.feed(d) {
                        Ok(Some(ch)) => break ch,
                        Ok(None) => {}
                        Err(msg) => return Err(self.err(ErrorKind::MalformedEscape(msg))),
                    }
                }
            }
            other => {
                return Err(self.err(ErrorKind::MalformedEscape(format!("\\{}", other as char))));
            }
        };
        self.push_char(dst, ch);
        Ok(())
    }

    fn push_char(&mut self, dst: Buf, ch: char) {
        let mut utf8 = [0u8; 4];
        let encoded = ch.encode_utf8(&mut utf8);
        self.buf_mut(dst).extend_from_slice(encoded.as_bytes());
    }

    /// A `'''`-delimited string with column-aligned de-indentation.
    ///
    /// The alignment column is where the opening quotes sit. On the first
    /// line, leading whitespace is discarded; a whitespace-only first line is
    /// discarded including its newline. On continuation lines, whitespace at
    /// or before the alignment column is discarded; everything past it (and
    /// any non-whitespace byte) is kept. The trailing whitespace run up to
    /// and including its newline is stripped before the closing quotes.
    fn read_multiline_string(&mut self) -> Result<()> {
        let open = self.position_now();
        let align = self.src.column();
        let row = self.src.line();
        self.src.read();
        self.src.read();
        self.src.read();
        self.val_buf.clear();
        loop {
            if self.src.peek(0) == Some(b'\'')
                && self.src.peek(1) == Some(b'\'')
                && self.src.peek(2) == Some(b'\'')
            {
                self.src.read();
                self.src.read();
                self.src.read();
                break;
            }
            let line = self.src.line();
            let col = self.src.column();
            let Some(b) = self.src.read() else {
                return Err(self.err_at(
                    open,
                    ErrorKind::UnexpectedEof("reading triple-quoted string"),
                ));
            };
            if b == b'\\' {
                self.read_escape(Buf::Val)?;
                continue;
            }
            if self.val_buf.is_empty() && is_ws(b) && line == row {
                // Leading whitespace of the first line, or the newline of a
                // whitespace-only first line.
                continue;
            }
            if col > align || !is_ws(b) {
                self.val_buf.push(b);
            }
        }
        self.trim_multiline_tail();
        Ok(())
    }

    /// Strips trailing whitespace up to and including the final newline, but
    /// only when that newline exists.
    fn trim_multiline_tail(&mut self) {
        for i in (0..self.val_buf.len()).rev() {
            let b = self.val_buf[i];
            if !is_ws(b) {
                return;
            }
            if b == b'\n' {
                self.val_buf.truncate(i);
                return;
            }
        }
    }

    /// Backtick-delimited Base64, decoded into `bytes_buf`.
    fn read_quoted_bytes(&mut self) -> Result<()> {
        let open = self.position_now();
        self.src.read(); // '`'
        self.val_buf.clear();
        loop {
            let Some(b) = self.src.peek(0) else {
                return Err(self.err_at(open, ErrorKind::UnexpectedEof("reading quoted bytes")));
            };
            match b {
                b'`' => {
                    self.src.read();
                    break;
                }
                b'\n' => return Err(self.err(ErrorKind::UnexpectedByte('\n'))),
                b' ' | b'\t' => {
                    self.src.read();
                }
                b if is_base64_char(b) => {
                    self.src.read();
                    self.val_buf.push(b);
                }
                b => return Err(self.err(ErrorKind::UnexpectedByte(b as char))),
            }
        }
        self.decode_base64(open)
    }

    /// `<<< … >>>`: Base64 over multiple lines, aligned like a triple-quoted
    /// string, whitespace between Base64 characters ignored.
    fn read_multiline_bytes(&mut self) -> Result<()> {
        let open = self.position_now();
        let align = self.src.column();
        let row = self.src.line();
        self.src.read();
        self.src.read();
        self.src.read();
        self.val_buf.clear();
        loop {
            if self.src.peek(0) == Some(b'>')
                && self.src.peek(1) == Some(b'>')
                && self.src.peek(2) == Some(b'>')
            {
                self.src.read();
                self.src.read();
                self.src.read();
                break;
            }
            let line = self.src.line();
            let col = self.src.column();
            let Some(b) = self.src.read() else {
                return Err(self.err_at(open, ErrorKind::UnexpectedEof("reading multiline bytes")));
            };
            if self.val_buf.is_empty() && is_ws(b) && line == row {
                continue;
            }
            if col > align || !is_ws(b) {
                if is_base64_char(b) {
                    self.val_buf.push(b);
                } else if !is_ws(b) {
                    return Err(self.err(ErrorKind::UnexpectedByte(b as char)));
                }
            }
        }
        self.decode_base64(open)
    }

    fn decode_base64(&mut self, open: (u32, u32, usize)) -> Result<()> {
        self.bytes_buf.clear();
        BASE64
            .decode_vec(&self.val_buf, &mut self.bytes_buf)
            .map_err(|e| self.err_at(open, ErrorKind::Base64(e)))
    }

    /// A quoteless value. Whitespace is kept (and trimmed from the tail);
    /// structural bytes, comments, and line ends terminate. In element
    /// position a comma always terminates; in member position it terminates
    /// only after a literal prefix or a whitespace run, otherwise it is part
    /// of the text. Returns the trimmed span and whether the value ran to
    /// end of line or input.
    fn read_quoteless(&mut self, ctx: ValueCtx) -> Result<(Span, bool)> {
        let start = self.src.offset();
        let mut last_was_space = false;
        let eol = loop {
            let Some(b) = self.src.peek(0) else { break true };
            if b == b'\n' {
                break true;
            }
            if b == b' ' || b == b'\t' {
                self.src.read();
                last_was_space = true;
                continue;
            }
            if ends_quoteless_value(b) {
                break false;
            }
            if b == b'/' && matches!(self.src.peek(1), Some(b'/' | b'*')) {
                break false;
            }
            if b == b',' {
                let end = self.trim_back(start, self.src.offset());
                let literal = !matches!(classify(self.src.slice(start, end)), Classified::Str);
                if ctx == ValueCtx::Element || literal || last_was_space {
                    break false;
                }
            }
            self.src.read();
            last_was_space = false;
        };
        let mut end = self.trim_back(start, self.src.offset());
        // One trailing comma (a glued separator) is stripped.
        if end > start && self.src.slice(start, end)[end - start - 1] == b',' {
            end = self.trim_back(start, end - 1);
        }
        Ok((Span::Src { start, end }, eol))
    }

    /// Directive and function-call text: up to a line end, a comment opener,
    /// or a structural delimiter, trimmed. A quoted body (`#"…"`) carries
    /// text that would otherwise terminate it.
    fn read_directive_text(&mut self) -> Result<Span> {
        if self.src.peek(0) == Some(b'"') {
            return self.read_quoted_string(Buf::Val);
        }
        let start = self.src.offset();
        while let Some(b) = self.src.peek(0) {
            if matches!(b, b'\n' | b'#' | b',' | b':' | b'{' | b'}' | b'[' | b']') {
                break;
            }
            if b == b'/' && matches!(self.src.peek(1), Some(b'/' | b'*')) {
                break;
            }
            self.src.read();
        }
        let mut s = start;
        let mut e = self.src.offset();
        while s < e && is_ws(self.src.slice(s, s + 1)[0]) {
            s += 1;
        }
        e = self.trim_back(s, e);
        Ok(Span::Src { start: s, end: e })
    }

    fn read_root_directive<L: Listener>(&mut self, l: &mut L) -> Result<()> {
        self.mark_token();
        self.src.read(); // '#' or '@'
        let span = self.read_directive_text()?;
        l.directive(self.text(span)?)
    }

    /// A `//` or `#` comment body: to end of line, newline consumed.
    fn read_line_comment(&mut self) -> Span {
        let start = self.src.offset();
        let mut end = start;
        while let Some(b) = self.src.peek(0) {
            if b == b'\n' {
                self.src.read();
                break;
            }
            self.src.read();
            end = self.src.offset();
        }
        Span::Src { start, end }
    }

    /// A `/* … */` comment body. Borrowed unless a line ending had to be
    /// collapsed, in which case the normalized body is accumulated in
    /// scratch.
    fn read_block_comment(&mut self) -> Result<Span> {
        let open = self.position_now();
        self.src.read(); // '/'
        self.src.read(); // '*'
        let start = self.src.offset();
        let mut owned = false;
        self.val_buf.clear();
        loop {
            if self.src.peek(0) == Some(b'*') && self.src.peek(1) == Some(b'/') {
                let end = self.src.offset();
                self.src.read();
                self.src.read();
                return Ok(if owned {
                    Span::Val
                } else {
                    Span::Src { start, end }
                });
            }
            let before = self.src.offset();
            let Some(b) = self.src.read() else {
                return Err(self.err_at(open, ErrorKind::UnexpectedEof("reading block comment")));
            };
            let raw = self.src.slice(before, before + 1)[0];
            if !owned && (raw != b || self.src.offset() != before + 1) {
                let prefix = self.src.slice(start, before).to_vec();
                self.val_buf.extend_from_slice(&prefix);
                owned = true;
            }
            if owned {
                self.val_buf.push(b);
            }
        }
    }

    // --------------------------------------------------------------------------------------------
    // Emission
    // --------------------------------------------------------------------------------------------

    /// Classifies a quoteless span, converts it, and emits the property or
    /// value event. Conversion failure demotes the span to a string.
    fn emit_quoteless<L: Listener>(
        &mut self,
        key: Option<Span>,
        span: Span,
        l: &mut L,
    ) -> Result<()> {
        let scalar = match classify(self.bytes_of(span)) {
            Classified::Null => return self.emit_null(key, l),
            Classified::Boolean => Some(Scalar::Bool(self.bytes_of(span) == b"true".as_slice())),
            Classified::Integer(kind) => self.convert_integer(span, kind)?,
            Classified::Float => self.text(span)?.parse::<f32>().ok().map(Scalar::Float),
            Classified::Str => None,
        };
        let scalar = match scalar {
            Some(scalar) => scalar,
            // Demoted: emit the original text as a string.
            None => Scalar::Str(self.text(span)?, StringKind::SingleLine),
        };
        l.position(self.token_line, self.token_column)?;
        match key {
            Some(key) => l.property(self.text(key)?, scalar),
            None => l.value(scalar),
        }
    }

    /// Integer conversion per sub-kind; `None` when the span does not fit a
    /// 32-bit word after all.
    fn convert_integer(&self, span: Span, kind: IntegerKind) -> Result<Option<Scalar<'_>>> {
        let text = self.text(span)?;
        let value = match kind {
            IntegerKind::Plain | IntegerKind::Signed => text.parse::<i32>().ok(),
            IntegerKind::Hex => u32::from_str_radix(&text[2..], 16).ok().map(|v| v as i32),
            IntegerKind::Binary => u32::from_str_radix(&text[1..], 2).ok().map(|v| v as i32),
        };
        Ok(value.map(|v| Scalar::Int(v, kind)))
    }

    fn emit_null<L: Listener>(&mut self, key: Option<Span>, l: &mut L) -> Result<()> {
        l.position(self.token_line, self.token_column)?;
        match key {
            Some(key) => l.null_property(self.text(key)?),
            None => l.null_value(),
        }
    }

    fn emit_str<L: Listener>(
        &mut self,
        key: Option<Span>,
        span: Span,
        kind: StringKind,
        l: &mut L,
    ) -> Result<()> {
        l.position(self.token_line, self.token_column)?;
        let text = self.text(span)?;
        match key {
            Some(key) => l.property(self.text(key)?, Scalar::Str(text, kind)),
            None => l.value(Scalar::Str(text, kind)),
        }
    }

    fn emit_bytes<L: Listener>(
        &mut self,
        key: Option<Span>,
        kind: StringKind,
        l: &mut L,
    ) -> Result<()> {
        l.position(self.token_line, self.token_column)?;
        let bytes = self.bytes_buf.as_slice();
        match key {
            Some(key) => l.property(self.text(key)?, Scalar::Bytes(bytes, kind)),
            None => l.value(Scalar::Bytes(bytes, kind)),
        }
    }

    // --------------------------------------------------------------------------------------------
    // Small helpers
    // --------------------------------------------------------------------------------------------

    fn buf_mut(&mut self, which: Buf) -> &mut Vec<u8> {
        match which {
            Buf::Key => &mut self.key_buf,
            Buf::Val => &mut self.val_buf,
        }
    }

    fn bytes_of(&self, span: Span) -> &[u8] {
        match span {
            Span::Src { start, end } => self.src.slice(start, end),
            Span::Key => &self.key_buf,
            Span::Val => &self.val_buf,
        }
    }

    fn text(&self, span: Span) -> Result<&str> {
        core::str::from_utf8(self.bytes_of(span))
            .map_err(|e| Error::new(ErrorKind::Utf8(e), self.token_line, self.token_column, 0))
    }

    /// Raw-slice end with trailing whitespace removed.
    fn trim_back(&self, start: usize, mut end: usize) -> usize {
        while end > start && is_ws(self.src.slice(end - 1, end)[0]) {
            end -= 1;
        }
        end
    }

    /// Notes the position of the token about to be read.
    fn mark_token(&mut self) {
        self.token_line = self.src.line();
        self.token_column = self.src.column();
    }

    fn position_now(&self) -> (u32, u32, usize) {
        (self.src.line(), self.src.column(), self.src.offset())
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(kind, self.src.line(), self.src.column(), self.src.offset())
    }

    fn err_at(&self, at: (u32, u32, usize), kind: ErrorKind) -> Error {
        Error::new(kind, at.0, at.1, at.2)
    }
}

impl From<Buf> for Span {
    fn from(buf: Buf) -> Self {
        match buf {
            Buf::Key => Span::Key,
            Buf::Val => Span::Val,
        }
    }
}
