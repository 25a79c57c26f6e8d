//! The THJSON writer: the parser's dual.
//!
//! [`Writer`] exposes the same event vocabulary as [`Listener`] (and
//! implements the trait, so a parse can be piped straight into it) and
//! produces syntactically valid, pretty-printed THJSON. Each emitted string
//! is classified to pick between bareword, quoted, and triple-quoted forms;
//! containers lay out either expanded (one item per line) or compact (one
//! line, `, `-separated), governed by a per-container hint.
//!
//! # Examples
//!
//! ```
//! use thjson::{IntegerKind, Scalar, StringKind, Writer};
//!
//! let mut w = Writer::new();
//! w.set_output_header(false);
//! w.begin()?;
//! w.begin_object("left_hand", "sword")?;
//! w.property("damage", Scalar::Int(3, IntegerKind::Plain))?;
//! w.property("weight", Scalar::Str("1kg", StringKind::SingleLine))?;
//! w.end_object()?;
//! w.end()?;
//! assert_eq!(
//!     w.into_string(),
//!     "left_hand: (sword) {\n    damage: 3\n    weight: 1kg\n}\n"
//! );
//! # Ok::<(), thjson::Error>(())
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::classify::{classify, Classified};
use crate::error::{Error, ErrorKind, Result};
use crate::event::{CommentKind, IntegerKind, Listener, Scalar, StringKind};

/// Base64 output longer than this wraps into a `<<< … >>>` block line width.
const BASE64_WRAP_COLUMNS: usize = 64;

/// Suggests a string form for adapters that have no kind information of
/// their own: multi-line when the text has more than one newline and either
/// a line longer than ten characters or, past four newlines, a total length
/// over eighty; single-line otherwise.
#[must_use]
pub fn suggested_string_kind(s: &str) -> StringKind {
    let mut newlines = 0usize;
    let mut max_line = 0usize;
    let mut line = 0usize;
    for c in s.chars() {
        if c == '\n' {
            newlines += 1;
            max_line = max_line.max(line);
            line = 0;
        } else {
            line += 1;
        }
    }
    max_line = max_line.max(line);
    if (newlines > 1 && max_line > 10) || (newlines > 4 && s.len() > 80) {
        StringKind::MultiLine
    } else {
        StringKind::SingleLine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Map,
    Object,
    Array,
    List,
}

#[derive(Debug)]
struct Open {
    kind: Container,
    /// Layout mode of the enclosing scope, restored on close.
    prev_compact: bool,
}

/// Writes THJSON text into an in-memory string.
///
/// The writer checks structure as it goes: an `end_*` that does not match
/// the open container, a property inside an array, or a value at root all
/// report [`ErrorKind::Structure`].
#[derive(Debug)]
pub struct Writer {
    out: String,
    use_tabs: bool,
    tab_size: usize,
    root_braces: bool,
    output_header: bool,
    root_gap: bool,
    /// Effective layout mode of the current scope.
    compact: bool,
    /// Mode requested for containers opened next; see [`set_compact`].
    ///
    /// [`set_compact`]: Writer::set_compact
    compact_hint: bool,
    level: usize,
    stack: Vec<Open>,
    last_was_property: bool,
    need_comma: bool,
    /// A completed root-level item precedes the cursor, so a blank line may
    /// separate it from the next one.
    gap_armed: bool,
    begun: bool,
    ended: bool,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a writer with the default configuration: spaces with a tab
    /// size of 4, no root braces, `#thjson` header on, gaps between root
    /// members, expanded layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::new(),
            use_tabs: false,
            tab_size: 4,
            root_braces: false,
            output_header: true,
            root_gap: true,
            compact: false,
            compact_hint: false,
            level: 0,
            stack: Vec::new(),
            last_was_property: false,
            need_comma: false,
            gap_armed: false,
            begun: false,
            ended: false,
        }
    }

    /// Indent with tabs instead of spaces.
    pub fn set_use_tabs(&mut self, use_tabs: bool) {
        self.use_tabs = use_tabs;
    }

    /// Columns per indent level when indenting with spaces.
    pub fn set_tab_size(&mut self, tab_size: usize) {
        self.tab_size = tab_size;
    }

    /// Wrap the whole document in `{ … }`.
    pub fn set_root_braces(&mut self, root_braces: bool) {
        self.root_braces = root_braces;
    }

    /// Prepend `#thjson` in expanded mode.
    pub fn set_output_header(&mut self, output_header: bool) {
        self.output_header = output_header;
    }

    /// Blank lines between root-level members.
    pub fn set_root_gap(&mut self, root_gap: bool) {
        self.root_gap = root_gap;
    }

    /// Layout hint for containers opened from now on (and, when set before
    /// [`begin`], for the document itself). A container inside a compact
    /// scope is always compact. Compact output suppresses comments.
    ///
    /// [`begin`]: Writer::begin
    pub fn set_compact(&mut self, compact: bool) {
        self.compact_hint = compact;
    }

    /// The text produced so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consumes the writer, returning the produced text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }

    // --------------------------------------------------------------------------------------------
    // Document frame
    // --------------------------------------------------------------------------------------------

    /// Starts the document.
    pub fn begin(&mut self) -> Result<()> {
        if self.begun {
            return Err(structure("begin called twice"));
        }
        self.begun = true;
        self.compact = self.compact_hint;
        if self.output_header && !self.compact {
            self.out.push_str("#thjson\n");
            self.gap_armed = true;
        }
        if self.root_braces {
            self.out.push('{');
            if !self.compact {
                self.out.push('\n');
            }
            self.level += 1;
        }
        self.need_comma = false;
        Ok(())
    }

    /// Ends the document.
    pub fn end(&mut self) -> Result<()> {
        if !self.begun || self.ended {
            return Err(structure("end without begin"));
        }
        if !self.stack.is_empty() {
            return Err(structure("end with open containers"));
        }
        self.ended = true;
        if self.root_braces {
            self.level -= 1;
            self.out.push('}');
            self.out.push('\n');
        }
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Containers
    // --------------------------------------------------------------------------------------------

    /// Opens `key: { … }`.
    pub fn begin_map(&mut self, key: &str) -> Result<()> {
        self.require_member_scope("begin_map")?;
        self.require_key(key)?;
        self.gap_before_object();
        self.output_key(key);
        self.open(Container::Map, "{")
    }

    /// Opens an anonymous `{ … }` inside a list or at root.
    pub fn begin_map_value(&mut self) -> Result<()> {
        self.require_element_scope("begin_map_value")?;
        self.gap_before_object();
        self.indent();
        self.open(Container::Map, "{")
    }

    /// Closes an untagged object.
    pub fn end_map(&mut self) -> Result<()> {
        self.close(Container::Map, "end_map", '}')
    }

    /// Opens `key: (class) { … }`.
    pub fn begin_object(&mut self, key: &str, class: &str) -> Result<()> {
        self.require_member_scope("begin_object")?;
        self.require_key(key)?;
        self.gap_before_object();
        self.output_key(key);
        self.output_class(class);
        self.open(Container::Object, "{")
    }

    /// Opens an anonymous `(class) { … }` inside a list or at root.
    pub fn begin_object_value(&mut self, class: &str) -> Result<()> {
        self.require_element_scope("begin_object_value")?;
        self.gap_before_object();
        self.indent();
        self.output_class(class);
        self.open(Container::Object, "{")
    }

    /// Closes a class-tagged object.
    pub fn end_object(&mut self) -> Result<()> {
        self.close(Container::Object, "end_object", '}')
    }

    /// Opens `key: [ … ]`.
    pub fn begin_array(&mut self, key: &str) -> Result<()> {
        self.require_member_scope("begin_array")?;
        self.require_key(key)?;
        self.gap_before_object();
        self.output_key(key);
        self.open(Container::Array, "[")
    }

    /// Opens an anonymous `[ … ]` inside a list or at root.
    pub fn begin_array_value(&mut self) -> Result<()> {
        self.require_element_scope("begin_array_value")?;
        self.gap_before_object();
        self.indent();
        self.open(Container::Array, "[")
    }

    /// Closes an untagged array.
    pub fn end_array(&mut self) -> Result<()> {
        self.close(Container::Array, "end_array", ']')
    }

    /// Opens `key: (class) [ … ]`.
    pub fn begin_list(&mut self, key: &str, class: &str) -> Result<()> {
        self.require_member_scope("begin_list")?;
        self.require_key(key)?;
        self.gap_before_object();
        self.output_key(key);
        self.output_class(class);
        self.open(Container::List, "[")
    }

    /// Opens an anonymous `(class) [ … ]` inside a list or at root.
    pub fn begin_list_value(&mut self, class: &str) -> Result<()> {
        self.require_element_scope("begin_list_value")?;
        self.gap_before_object();
        self.indent();
        self.output_class(class);
        self.open(Container::List, "[")
    }

    /// Closes a class-tagged list.
    pub fn end_list(&mut self) -> Result<()> {
        self.close(Container::List, "end_list", ']')
    }

    fn open(&mut self, kind: Container, bracket: &str) -> Result<()> {
        let child_compact = self.compact || self.compact_hint;
        self.out.push_str(bracket);
        self.stack.push(Open {
            kind,
            prev_compact: self.compact,
        });
        self.compact = child_compact;
        if !self.compact {
            self.out.push('\n');
            self.level += 1;
        }
        self.last_was_property = false;
        self.need_comma = false;
        Ok(())
    }

    fn close(&mut self, kind: Container, op: &'static str, bracket: char) -> Result<()> {
        match self.stack.last() {
            Some(open) if open.kind == kind => {}
            _ => return Err(Error::positionless(ErrorKind::Structure(op))),
        }
        let open = self.stack.pop().expect("checked above");
        if self.compact {
            self.out.push(bracket);
        } else {
            self.level -= 1;
            self.indent();
            self.out.push(bracket);
        }
        self.compact = open.prev_compact;
        if !self.compact {
            self.out.push('\n');
        }
        self.last_was_property = false;
        self.need_comma = true;
        if self.at_root() {
            self.gap_armed = true;
        }
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Primitives
    // --------------------------------------------------------------------------------------------

    /// Writes `key: value`.
    pub fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        self.require_member_scope("property")?;
        self.require_key(key)?;
        self.gap_before_property();
        self.output_key(key);
        self.write_scalar(value);
        if !self.compact {
            self.out.push('\n');
        }
        self.last_was_property = true;
        self.need_comma = true;
        self.gap_armed = self.at_root() || self.gap_armed;
        Ok(())
    }

    /// Writes `key: null`.
    pub fn null_property(&mut self, key: &str) -> Result<()> {
        self.require_member_scope("null_property")?;
        self.require_key(key)?;
        self.gap_before_property();
        self.output_key(key);
        self.out.push_str("null");
        if !self.compact {
            self.out.push('\n');
        }
        self.last_was_property = true;
        self.need_comma = true;
        self.gap_armed = self.at_root() || self.gap_armed;
        Ok(())
    }

    /// Writes a list element.
    pub fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        self.require_element_value_scope("value")?;
        self.indent();
        self.write_scalar(value);
        if !self.compact {
            self.out.push('\n');
        }
        self.need_comma = true;
        Ok(())
    }

    /// Writes a null list element.
    pub fn null_value(&mut self) -> Result<()> {
        self.require_element_value_scope("null_value")?;
        self.indent();
        self.out.push_str("null");
        if !self.compact {
            self.out.push('\n');
        }
        self.need_comma = true;
        Ok(())
    }

    /// Writes a comment. Compact output suppresses comments.
    pub fn comment(&mut self, text: &str, kind: CommentKind) -> Result<()> {
        if self.compact {
            return Ok(());
        }
        self.indent();
        match kind {
            CommentKind::SlashSlash => {
                self.out.push_str("//");
                self.out.push_str(text);
            }
            CommentKind::Hash => {
                self.out.push('#');
                self.out.push_str(text);
            }
            CommentKind::Block => {
                self.out.push_str("/*");
                self.out.push_str(text);
                self.out.push_str("*/");
            }
        }
        self.out.push('\n');
        Ok(())
    }

    /// Writes a `#` directive line.
    pub fn directive(&mut self, text: &str) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(structure("directive inside a container"));
        }
        self.indent();
        self.out.push('#');
        self.out.push_str(text);
        self.out.push('\n');
        self.last_was_property = false;
        self.gap_armed = true;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Layout
    // --------------------------------------------------------------------------------------------

    fn at_root(&self) -> bool {
        self.stack.is_empty()
    }

    fn gap_before_property(&mut self) {
        if self.compact || !self.root_gap || self.last_was_property {
            return;
        }
        if self.at_root() && self.gap_armed {
            self.out.push('\n');
        }
    }

    fn gap_before_object(&mut self) {
        if self.compact || !self.root_gap {
            return;
        }
        if self.at_root() && self.gap_armed {
            self.out.push('\n');
        }
    }

    fn indent(&mut self) {
        if self.compact {
            if self.need_comma {
                self.out.push_str(", ");
                self.need_comma = false;
            }
            return;
        }
        if self.use_tabs {
            for _ in 0..self.level {
                self.out.push('\t');
            }
        } else {
            for _ in 0..self.level * self.tab_size {
                self.out.push(' ');
            }
        }
    }

    fn output_key(&mut self, key: &str) {
        self.indent();
        if key_needs_quotes(key) {
            self.write_quoted(key);
        } else {
            self.out.push_str(key);
        }
        if self.compact {
            self.out.push(':');
        } else {
            self.out.push_str(": ");
        }
    }

    /// The parenthesized class-tag form, quoting the tag when needed.
    fn output_class(&mut self, class: &str) {
        self.out.push('(');
        if key_needs_quotes(class) {
            self.write_quoted(class);
        } else {
            self.out.push_str(class);
        }
        self.out.push_str(") ");
    }

    fn require_member_scope(&self, op: &'static str) -> Result<()> {
        self.require_live(op)?;
        match self.stack.last() {
            None | Some(Open {
                kind: Container::Map | Container::Object,
                ..
            }) => Ok(()),
            _ => Err(Error::positionless(ErrorKind::Structure(op))),
        }
    }

    fn require_element_scope(&self, op: &'static str) -> Result<()> {
        self.require_live(op)?;
        match self.stack.last() {
            None | Some(Open {
                kind: Container::Array | Container::List,
                ..
            }) => Ok(()),
            _ => Err(Error::positionless(ErrorKind::Structure(op))),
        }
    }

    /// Like [`require_element_scope`], but root is not a value position.
    ///
    /// [`require_element_scope`]: Writer::require_element_scope
    fn require_element_value_scope(&self, op: &'static str) -> Result<()> {
        self.require_live(op)?;
        match self.stack.last() {
            Some(Open {
                kind: Container::Array | Container::List,
                ..
            }) => Ok(()),
            _ => Err(Error::positionless(ErrorKind::Structure(op))),
        }
    }

    fn require_live(&self, op: &'static str) -> Result<()> {
        if !self.begun || self.ended {
            return Err(Error::positionless(ErrorKind::Structure(op)));
        }
        Ok(())
    }

    fn require_key(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(structure("empty key"));
        }
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Scalar rendering
    // --------------------------------------------------------------------------------------------

    fn write_scalar(&mut self, value: Scalar<'_>) {
        match value {
            Scalar::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            Scalar::Int(v, kind) => self.write_integer(v, kind),
            Scalar::Float(v) => self.write_float(v),
            Scalar::Str(s, StringKind::MultiLine) if !self.compact => self.write_triple_quoted(s),
            Scalar::Str(s, _) => self.write_string_value(s),
            Scalar::Bytes(data, StringKind::MultiLine) if !self.compact => {
                self.write_byte_block(data);
            }
            Scalar::Bytes(data, _) => {
                self.out.push('`');
                self.out.push_str(&BASE64.encode(data));
                self.out.push('`');
            }
        }
    }

    fn write_integer(&mut self, v: i32, kind: IntegerKind) {
        use core::fmt::Write;
        match kind {
            IntegerKind::Plain => write!(self.out, "{v}"),
            IntegerKind::Signed if v >= 0 => write!(self.out, "+{v}"),
            IntegerKind::Signed => write!(self.out, "{v}"),
            IntegerKind::Hex => write!(self.out, "0x{:X}", v as u32),
            IntegerKind::Binary => write!(self.out, "%{:b}", v as u32),
        }
        .expect("writing to a string cannot fail");
    }

    /// Shortest round-trippable `f32`, nudged so it re-classifies as a float.
    fn write_float(&mut self, v: f32) {
        let s = v.to_string();
        self.out.push_str(&s);
        if !s.contains(['.', 'e', 'E']) && s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
            self.out.push_str(".0");
        }
    }

    /// Bareword when nothing forces quotes and the classifier agrees the
    /// text is a string; quoted otherwise. Compact mode always quotes, as
    /// quoteless text next to `, ` separators is ambiguous.
    fn write_string_value(&mut self, s: &str) {
        if !self.compact && !value_needs_quotes(s) && classify(s.as_bytes()) == Classified::Str {
            self.out.push_str(s);
        } else {
            self.write_quoted(s);
        }
    }

    fn write_quoted(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\u{0008}' => self.out.push_str("\\b"),
                '\u{000C}' => self.out.push_str("\\f"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    /// `'''`-delimited output: the body opens on its own line one level
    /// deeper, with every content line indented one column past the quotes
    /// so the reader's alignment rule strips exactly the layout whitespace,
    /// interior blank lines and leading content spaces included. A newline
    /// that ends the content is written escaped; the reader strips the final
    /// layout newline, not that one.
    fn write_triple_quoted(&mut self, s: &str) {
        self.level += 1;
        self.out.push('\n');
        self.indent();
        self.out.push_str("'''\n");
        self.triple_indent();
        let last = s.len().saturating_sub(1);
        for (i, c) in s.char_indices() {
            match c {
                '\n' if i == last => self.out.push_str("\\n"),
                '\n' => {
                    self.out.push('\n');
                    self.triple_indent();
                }
                '\'' => self.out.push_str("\\'"),
                '\\' => self.out.push_str("\\\\"),
                '\r' => self.out.push_str("\\r"),
                '\u{0008}' => self.out.push_str("\\b"),
                '\u{000C}' => self.out.push_str("\\f"),
                c => self.out.push(c),
            }
        }
        self.out.push('\n');
        self.indent();
        self.out.push_str("'''");
        self.level -= 1;
    }

    /// Content indentation inside a triple-quoted body: one column past the
    /// quotes' alignment column.
    fn triple_indent(&mut self) {
        self.indent();
        self.out.push(' ');
    }

    /// `<<< … >>>` output, wrapped at 64 columns.
    fn write_byte_block(&mut self, data: &[u8]) {
        let encoded = BASE64.encode(data);
        self.level += 1;
        self.out.push_str("<<<\n");
        for chunk in encoded.as_bytes().chunks(BASE64_WRAP_COLUMNS) {
            self.indent();
            self.out
                .push_str(core::str::from_utf8(chunk).expect("base64 is ascii"));
            self.out.push('\n');
        }
        self.level -= 1;
        self.indent();
        self.out.push_str(">>>");
    }
}

/// Piping a parse into a writer reformats the document, so the writer is
/// itself a listener. Unknown functions fall back to the trait default and
/// round-trip as opaque `@…` strings.
impl Listener for Writer {
    fn begin(&mut self) -> Result<()> {
        Writer::begin(self)
    }

    fn end(&mut self) -> Result<()> {
        Writer::end(self)
    }

    fn begin_object(&mut self, key: &str, class: &str) -> Result<()> {
        Writer::begin_object(self, key, class)
    }

    fn begin_object_value(&mut self, class: &str) -> Result<()> {
        Writer::begin_object_value(self, class)
    }

    fn end_object(&mut self) -> Result<()> {
        Writer::end_object(self)
    }

    fn begin_map(&mut self, key: &str) -> Result<()> {
        Writer::begin_map(self, key)
    }

    fn begin_map_value(&mut self) -> Result<()> {
        Writer::begin_map_value(self)
    }

    fn end_map(&mut self) -> Result<()> {
        Writer::end_map(self)
    }

    fn begin_list(&mut self, key: &str, class: &str) -> Result<()> {
        Writer::begin_list(self, key, class)
    }

    fn begin_list_value(&mut self, class: &str) -> Result<()> {
        Writer::begin_list_value(self, class)
    }

    fn end_list(&mut self) -> Result<()> {
        Writer::end_list(self)
    }

    fn begin_array(&mut self, key: &str) -> Result<()> {
        Writer::begin_array(self, key)
    }

    fn begin_array_value(&mut self) -> Result<()> {
        Writer::begin_array_value(self)
    }

    fn end_array(&mut self) -> Result<()> {
        Writer::end_array(self)
    }

    fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        Writer::property(self, key, value)
    }

    fn null_property(&mut self, key: &str) -> Result<()> {
        Writer::null_property(self, key)
    }

    fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        Writer::value(self, value)
    }

    fn null_value(&mut self) -> Result<()> {
        Writer::null_value(self)
    }

    fn comment(&mut self, text: &str, kind: CommentKind) -> Result<()> {
        Writer::comment(self, text, kind)
    }

    fn directive(&mut self, text: &str) -> Result<()> {
        Writer::directive(self, text)
    }
}

fn structure(msg: &'static str) -> Error {
    Error::positionless(ErrorKind::Structure(msg))
}

fn is_ws_char(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n'
}

/// Keys are quoted when they contain whitespace, a structural delimiter, a
/// comment opener, or nothing at all.
fn key_needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.contains("//")
        || s.contains("/*")
        || s.chars().any(|c| {
            is_ws_char(c)
                || matches!(
                    c,
                    '{' | '}' | '[' | ']' | '(' | ')' | ',' | ':' | '#' | '\\' | '"'
                )
        })
}

/// A value stays bareword only when it has no whitespace and none of the
/// bytes that would terminate or re-lex a quoteless token.
fn value_needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('@')
        || s.contains("//")
        || s.contains("/*")
        || s.chars().any(|c| {
            is_ws_char(c)
                || matches!(
                    c,
                    '"' | '\'' | '`' | ',' | '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | ':'
                        | '#' | '\\' | '\r' | '\u{0008}' | '\u{000C}'
                )
        })
}
