//! The event surface of the streaming parser.
//!
//! THJSON parsing produces a linear sequence of structural events; there is
//! no in-memory tree in the core. Adapters implement [`Listener`] and receive
//! each event as a method call, in source order, on the parser's own call
//! stack. String and byte payloads are borrowed views that are only valid for
//! the duration of the call; copy them if they need to outlive it.
//!
//! # Examples
//!
//! Counting the properties of a document:
//!
//! ```
//! use thjson::{parse_str, Listener, Result, Scalar};
//!
//! #[derive(Default)]
//! struct Counter {
//!     properties: usize,
//! }
//!
//! impl Listener for Counter {
//!     fn property(&mut self, _key: &str, _value: Scalar<'_>) -> Result<()> {
//!         self.properties += 1;
//!         Ok(())
//!     }
//! }
//!
//! let mut counter = Counter::default();
//! parse_str("a: 1\nb: two\n", &mut counter)?;
//! assert_eq!(counter.properties, 2);
//! # Ok::<(), thjson::Error>(())
//! ```

use crate::error::Result;

/// The textual base an integer literal was written in.
///
/// Purely informational: all four sub-kinds decode to the same 32-bit signed
/// word. A writer uses the sub-kind to reproduce the original base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    /// Plain decimal, e.g. `42`.
    Plain,
    /// Decimal with an explicit leading `+`, e.g. `+42`.
    Signed,
    /// Hexadecimal, e.g. `0x2A`.
    Hex,
    /// Binary, e.g. `%101010`.
    Binary,
}

/// Whether a string (or byte) literal used a single-line or multi-line form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Quoteless, `"…"`, or `` `…` `` form.
    SingleLine,
    /// `'''…'''` or `<<<…>>>` form.
    MultiLine,
}

/// The syntactic flavour of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// …` to end of line.
    SlashSlash,
    /// `/* … */`.
    Block,
    /// `# …` to end of line.
    Hash,
}

/// A primitive value as delivered to a listener.
///
/// Null is not a `Scalar`; it has its own events ([`Listener::null_property`]
/// and [`Listener::null_value`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    /// `true` or `false`.
    Bool(bool),
    /// A 32-bit integer with the base it was written in.
    Int(i32, IntegerKind),
    /// A single-precision float.
    Float(f32),
    /// A string and the form it was written in.
    Str(&'a str, StringKind),
    /// Decoded Base64 bytes and the form they were written in.
    Bytes(&'a [u8], StringKind),
}

/// Receives the event stream of a [`Parser`](crate::Parser).
///
/// Every method has a default implementation, so an adapter only implements
/// the events it cares about. Defaults are no-ops, except [`function`],
/// which wraps the call text back into an opaque quoted string so that
/// unknown functions survive a parse/write round trip.
///
/// A callback that returns an error aborts the parse; events already
/// delivered stand. A listener must not re-enter the parser that is driving
/// it, though it may run a *separate* parser over separate input (this is
/// how function-call expansion works).
///
/// [`function`]: Listener::function
#[allow(unused_variables)]
pub trait Listener {
    /// Start of the document. Always the first event.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of the document. Always the last event of a successful parse.
    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    /// A keyed, class-tagged object opens: `key: (class) { … }`.
    fn begin_object(&mut self, key: &str, class: &str) -> Result<()> {
        Ok(())
    }

    /// An anonymous class-tagged object opens inside a list or at root.
    fn begin_object_value(&mut self, class: &str) -> Result<()> {
        Ok(())
    }

    /// A class-tagged object closes.
    fn end_object(&mut self) -> Result<()> {
        Ok(())
    }

    /// A keyed object without a class tag opens: `key: { … }`.
    fn begin_map(&mut self, key: &str) -> Result<()> {
        Ok(())
    }

    /// An anonymous untagged object opens inside a list or at root.
    fn begin_map_value(&mut self) -> Result<()> {
        Ok(())
    }

    /// An untagged object closes.
    fn end_map(&mut self) -> Result<()> {
        Ok(())
    }

    /// A keyed, class-tagged list opens: `key: (class) [ … ]`.
    fn begin_list(&mut self, key: &str, class: &str) -> Result<()> {
        Ok(())
    }

    /// An anonymous class-tagged list opens inside a list or at root.
    fn begin_list_value(&mut self, class: &str) -> Result<()> {
        Ok(())
    }

    /// A class-tagged list closes.
    fn end_list(&mut self) -> Result<()> {
        Ok(())
    }

    /// A keyed untagged array opens: `key: [ … ]`.
    fn begin_array(&mut self, key: &str) -> Result<()> {
        Ok(())
    }

    /// An anonymous untagged array opens inside a list or at root.
    fn begin_array_value(&mut self) -> Result<()> {
        Ok(())
    }

    /// An untagged array closes.
    fn end_array(&mut self) -> Result<()> {
        Ok(())
    }

    /// A primitive member of an object: `key: value`.
    fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        Ok(())
    }

    /// A null member of an object: `key: null`.
    fn null_property(&mut self, key: &str) -> Result<()> {
        Ok(())
    }

    /// A primitive element of a list.
    fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        Ok(())
    }

    /// A null element of a list.
    fn null_value(&mut self) -> Result<()> {
        Ok(())
    }

    /// A comment, anywhere whitespace may appear.
    fn comment(&mut self, text: &str, kind: CommentKind) -> Result<()> {
        Ok(())
    }

    /// A `#`/`@` directive at root member position. The text is trimmed and
    /// excludes the marker. Directives exist for listener side effects; the
    /// listener must not re-enter the running parser.
    fn directive(&mut self, text: &str) -> Result<()> {
        Ok(())
    }

    /// A `@`/`#` function call in value position. The returned text is parsed
    /// in place of the call, bounded by
    /// [`MAX_RECURSION`](crate::parser::MAX_RECURSION) nesting levels.
    ///
    /// The default wraps the call text as an opaque quoted string prefixed
    /// with `@`, so unknown functions round-trip through the stream.
    fn function(&mut self, text: &str) -> Result<String> {
        let mut quoted = String::with_capacity(text.len() + 4);
        quoted.push('"');
        quoted.push('@');
        for c in text.chars() {
            match c {
                '"' => quoted.push_str("\\\""),
                '\\' => quoted.push_str("\\\\"),
                c => quoted.push(c),
            }
        }
        quoted.push('"');
        Ok(quoted)
    }

    /// The source position (1-based line and column) of the token about to be
    /// delivered. Fired immediately before each structural or value event.
    fn position(&mut self, line: u32, column: u32) -> Result<()> {
        Ok(())
    }
}
