//! Streaming parser and pretty-printing writer for THJSON, a human-friendly
//! superset of JSON with class tags, binary literals, and directives.
//!
//! The core is event-based: [`Parser`] turns input bytes into a linear
//! sequence of structural events delivered to a [`Listener`], and [`Writer`]
//! is its dual, taking the same event vocabulary as a sink and producing
//! THJSON text. There is no in-memory document tree in this crate; adapters
//! build whatever representation they need from the event stream.
//!
//! # Examples
//!
//! Reformatting a document by piping the parser straight into the writer:
//!
//! ```
//! use thjson::{parse_str, Writer};
//!
//! let mut writer = Writer::new();
//! writer.set_output_header(false);
//! parse_str("inventory: (item) [sword, axe]\n", &mut writer)?;
//! assert_eq!(
//!     writer.into_string(),
//!     "inventory: (item) [\n    sword\n    axe\n]\n"
//! );
//! # Ok::<(), thjson::Error>(())
//! ```

mod classify;
mod error;
mod escape_buffer;
mod event;
mod options;
mod source;
mod writer;

pub mod parser;

pub use classify::{classify, Classified};
pub use error::{Error, ErrorKind, Result};
pub use event::{CommentKind, IntegerKind, Listener, Scalar, StringKind};
pub use options::ParserOptions;
pub use parser::{parse_reader, parse_slice, parse_str, Parser};
pub use source::ByteSource;
pub use writer::{suggested_string_kind, Writer};

#[cfg(test)]
mod tests;
