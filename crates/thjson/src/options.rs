//! Parser configuration.

use crate::source::DEFAULT_TAB_SIZE;

/// Configuration options for the THJSON parser.
///
/// # Examples
///
/// ```rust
/// use thjson::ParserOptions;
///
/// let options = ParserOptions {
///     tab_size: 8,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Tab size used for column accounting, which in turn drives the
    /// column-aligned de-indentation of triple-quoted strings and byte
    /// blocks. Tab size never rewrites input. Must be at least 1.
    ///
    /// # Default
    ///
    /// `4`
    pub tab_size: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            tab_size: DEFAULT_TAB_SIZE,
        }
    }
}
