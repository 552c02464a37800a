//! Session configuration.
//!
//! Both option structs deserialize with every field optional, so a
//! collaborator can keep them in a configuration file. Unset fields take
//! their defaults:
//!
//! ``` rust
//! use tagwire::options::{ReaderOptions, DEFAULT_MAX_DEPTH};
//!
//! let options =
//!     ReaderOptions { validate_checksum: false, ..ReaderOptions::default() };
//!
//! assert!(!options.accept_unknown_tags);
//! assert!(!options.expect_footer);
//! assert_eq!(options.max_depth, Some(DEFAULT_MAX_DEPTH));
//! ```

use serde::{Deserialize, Serialize};

/// The default nesting depth limit of a reader.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Options of a writing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Whether strings are put in the priority cache automatically.
    pub cache_strings: bool,

    /// The shortest byte length of a string that is cached automatically.
    pub min_cached_string_len: usize,
}

impl Default for WriterOptions {
    fn default() -> Self { Self { cache_strings: true, min_cached_string_len: 1 } }
}

/// Options of a reading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Whether the stream ends with footers.
    ///
    /// When set, [`crate::Reader::read_object`] stops at a footer with
    /// [`crate::Error::EndOfStream`] and leaves it for
    /// [`crate::Reader::validate_footer`]. When unset, a footer code in place
    /// of a value is corrupt.
    pub expect_footer: bool,

    /// Whether footers compare checksums in addition to the magic and the
    /// length.
    pub validate_checksum: bool,

    /// Whether a struct whose tag has no read handler decodes as a
    /// [`crate::value::Record`] instead of failing.
    pub accept_unknown_tags: bool,

    /// The deepest nesting of values accepted, or `None` for no limit.
    pub max_depth: Option<usize>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            expect_footer: false,
            validate_checksum: true,
            accept_unknown_tags: false,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}
