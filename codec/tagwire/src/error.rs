//! Defines the error taxonomy of the codec.

/// The detailed reason why a stream failed to decode.
///
/// Every variant is fatal to the reading session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[allow(missing_docs)]
pub enum Corruption {
    #[error("the code byte {0:#04x} is not assigned")]
    UnknownCode(u8),

    #[error("no read handler is registered for the tag `{0}`")]
    UnknownTag(String),

    #[error("the tag `{0}` is reserved for a built-in type")]
    ReservedTag(String),

    #[error("the stream ended in the middle of a value")]
    Truncated,

    #[error("a string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected {expected} but found the code byte {code:#04x}")]
    UnexpectedCode { expected: &'static str, code: u8 },

    #[error("the length or count {0} is invalid")]
    InvalidLength(i64),

    #[error("cache index {index} is out of range (cache holds {len} entries)")]
    CacheIndexOutOfRange { index: usize, len: usize },

    #[error("cache index {0} refers to a value still under construction")]
    CacheEntryUnderConstruction(usize),

    #[error(
        "struct definition index {index} is out of range ({len} definitions \
         known)"
    )]
    StructIndexOutOfRange { index: usize, len: usize },

    #[error("expected {expected} but found {found}")]
    UnexpectedValue { expected: &'static str, found: &'static str },

    #[error(
        "the read handler for `{tag}` consumed {consumed} components but \
         {declared} were declared"
    )]
    ArityMismatch { tag: String, declared: usize, consumed: usize },

    #[error("the footer magic {0:#010x} is invalid")]
    InvalidFooterMagic(u32),

    #[error(
        "the footer records {recorded} bytes but {calculated} bytes were read"
    )]
    FooterLengthMismatch { recorded: u32, calculated: u32 },

    #[error(
        "the footer checksum {recorded:#010x} does not match the calculated \
         {calculated:#010x}"
    )]
    ChecksumMismatch { recorded: u32, calculated: u32 },

    #[error("an end-of-list marker appeared outside of a streamed list")]
    UnexpectedEndOfList,

    #[error("the nesting depth exceeds the limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("the read handler for `{0}` ignored a failed component read")]
    IgnoredFailure(String),
}

/// The error type returned by every fallible operation of the codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stream cannot be decoded.
    #[error("the stream is corrupt: {0}")]
    StreamCorrupt(#[from] Corruption),

    /// No further top-level value is available.
    ///
    /// This is the normal terminal condition of a reading session, not a
    /// failure.
    #[error("the stream has no further value")]
    EndOfStream,

    /// No write handler resolves for the runtime type being written.
    #[error("no write handler resolves for the type `{type_name}`")]
    UnsupportedType {
        /// The name of the offending type.
        type_name: &'static str,
    },

    /// A write handler wrote a different number of components than it
    /// declared with its tag.
    #[error(
        "the write handler for `{tag}` declared {declared} components but \
         wrote {written}"
    )]
    ArityMismatch {
        /// The tag the handler declared.
        tag: String,

        /// The declared component count.
        declared: usize,

        /// The number of components actually written.
        written: usize,
    },

    /// A write handler broke the handler protocol.
    #[error("handler protocol violation: {0}")]
    HandlerMisuse(&'static str),

    /// The session no longer accepts operations.
    #[error("the session is closed")]
    SessionClosed,

    /// The underlying sink or source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this is the [`Error::EndOfStream`] condition.
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Returns the corruption reason if this is a [`Error::StreamCorrupt`].
    #[must_use]
    pub const fn as_corruption(&self) -> Option<&Corruption> {
        match self {
            Self::StreamCorrupt(corruption) => Some(corruption),
            _ => None,
        }
    }
}

/// The result type used throughout the codec.
pub type Result<T, E = Error> = std::result::Result<T, E>;
