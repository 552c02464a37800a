//! A self-describing, tagged binary object codec.
//!
//! Every encoded value starts with a single code byte that either is the
//! value (small integers, booleans, nil, cache references) or says how the
//! following bytes decode. User types travel as tagged structures: a name
//! plus a fixed number of component values, encoded and decoded by handlers
//! looked up in a [`Registry`].
//!
//! The codec runs on any [`std::io::Write`] sink and [`std::io::BufRead`]
//! source and never opens files or sockets itself.
//!
//! # Example
//!
//! ``` rust
//! use std::collections::BTreeMap;
//!
//! use tagwire::{Registry, Value};
//!
//! let mut map = BTreeMap::new();
//! map.insert(Value::from("answer"), Value::from(42));
//!
//! let mut writer = tagwire::create_writer(Vec::new(), Registry::default());
//! writer.write_value(&Value::Map(map.clone())).unwrap();
//! writer.write_object(&"second").unwrap();
//! writer.write_footer().unwrap();
//!
//! let bytes = writer.finish().unwrap();
//!
//! let mut reader =
//!     tagwire::create_reader(&bytes[..], Registry::default(), true);
//! assert_eq!(reader.read_object().unwrap(), Value::Map(map));
//! assert_eq!(reader.read_object().unwrap(), Value::from("second"));
//! reader.validate_footer().unwrap();
//!
//! assert!(reader.read_object().unwrap_err().is_end_of_stream());
//! ```

pub mod cache;
pub mod codes;
pub mod error;
pub mod io;
pub mod options;
pub mod primitive;
pub mod reader;
pub mod registry;
pub mod snapshot;
pub mod value;
pub mod writer;

pub use error::{Corruption, Error, Result};
pub use options::{ReaderOptions, WriterOptions};
pub use reader::{ObjectReader, Reader};
pub use registry::{ReadHandlers, Registry, WriteHandlers};
pub use snapshot::Snapshot;
pub use value::{BigInt, Record, Value};
pub use writer::{ObjectWriter, Writer};

use crate::io::{ByteSink, ByteSource};

/// Opens a writing session over `sink` with the default options.
#[must_use]
pub fn create_writer<S: ByteSink>(sink: S, registry: Registry) -> Writer<S> {
    Writer::new(sink, registry)
}

/// Opens a reading session over `source`.
///
/// `validate_checksum` states that the stream ends with a footer whose
/// checksum is compared in addition to its magic and length. Without it, the
/// stream must carry no footer; see [`ReaderOptions::expect_footer`].
#[must_use]
pub fn create_reader<S: ByteSource>(
    source: S,
    registry: Registry,
    validate_checksum: bool,
) -> Reader<S> {
    Reader::with_options(source, registry, ReaderOptions {
        expect_footer: validate_checksum,
        validate_checksum,
        ..ReaderOptions::default()
    })
}

/// Reads every remaining top-level value.
///
/// The batch ends normally at the end of the stream, or at a footer when the
/// reader expects one. The footer itself is left for
/// [`Reader::validate_footer`].
///
/// # Errors
///
/// Returns the first failure other than [`Error::EndOfStream`].
pub fn read_batch<S: ByteSource>(reader: &mut Reader<S>) -> Result<Vec<Value>> {
    let mut values = Vec::new();

    loop {
        match reader.read_object() {
            Ok(value) => values.push(value),
            Err(Error::EndOfStream) => return Ok(values),
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
