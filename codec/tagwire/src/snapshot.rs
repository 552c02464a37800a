//! Restartable inspection of an encoded buffer.

use std::{iter::FusedIterator, sync::Arc};

use crate::{
    error::{Error, Result},
    options::ReaderOptions,
    reader::Reader,
    registry::Registry,
    value::Value,
};

/// An immutable encoded buffer that can be decoded any number of times.
///
/// Every call to [`Snapshot::iter`] starts a fresh reading session from the
/// beginning of the buffer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    bytes: Arc<[u8]>,
    registry: Registry,
    options: ReaderOptions,
}

impl Snapshot {
    /// Creates a snapshot decoded with the default reader options.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, registry: Registry) -> Self {
        Self::with_options(bytes, registry, ReaderOptions::default())
    }

    /// Creates a snapshot.
    #[must_use]
    pub fn with_options(
        bytes: impl Into<Arc<[u8]>>,
        registry: Registry,
        options: ReaderOptions,
    ) -> Self {
        Self { bytes: bytes.into(), registry, options }
    }

    /// Gets the encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] { &self.bytes }

    /// Iterates over the top-level values from the beginning.
    #[must_use]
    pub fn iter(&self) -> Objects<'_> {
        Objects {
            reader: Some(Reader::with_options(
                &self.bytes[..],
                self.registry.clone(),
                self.options,
            )),
            footer_validated: false,
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = Result<Value>;
    type IntoIter = Objects<'a>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/// The top-level values of a [`Snapshot`].
///
/// Ends at the end of the buffer. A decoding failure is yielded once and
/// ends the iteration.
///
/// With [`ReaderOptions::expect_footer`], every segment must end with a
/// footer, which is validated before the values of the next segment.
#[derive(Debug)]
pub struct Objects<'a> {
    reader: Option<Reader<&'a [u8]>>,
    footer_validated: bool,
}

impl Iterator for Objects<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;

        let error = loop {
            match reader.read_object() {
                Ok(value) => {
                    self.footer_validated = false;
                    return Some(Ok(value));
                }
                Err(Error::EndOfStream)
                    if reader.options().expect_footer
                        && !self.footer_validated =>
                {
                    match reader.validate_footer() {
                        Ok(()) => self.footer_validated = true,
                        Err(error) => break error,
                    }
                }
                Err(error) => break error,
            }
        };

        self.reader = None;

        if error.is_end_of_stream() {
            None
        } else {
            Some(Err(error))
        }
    }
}

impl FusedIterator for Objects<'_> {}

#[cfg(test)]
mod test;
