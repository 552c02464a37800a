//! The byte sink and byte source abstraction the codec runs on.
//!
//! The codec never opens files or sockets itself. It appends bytes to a
//! [`ByteSink`] and pulls bytes from a [`ByteSource`]; anything implementing
//! [`std::io::Write`] is a sink and anything implementing
//! [`std::io::BufRead`] is a source.
//!
//! [`RawOutput`] and [`RawInput`] wrap a sink and a source respectively and
//! keep the running byte count and checksum that the footer is validated
//! against.

use std::io::{self, BufRead, Write};

use xxhash_rust::xxh32::Xxh32;

use crate::error::{Corruption, Error, Result};

/// An append-only destination of bytes.
pub trait ByteSink {
    /// Appends all of `bytes` to the sink.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error unchanged.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Pushes appended bytes through to the final destination.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error unchanged.
    fn flush_sink(&mut self) -> io::Result<()>;
}

impl<W: Write + ?Sized> ByteSink for W {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }

    fn flush_sink(&mut self) -> io::Result<()> { self.flush() }
}

/// A sequential, peekable origin of bytes.
pub trait ByteSource {
    /// Returns the next byte without consuming it, or `None` at the end of
    /// the stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error unchanged.
    fn peek_byte(&mut self) -> io::Result<Option<u8>>;

    /// Consumes and returns the next byte, or `None` at the end of the
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error unchanged.
    fn next_byte(&mut self) -> io::Result<Option<u8>>;

    /// Fills `buf` completely.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`io::ErrorKind::UnexpectedEof`] if the
    /// stream ends first, or the underlying I/O error unchanged.
    fn next_bytes(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

impl<R: BufRead + ?Sized> ByteSource for R {
    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.consume(1);
        }

        Ok(byte)
    }

    fn next_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }
}

/// A [`ByteSink`] wrapper that counts and checksums everything appended.
pub struct RawOutput<S> {
    sink: S,
    bytes_written: u64,
    checksum: Xxh32,
}

impl<S: ByteSink> RawOutput<S> {
    /// Creates a new output over the given sink.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self { sink, bytes_written: 0, checksum: Xxh32::new(0) }
    }

    /// Appends the bytes, accounting for them in the count and checksum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the sink fails.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.append(bytes)?;
        self.bytes_written += bytes.len() as u64;
        self.checksum.update(bytes);

        Ok(())
    }

    /// Appends the bytes without accounting for them.
    ///
    /// Used for the footer record, which is not part of the data it
    /// validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the sink fails.
    pub fn append_unaccounted(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.append(bytes)?;
        Ok(())
    }

    /// Flushes the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the sink fails.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush_sink()?;
        Ok(())
    }

    /// The number of bytes accounted since creation or the last
    /// [`Self::reset`].
    #[must_use]
    pub const fn bytes_written(&self) -> u64 { self.bytes_written }

    /// The checksum of the bytes accounted since creation or the last
    /// [`Self::reset`].
    #[must_use]
    pub fn checksum(&self) -> u32 { self.checksum.digest() }

    /// Restarts the byte count and checksum.
    pub fn reset(&mut self) {
        self.bytes_written = 0;
        self.checksum = Xxh32::new(0);
    }

    /// Gets a reference to the underlying sink.
    #[must_use]
    pub const fn sink(&self) -> &S { &self.sink }

    /// Consumes the output and returns the underlying sink.
    #[must_use]
    pub fn into_inner(self) -> S { self.sink }
}

/// A [`ByteSource`] wrapper that counts and checksums everything consumed.
pub struct RawInput<S> {
    source: S,
    bytes_read: u64,
    checksum: Xxh32,
}

impl<S: ByteSource> RawInput<S> {
    /// Creates a new input over the given source.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source, bytes_read: 0, checksum: Xxh32::new(0) }
    }

    /// Returns the next byte without consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the source fails.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.source.peek_byte()?)
    }

    /// Consumes the next byte, returning `None` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the source fails.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.source.next_byte()?;
        if let Some(byte) = byte {
            self.bytes_read += 1;
            self.checksum.update(&[byte]);
        }

        Ok(byte)
    }

    /// Consumes the next byte, which must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Corruption::Truncated`] at the end of the stream or
    /// [`Error::Io`] if the source fails.
    pub fn expect_byte(&mut self) -> Result<u8> {
        self.read_byte()?.ok_or(Error::StreamCorrupt(Corruption::Truncated))
    }

    /// Fills `buf` completely from the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Corruption::Truncated`] if the stream ends first or
    /// [`Error::Io`] if the source fails.
    pub fn expect_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.source.next_bytes(buf) {
            Ok(()) => {
                self.bytes_read += buf.len() as u64;
                self.checksum.update(buf);
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(Corruption::Truncated.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// The number of bytes consumed since creation or the last
    /// [`Self::reset`].
    #[must_use]
    pub const fn bytes_read(&self) -> u64 { self.bytes_read }

    /// The checksum of the bytes consumed since creation or the last
    /// [`Self::reset`].
    #[must_use]
    pub fn checksum(&self) -> u32 { self.checksum.digest() }

    /// Restarts the byte count and checksum.
    pub fn reset(&mut self) {
        self.bytes_read = 0;
        self.checksum = Xxh32::new(0);
    }

    /// Consumes the input and returns the underlying source.
    #[must_use]
    pub fn into_inner(self) -> S { self.source }
}

impl<S: std::fmt::Debug> std::fmt::Debug for RawOutput<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawOutput")
            .field("sink", &self.sink)
            .field("bytes_written", &self.bytes_written)
            .field("checksum", &self.checksum.digest())
            .finish()
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for RawInput<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawInput")
            .field("source", &self.source)
            .field("bytes_read", &self.bytes_read)
            .field("checksum", &self.checksum.digest())
            .finish()
    }
}

#[cfg(test)]
mod test;
