//! The reading session.
//!
//! A [`Reader`] decodes the top-level values of a [`ByteSource`] one at a
//! time. Structures are handed to the read handler registered for their tag,
//! which sees the session only through the [`ObjectReader`] trait.

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use crate::{
    cache::ReadCaches,
    codes,
    error::{Corruption, Error, Result},
    io::{ByteSource, RawInput},
    options::ReaderOptions,
    primitive::{self, BYTES_CODES, STRING_CODES},
    registry::{self, Registry},
    value::Value,
};

/// The interface a read handler consumes its components through.
///
/// Every call consumes exactly one component. A handler must consume
/// exactly as many components as the structure declares.
pub trait ObjectReader {
    /// Reads the next component, whatever its kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamCorrupt`] if the component cannot be decoded
    /// or if the handler already consumed every declared component.
    fn read_value(&mut self) -> Result<Value>;

    /// Reads the next component, which must be a boolean.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_value`]; a component of another kind is
    /// [`Corruption::UnexpectedValue`].
    fn read_bool(&mut self) -> Result<bool> {
        expect(self.read_value()?, "a bool", Value::into_bool)
    }

    /// Reads the next component, which must be an integer.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_int(&mut self) -> Result<i64> {
        expect(self.read_value()?, "an int", Value::into_int)
    }

    /// Reads the next component, which must be a single precision float.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_float(&mut self) -> Result<f32> {
        expect(self.read_value()?, "a float", Value::into_float32)
    }

    /// Reads the next component, which must be a double precision float.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_double(&mut self) -> Result<f64> {
        expect(self.read_value()?, "a double", Value::into_float64)
    }

    /// Reads the next component, which must be a string.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_string(&mut self) -> Result<String> {
        expect(self.read_value()?, "a string", Value::into_string)
    }

    /// Reads the next component, which must be a byte string.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        expect(self.read_value()?, "bytes", Value::into_bytes)
    }

    /// Reads the next component, which must be a list.
    ///
    /// # Errors
    ///
    /// See [`ObjectReader::read_bool`].
    fn read_list(&mut self) -> Result<Vec<Value>> {
        expect(self.read_value()?, "a list", Value::into_list)
    }
}

fn expect<T>(
    value: Value,
    expected: &'static str,
    into: fn(Value) -> std::result::Result<T, Value>,
) -> Result<T> {
    into(value).map_err(|value| {
        Corruption::UnexpectedValue { expected, found: value.kind() }.into()
    })
}

#[derive(Debug)]
struct Frame {
    tag: String,
    declared: usize,
    consumed: usize,
}

const PREALLOCATION_LIMIT: usize = 4096;

#[derive(Debug)]
struct Decoder<S> {
    input: RawInput<S>,
    caches: ReadCaches,
    frames: Vec<Frame>,
    registry: Registry,
    options: ReaderOptions,
    depth: usize,
    poisoned: bool,
}

impl<S: ByteSource> Decoder<S> {
    fn count_component(&mut self) -> Result<()> {
        let Some(frame) = self.frames.last_mut() else {
            return Ok(());
        };

        if frame.consumed == frame.declared {
            return Err(Corruption::ArityMismatch {
                tag: frame.tag.clone(),
                declared: frame.declared,
                consumed: frame.consumed + 1,
            }
            .into());
        }

        frame.consumed += 1;
        Ok(())
    }

    fn reset_caches(&mut self) {
        self.caches.reset();
        debug!("reader caches reset");
    }

    fn next_object(&mut self) -> Result<Value> {
        loop {
            match self.input.peek()? {
                None => return Err(Error::EndOfStream),
                Some(codes::FOOTER) if self.options.expect_footer => {
                    return Err(Error::EndOfStream);
                }
                Some(codes::RESET_CACHES) => {
                    self.input.read_byte()?;
                    self.reset_caches();
                }
                Some(_) => {
                    let value = self.decode_value()?;
                    trace!("read a top-level {}", value.kind());

                    return Ok(value);
                }
            }
        }
    }

    fn consume_footer(&mut self) -> Result<()> {
        match self.input.peek()? {
            Some(codes::FOOTER) => self.read_footer(),
            Some(code) => Err(Corruption::UnexpectedCode {
                expected: "a footer",
                code,
            }
            .into()),
            None => Err(Corruption::Truncated.into()),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn read_footer(&mut self) -> Result<()> {
        let calculated_length = self.input.bytes_read() as u32;
        let calculated_checksum = self.input.checksum();

        let magic = primitive::read_raw(&mut self.input, 4)? as u32;
        if magic != codes::FOOTER_MAGIC {
            return Err(Corruption::InvalidFooterMagic(magic).into());
        }

        let length = primitive::read_raw(&mut self.input, 4)? as u32;
        if length != calculated_length {
            return Err(Corruption::FooterLengthMismatch {
                recorded: length,
                calculated: calculated_length,
            }
            .into());
        }

        let checksum = primitive::read_raw(&mut self.input, 4)? as u32;
        if self.options.validate_checksum && checksum != calculated_checksum {
            return Err(Corruption::ChecksumMismatch {
                recorded: checksum,
                calculated: calculated_checksum,
            }
            .into());
        }

        debug!("footer validated after {length} bytes");

        self.input.reset();
        self.caches.reset();

        Ok(())
    }

    fn decode_value(&mut self) -> Result<Value> {
        loop {
            let code = self.input.expect_byte()?;

            if code != codes::RESET_CACHES {
                return self.decode_code(code);
            }

            self.reset_caches();
        }
    }

    fn decode_code(&mut self, code: u8) -> Result<Value> {
        self.depth += 1;

        let result = match self.options.max_depth {
            Some(max_depth) if self.depth > max_depth => {
                Err(Corruption::DepthLimitExceeded(max_depth).into())
            }
            _ => self.decode_body(code),
        };

        self.depth -= 1;
        result
    }

    fn decode_body(&mut self, code: u8) -> Result<Value> {
        if let Some(int) = primitive::read_int_body(code, &mut self.input)? {
            return Ok(Value::Int(int));
        }

        if STRING_CODES.starts_with(code) {
            return primitive::read_string_body(code, &mut self.input)
                .map(Value::String);
        }

        if BYTES_CODES.starts_with(code) {
            return primitive::read_chunked_body(
                code,
                &mut self.input,
                BYTES_CODES,
            )
            .map(Value::Bytes);
        }

        match code {
            codes::NULL => Ok(Value::Nil),
            codes::TRUE => Ok(Value::Bool(true)),
            codes::FALSE => Ok(Value::Bool(false)),

            codes::FLOAT => {
                primitive::read_float_body(&mut self.input).map(Value::Float32)
            }
            codes::DOUBLE => {
                primitive::read_double_body(&mut self.input).map(Value::Float64)
            }
            codes::DOUBLE_0 => Ok(Value::Float64(0.0)),
            codes::DOUBLE_1 => Ok(Value::Float64(1.0)),

            codes::BIGINT => {
                primitive::read_big_int_body(&mut self.input).map(Value::BigInt)
            }

            codes::LIST_PACKED_LENGTH_START..=codes::BEGIN_OPEN_LIST => {
                self.decode_list_body(code).map(Value::List)
            }
            codes::MAP => self.decode_map(),
            codes::SET => {
                let elements = self.decode_list_payload()?;
                Ok(Value::Set(elements.into_iter().collect()))
            }

            codes::PUT_PRIORITY_CACHE => {
                let index = self.caches.reserve_priority();
                let value = self.decode_value()?;

                self.caches.fill_priority(index, value.clone());
                Ok(value)
            }
            codes::GET_PRIORITY_CACHE => {
                let index = primitive::read_count(&mut self.input)?;
                self.caches.priority(index).cloned()
            }
            codes::PRIORITY_CACHE_PACKED_START
                ..codes::PRIORITY_CACHE_PACKED_END => self
                .caches
                .priority(usize::from(code - codes::PRIORITY_CACHE_PACKED_START))
                .cloned(),

            codes::STRUCTTYPE => {
                let tag = self.decode_struct_tag()?;
                let component_count = primitive::read_count(&mut self.input)?;

                self.caches.define_struct((tag.clone(), component_count));
                self.decode_struct(tag, component_count)
            }
            codes::STRUCT => {
                let index = primitive::read_count(&mut self.input)?;
                let (tag, component_count) =
                    self.caches.struct_definition(index)?.clone();

                self.decode_struct(tag, component_count)
            }
            codes::STRUCT_CACHE_PACKED_START..codes::STRUCT_CACHE_PACKED_END => {
                let index =
                    usize::from(code - codes::STRUCT_CACHE_PACKED_START);
                let (tag, component_count) =
                    self.caches.struct_definition(index)?.clone();

                self.decode_struct(tag, component_count)
            }

            codes::END_COLLECTION => Err(Corruption::UnexpectedEndOfList.into()),
            codes::FOOTER => {
                Err(Corruption::UnexpectedCode { expected: "a value", code }
                    .into())
            }

            code => Err(Corruption::UnknownCode(code).into()),
        }
    }

    fn decode_elements(&mut self, len: usize) -> Result<Vec<Value>> {
        let mut elements = Vec::with_capacity(len.min(PREALLOCATION_LIMIT));

        for _ in 0..len {
            elements.push(self.decode_value()?);
        }

        Ok(elements)
    }

    fn decode_streamed(&mut self, closed: bool) -> Result<Vec<Value>> {
        let mut elements = Vec::new();

        loop {
            match self.input.peek()? {
                Some(codes::END_COLLECTION) => {
                    self.input.read_byte()?;
                    return Ok(elements);
                }
                None if closed => return Err(Corruption::Truncated.into()),
                None => return Ok(elements),
                Some(_) => elements.push(self.decode_value()?),
            }
        }
    }

    fn decode_list_body(&mut self, code: u8) -> Result<Vec<Value>> {
        match code {
            codes::LIST_PACKED_LENGTH_START..codes::LIST_PACKED_LENGTH_END => {
                self.decode_elements(usize::from(
                    code - codes::LIST_PACKED_LENGTH_START,
                ))
            }
            codes::LIST => {
                let len = primitive::read_count(&mut self.input)?;
                self.decode_elements(len)
            }
            codes::BEGIN_CLOSED_LIST => self.decode_streamed(true),
            codes::BEGIN_OPEN_LIST => self.decode_streamed(false),
            code => {
                Err(Corruption::UnexpectedCode { expected: "a list", code }
                    .into())
            }
        }
    }

    fn decode_list_payload(&mut self) -> Result<Vec<Value>> {
        let code = self.input.expect_byte()?;
        self.decode_list_body(code)
    }

    fn decode_map(&mut self) -> Result<Value> {
        let entries = self.decode_list_payload()?;

        if entries.len() % 2 != 0 {
            return Err(Corruption::UnexpectedValue {
                expected: "an even number of map entries",
                found: "an odd number",
            }
            .into());
        }

        // duplicate keys: the last entry wins
        let mut map = BTreeMap::new();
        let mut entries = entries.into_iter();
        while let (Some(key), Some(value)) = (entries.next(), entries.next()) {
            map.insert(key, value);
        }

        Ok(Value::Map(map))
    }

    fn decode_struct_tag(&mut self) -> Result<String> {
        let code = self.input.expect_byte()?;

        if !STRING_CODES.starts_with(code) {
            return Err(Corruption::UnexpectedCode {
                expected: "a struct tag",
                code,
            }
            .into());
        }

        primitive::read_string_body(code, &mut self.input)
    }

    fn decode_struct(
        &mut self,
        tag: String,
        component_count: usize,
    ) -> Result<Value> {
        if codes::is_reserved_tag(&tag) {
            return Err(Corruption::ReservedTag(tag).into());
        }

        let handler = self.registry.read_handler(&tag);
        if handler.is_none() && !self.options.accept_unknown_tags {
            return Err(Corruption::UnknownTag(tag).into());
        }

        let base = self.frames.len();
        self.frames.push(Frame {
            tag: tag.clone(),
            declared: component_count,
            consumed: 0,
        });

        let result = match handler {
            Some(handler) => handler.read(self, &tag, component_count),
            None => registry::read_record(self, &tag, component_count),
        };

        let frame = self.frames.drain(base..).next();
        let value = result?;

        if self.poisoned {
            return Err(Corruption::IgnoredFailure(tag).into());
        }

        match frame {
            Some(frame) if frame.consumed != frame.declared => {
                Err(Corruption::ArityMismatch {
                    tag: frame.tag,
                    declared: frame.declared,
                    consumed: frame.consumed,
                }
                .into())
            }
            _ => Ok(value),
        }
    }
}

impl<S: ByteSource> ObjectReader for Decoder<S> {
    fn read_value(&mut self) -> Result<Value> {
        let result = self.count_component().and_then(|()| self.decode_value());

        // the position in the stream is lost once a component fails
        if result.is_err() {
            self.poisoned = true;
        }

        result
    }
}

/// A reading session over one [`ByteSource`].
///
/// Reaching the end of the stream at a value boundary is
/// [`Error::EndOfStream`], which leaves the session usable. Any other
/// failure closes it; every later call fails with [`Error::SessionClosed`].
/// That includes a failed component read whose error a read handler dropped.
#[derive(Debug)]
pub struct Reader<S> {
    decoder: Decoder<S>,
    closed: bool,
}

impl<S: ByteSource> Reader<S> {
    /// Creates a new session with the default options.
    #[must_use]
    pub fn new(source: S, registry: Registry) -> Self {
        Self::with_options(source, registry, ReaderOptions::default())
    }

    /// Creates a new session.
    #[must_use]
    pub fn with_options(
        source: S,
        registry: Registry,
        options: ReaderOptions,
    ) -> Self {
        Self {
            decoder: Decoder {
                input: RawInput::new(source),
                caches: ReadCaches::default(),
                frames: Vec::new(),
                registry,
                options,
                depth: 0,
                poisoned: false,
            },
            closed: false,
        }
    }

    /// Reads the next top-level value.
    ///
    /// With [`ReaderOptions::expect_footer`], a footer ends the values the
    /// same way the end of the stream does; it stays unread until
    /// [`Reader::validate_footer`].
    ///
    /// # Errors
    ///
    /// - [`Error::EndOfStream`] if no value remains. Repeated calls keep
    ///   returning it.
    /// - [`Error::StreamCorrupt`] if the stream cannot be decoded.
    /// - [`Error::SessionClosed`] if an earlier call failed.
    /// - [`Error::Io`] if the source fails.
    pub fn read_object(&mut self) -> Result<Value> {
        self.guard(Decoder::next_object)
    }

    /// Validates the footer that must follow the values read so far.
    ///
    /// The byte count and checksum restart afterwards, as do both caches, so
    /// the values of another footer-terminated segment may follow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamCorrupt`] if the next record is not a footer
    /// or does not match what was read, [`Error::SessionClosed`] if an
    /// earlier call failed, or [`Error::Io`] if the source fails.
    pub fn validate_footer(&mut self) -> Result<()> {
        self.guard(Decoder::consume_footer)
    }

    /// Returns `true` if the session no longer accepts reads.
    #[must_use]
    pub const fn is_closed(&self) -> bool { self.closed }

    /// Gets the options of the session.
    #[must_use]
    pub const fn options(&self) -> &ReaderOptions { &self.decoder.options }

    /// Gets the registry of the session.
    #[must_use]
    pub const fn registry(&self) -> &Registry { &self.decoder.registry }

    /// Consumes the session and returns the underlying source.
    #[must_use]
    pub fn into_inner(self) -> S { self.decoder.input.into_inner() }

    fn guard<T>(
        &mut self,
        operation: impl FnOnce(&mut Decoder<S>) -> Result<T>,
    ) -> Result<T> {
        if self.closed {
            return Err(Error::SessionClosed);
        }

        let result = operation(&mut self.decoder);

        if let Err(error) = &result {
            if !error.is_end_of_stream() {
                warn!("closing the reader: {error}");

                self.closed = true;
                self.decoder.frames.clear();
                self.decoder.depth = 0;
                self.decoder.poisoned = false;
            }
        }

        result
    }
}
