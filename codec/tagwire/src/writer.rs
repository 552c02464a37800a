//! The writing session.
//!
//! A [`Writer`] turns top-level objects into encoded values on a
//! [`ByteSink`]. Each object is dispatched to the write handler its runtime
//! type resolves to in the [`Registry`]; the handler sees the session only
//! through the [`ObjectWriter`] trait.
//!
//! Every top-level object is encoded into a staging buffer first and reaches
//! the sink only once it is complete, so a failing handler never leaves half
//! a value in the stream.

use std::{
    any::{type_name, Any, TypeId},
    collections::{BTreeMap, BTreeSet},
};

use log::{debug, trace, warn};

use crate::{
    cache::{self, Checkpoint, WriteCaches},
    codes,
    error::{Error, Result},
    io::{ByteSink, RawOutput},
    options::WriterOptions,
    primitive,
    registry::Registry,
    value::{Record, Value},
};

/// The interface a write handler emits its value through.
///
/// A handler either writes exactly one value, or calls
/// [`ObjectWriter::write_tag`] first and then writes exactly the declared
/// number of components. Every `write_*` call, a nested
/// [`write_object`](#method.write_object) and a whole streamed list each
/// count as one component.
pub trait ObjectWriter {
    /// Starts a structure named `tag` with `component_count` components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerMisuse`] if the tag is reserved, is not the
    /// first thing the handler writes, or is the handler's second tag.
    fn write_tag(&mut self, tag: &str, component_count: usize) -> Result<()>;

    /// Writes a [`Value`] tree without consulting the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerMisuse`] for a record with a reserved tag.
    fn write_value(&mut self, value: &Value) -> Result<()>;

    /// Writes nil.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_nil(&mut self) -> Result<()>;

    /// Writes a boolean.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_bool(&mut self, value: bool) -> Result<()>;

    /// Writes an integer.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_int(&mut self, value: i64) -> Result<()>;

    /// Writes a single precision float.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_float(&mut self, value: f32) -> Result<()>;

    /// Writes a double precision float.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_double(&mut self, value: f64) -> Result<()>;

    /// Writes a string, caching it according to the session options.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_string(&mut self, value: &str) -> Result<()>;

    /// Writes a raw byte string.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn write_bytes(&mut self, value: &[u8]) -> Result<()>;

    /// Writes a list.
    ///
    /// # Errors
    ///
    /// See [`ObjectWriter::write_value`].
    fn write_list(&mut self, values: &[Value]) -> Result<()>;

    /// Writes a map.
    ///
    /// # Errors
    ///
    /// See [`ObjectWriter::write_value`].
    fn write_map(&mut self, map: &BTreeMap<Value, Value>) -> Result<()>;

    /// Writes a set.
    ///
    /// # Errors
    ///
    /// See [`ObjectWriter::write_value`].
    fn write_set(&mut self, set: &BTreeSet<Value>) -> Result<()>;

    /// Writes a value through the priority cache: a back-reference if the
    /// value was cached before, otherwise the value itself, which is then
    /// cached.
    ///
    /// # Errors
    ///
    /// See [`ObjectWriter::write_value`].
    fn write_cached(&mut self, value: &Value) -> Result<()>;

    /// Starts a list terminated by [`ObjectWriter::end_list`].
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn begin_closed_list(&mut self) -> Result<()>;

    /// Starts a list terminated by [`ObjectWriter::end_list`] or by the end
    /// of the stream.
    ///
    /// # Errors
    ///
    /// Never fails; fallible for uniformity.
    fn begin_open_list(&mut self) -> Result<()>;

    /// Ends the innermost streamed list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerMisuse`] if no streamed list is open in the
    /// current handler.
    fn end_list(&mut self) -> Result<()>;

    #[doc(hidden)]
    fn write_dyn(
        &mut self,
        object: &dyn Any,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<()>;
}

impl dyn ObjectWriter + '_ {
    /// Writes any object through the write handler its type resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] if no handler resolves, or
    /// whatever the handler fails with.
    pub fn write_object<T: Any>(&mut self, object: &T) -> Result<()> {
        self.write_dyn(object, TypeId::of::<T>(), type_name::<T>())
    }
}

#[derive(Debug)]
enum Frame {
    Handler { tag: Option<(String, usize)>, written: usize },
    List,
}

#[derive(Debug)]
struct Encoder {
    buffer: Vec<u8>,
    caches: WriteCaches,
    frames: Vec<Frame>,
    registry: Registry,
    options: WriterOptions,
    poisoned: bool,
}

impl Encoder {
    fn count_component(&mut self) {
        if let Some(Frame::Handler { written, .. }) = self.frames.last_mut() {
            *written += 1;
        }
    }

    // a failure stays recorded even if the handler drops the error
    fn poison<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.poisoned = true;
        }

        result
    }

    fn dispatch(
        &mut self,
        object: &dyn Any,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<()> {
        let (entry, object) = self
            .registry
            .resolve_write(type_id, object)
            .ok_or(Error::UnsupportedType { type_name })?;

        let base = self.frames.len();
        self.frames.push(Frame::Handler { tag: None, written: 0 });

        let result = entry.handler().write(self, object);

        let left_open = self.frames.len() > base + 1;
        let frame = self.frames.drain(base..).next();

        result?;

        if left_open {
            return Err(Error::HandlerMisuse("a streamed list was not ended"));
        }

        match frame {
            Some(Frame::Handler { tag: Some((tag, declared)), written })
                if written != declared =>
            {
                Err(Error::ArityMismatch { tag, declared, written })
            }
            Some(Frame::Handler { tag: None, written }) if written != 1 => {
                Err(Error::ArityMismatch {
                    tag: entry.tag().clone(),
                    declared: 1,
                    written,
                })
            }
            _ => Ok(()),
        }
    }

    fn abandon(&mut self, checkpoint: Checkpoint) {
        self.buffer.clear();
        self.frames.clear();
        self.caches.rollback(checkpoint);
        self.poisoned = false;
    }

    fn encode_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::String(string) => {
                self.encode_string(string);
                Ok(())
            }
            value => self.encode_plain(value),
        }
    }

    fn encode_plain(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Nil => self.buffer.push(codes::NULL),
            Value::Bool(true) => self.buffer.push(codes::TRUE),
            Value::Bool(false) => self.buffer.push(codes::FALSE),
            Value::Int(int) => primitive::write_int(&mut self.buffer, *int),
            Value::BigInt(big_int) => {
                primitive::write_big_int(&mut self.buffer, big_int);
            }
            Value::Float32(float) => {
                primitive::write_float(&mut self.buffer, *float);
            }
            Value::Float64(double) => {
                primitive::write_double(&mut self.buffer, *double);
            }
            Value::Bytes(bytes) => {
                primitive::write_bytes(&mut self.buffer, bytes);
            }
            Value::String(string) => {
                primitive::write_string(&mut self.buffer, string);
            }
            Value::List(values) => self.encode_list(values)?,
            Value::Map(map) => self.encode_map(map)?,
            Value::Set(set) => self.encode_set(set)?,
            Value::Extended(record) => self.encode_record(record)?,
        }

        Ok(())
    }

    fn encode_string(&mut self, string: &str) {
        let cached = self.options.cache_strings
            && !string.is_empty()
            && string.len() >= self.options.min_cached_string_len;

        if cached {
            self.encode_cached_unchecked(&Value::String(string.to_owned()));
        } else {
            primitive::write_string(&mut self.buffer, string);
        }
    }

    fn encode_cached(&mut self, value: &Value) -> Result<()> {
        if !cache::is_cacheable(value) {
            return self.encode_plain(value);
        }

        if let Some(index) = self.caches.priority_index(value) {
            self.encode_cache_reference(index);
            return Ok(());
        }

        self.buffer.push(codes::PUT_PRIORITY_CACHE);
        self.caches.assign_priority(value.clone());

        self.encode_plain(value)
    }

    // strings never fail to encode
    fn encode_cached_unchecked(&mut self, value: &Value) {
        if let Some(index) = self.caches.priority_index(value) {
            self.encode_cache_reference(index);
            return;
        }

        self.buffer.push(codes::PUT_PRIORITY_CACHE);
        self.caches.assign_priority(value.clone());

        if let Value::String(string) = value {
            primitive::write_string(&mut self.buffer, string);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_cache_reference(&mut self, index: usize) {
        let packed = usize::from(
            codes::PRIORITY_CACHE_PACKED_END
                - codes::PRIORITY_CACHE_PACKED_START,
        );

        if index < packed {
            self.buffer.push(codes::PRIORITY_CACHE_PACKED_START + index as u8);
        } else {
            self.buffer.push(codes::GET_PRIORITY_CACHE);
            primitive::write_count(&mut self.buffer, index);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_struct_header(
        &mut self,
        tag: &str,
        component_count: usize,
    ) -> Result<()> {
        if codes::is_reserved_tag(tag) {
            return Err(Error::HandlerMisuse(
                "a reserved tag cannot name a structure",
            ));
        }

        let key = (tag.to_owned(), component_count);
        let packed = usize::from(
            codes::STRUCT_CACHE_PACKED_END - codes::STRUCT_CACHE_PACKED_START,
        );

        match self.caches.struct_index(&key) {
            Some(index) if index < packed => {
                self.buffer
                    .push(codes::STRUCT_CACHE_PACKED_START + index as u8);
            }
            Some(index) => {
                self.buffer.push(codes::STRUCT);
                primitive::write_count(&mut self.buffer, index);
            }
            None => {
                self.buffer.push(codes::STRUCTTYPE);
                primitive::write_string(&mut self.buffer, tag);
                primitive::write_count(&mut self.buffer, component_count);

                self.caches.assign_struct(key);
            }
        }

        Ok(())
    }

    fn encode_record(&mut self, record: &Record) -> Result<()> {
        self.encode_struct_header(record.tag(), record.components().len())?;

        for component in record.components() {
            self.encode_value(component)?;
        }

        Ok(())
    }

    fn encode_list(&mut self, values: &[Value]) -> Result<()> {
        primitive::write_list_header(&mut self.buffer, values.len());

        for value in values {
            self.encode_value(value)?;
        }

        Ok(())
    }

    fn encode_map(&mut self, map: &BTreeMap<Value, Value>) -> Result<()> {
        self.buffer.push(codes::MAP);
        primitive::write_list_header(&mut self.buffer, map.len() * 2);

        for (key, value) in map {
            self.encode_value(key)?;
            self.encode_value(value)?;
        }

        Ok(())
    }

    fn encode_set(&mut self, set: &BTreeSet<Value>) -> Result<()> {
        self.buffer.push(codes::SET);
        primitive::write_list_header(&mut self.buffer, set.len());

        for value in set {
            self.encode_value(value)?;
        }

        Ok(())
    }

    fn begin_structure(
        &mut self,
        tag: &str,
        component_count: usize,
    ) -> Result<()> {
        match self.frames.last() {
            Some(Frame::Handler { tag: None, written: 0 }) => {}
            Some(Frame::Handler { tag: Some(_), .. }) => {
                return Err(Error::HandlerMisuse(
                    "a write handler may write only one tag",
                ));
            }
            Some(Frame::Handler { .. }) => {
                return Err(Error::HandlerMisuse(
                    "the tag must be written before the components",
                ));
            }
            Some(Frame::List) => {
                return Err(Error::HandlerMisuse(
                    "a tag cannot be written inside a streamed list",
                ));
            }
            None => {
                return Err(Error::HandlerMisuse(
                    "a tag may only be written by a write handler",
                ));
            }
        }

        self.encode_struct_header(tag, component_count)?;

        if let Some(Frame::Handler { tag: declared, .. }) =
            self.frames.last_mut()
        {
            *declared = Some((tag.to_owned(), component_count));
        }

        Ok(())
    }

    fn close_list(&mut self) -> Result<()> {
        if !matches!(self.frames.last(), Some(Frame::List)) {
            return Err(Error::HandlerMisuse(
                "end_list called without a matching begin",
            ));
        }

        self.frames.pop();
        self.buffer.push(codes::END_COLLECTION);
        Ok(())
    }
}

impl ObjectWriter for Encoder {
    fn write_tag(&mut self, tag: &str, component_count: usize) -> Result<()> {
        let result = self.begin_structure(tag, component_count);
        self.poison(result)
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        self.count_component();

        let result = self.encode_value(value);
        self.poison(result)
    }

    fn write_nil(&mut self) -> Result<()> {
        self.count_component();
        self.buffer.push(codes::NULL);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.count_component();
        self.buffer.push(if value { codes::TRUE } else { codes::FALSE });
        Ok(())
    }

    fn write_int(&mut self, value: i64) -> Result<()> {
        self.count_component();
        primitive::write_int(&mut self.buffer, value);
        Ok(())
    }

    fn write_float(&mut self, value: f32) -> Result<()> {
        self.count_component();
        primitive::write_float(&mut self.buffer, value);
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.count_component();
        primitive::write_double(&mut self.buffer, value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.count_component();
        self.encode_string(value);
        Ok(())
    }

    fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.count_component();
        primitive::write_bytes(&mut self.buffer, value);
        Ok(())
    }

    fn write_list(&mut self, values: &[Value]) -> Result<()> {
        self.count_component();

        let result = self.encode_list(values);
        self.poison(result)
    }

    fn write_map(&mut self, map: &BTreeMap<Value, Value>) -> Result<()> {
        self.count_component();

        let result = self.encode_map(map);
        self.poison(result)
    }

    fn write_set(&mut self, set: &BTreeSet<Value>) -> Result<()> {
        self.count_component();

        let result = self.encode_set(set);
        self.poison(result)
    }

    fn write_cached(&mut self, value: &Value) -> Result<()> {
        self.count_component();

        let result = self.encode_cached(value);
        self.poison(result)
    }

    fn begin_closed_list(&mut self) -> Result<()> {
        self.count_component();
        self.buffer.push(codes::BEGIN_CLOSED_LIST);
        self.frames.push(Frame::List);
        Ok(())
    }

    fn begin_open_list(&mut self) -> Result<()> {
        self.count_component();
        self.buffer.push(codes::BEGIN_OPEN_LIST);
        self.frames.push(Frame::List);
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        let result = self.close_list();
        self.poison(result)
    }

    fn write_dyn(
        &mut self,
        object: &dyn Any,
        type_id: TypeId,
        type_name: &'static str,
    ) -> Result<()> {
        self.count_component();

        let result = self.dispatch(object, type_id, type_name);
        self.poison(result)
    }
}

/// A writing session over one [`ByteSink`].
///
/// The session is closed by [`Writer::write_footer`] or by an I/O failure of
/// the sink; every later write fails with [`Error::SessionClosed`].
#[derive(Debug)]
pub struct Writer<S> {
    output: RawOutput<S>,
    encoder: Encoder,
    closed: bool,
}

impl<S: ByteSink> Writer<S> {
    /// Creates a new session with the default options.
    #[must_use]
    pub fn new(sink: S, registry: Registry) -> Self {
        Self::with_options(sink, registry, WriterOptions::default())
    }

    /// Creates a new session.
    #[must_use]
    pub fn with_options(
        sink: S,
        registry: Registry,
        options: WriterOptions,
    ) -> Self {
        Self {
            output: RawOutput::new(sink),
            encoder: Encoder {
                buffer: Vec::new(),
                caches: WriteCaches::default(),
                frames: Vec::new(),
                registry,
                options,
                poisoned: false,
            },
            closed: false,
        }
    }

    /// Writes one top-level object and flushes it to the sink.
    ///
    /// On failure nothing of the object reaches the sink and the cache
    /// entries it assigned are forgotten, so the session can go on with the
    /// next object. A nested write that failed fails the whole object, even
    /// if its handler went on and returned `Ok`.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionClosed`] if the session is closed.
    /// - [`Error::UnsupportedType`] if no write handler resolves for a type.
    /// - [`Error::ArityMismatch`] or [`Error::HandlerMisuse`] if a handler
    ///   breaks the handler protocol, including dropping the error of a
    ///   nested write.
    /// - [`Error::Io`] if the sink fails; this closes the session.
    pub fn write_object<T: Any>(&mut self, object: &T) -> Result<()> {
        self.ensure_open()?;

        let checkpoint = self.encoder.caches.checkpoint();

        let result = self
            .encoder
            .dispatch(object, TypeId::of::<T>(), type_name::<T>())
            .and_then(|()| {
                if self.encoder.poisoned {
                    Err(Error::HandlerMisuse(
                        "a write handler ignored a failed nested write",
                    ))
                } else {
                    Ok(())
                }
            });

        match result {
            Ok(()) => self.commit(),
            Err(error) => {
                debug!("abandoning `{}`: {error}", type_name::<T>());
                self.encoder.abandon(checkpoint);
                Err(error)
            }
        }
    }

    /// Writes one top-level [`Value`].
    ///
    /// # Errors
    ///
    /// See [`Writer::write_object`].
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.write_object(value)
    }

    /// Clears both caches and tells the reader to do the same.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session is closed or
    /// [`Error::Io`] if the sink fails.
    pub fn reset_caches(&mut self) -> Result<()> {
        self.ensure_open()?;

        self.encoder.buffer.push(codes::RESET_CACHES);
        self.encoder.caches.reset();
        self.commit()?;

        debug!("writer caches reset");
        Ok(())
    }

    /// Appends the footer and closes the session.
    ///
    /// The footer records the number of bytes written since the session
    /// started and their checksum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session is already closed or
    /// [`Error::Io`] if the sink fails.
    pub fn write_footer(&mut self) -> Result<()> {
        self.ensure_open()?;

        let mut footer = Vec::with_capacity(12);
        primitive::write_raw(&mut footer, u64::from(codes::FOOTER_MAGIC), 4);
        primitive::write_raw(&mut footer, self.output.bytes_written(), 4);
        primitive::write_raw(&mut footer, u64::from(self.output.checksum()), 4);

        self.closed = true;

        if let Err(error) = self
            .output
            .append_unaccounted(&footer)
            .and_then(|()| self.output.flush())
        {
            warn!("failed to write the footer: {error}");
            return Err(error);
        }

        debug!(
            "footer written after {} bytes, checksum {:#010x}",
            self.output.bytes_written(),
            self.output.checksum()
        );

        self.output.reset();
        self.encoder.caches.reset();

        Ok(())
    }

    /// Returns `true` if the session no longer accepts writes.
    #[must_use]
    pub const fn is_closed(&self) -> bool { self.closed }

    /// Gets the options of the session.
    #[must_use]
    pub const fn options(&self) -> &WriterOptions { &self.encoder.options }

    /// Gets the registry of the session.
    #[must_use]
    pub const fn registry(&self) -> &Registry { &self.encoder.registry }

    /// Gets a reference to the underlying sink.
    #[must_use]
    pub const fn sink(&self) -> &S { self.output.sink() }

    /// Flushes and returns the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the final flush fails.
    pub fn finish(mut self) -> Result<S> {
        self.output.flush()?;
        Ok(self.output.into_inner())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn commit(&mut self) -> Result<()> {
        let len = self.encoder.buffer.len();
        let result = self
            .output
            .append(&self.encoder.buffer)
            .and_then(|()| self.output.flush());

        self.encoder.buffer.clear();

        match result {
            Ok(()) => {
                trace!("committed {len} bytes");
                Ok(())
            }
            Err(error) => {
                warn!("closing the writer: {error}");
                self.closed = true;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod test;
