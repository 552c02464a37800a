//! The handler registry: which write handler encodes a runtime type and
//! which read handler decodes a tag.
//!
//! # Example
//!
//! ``` rust
//! use tagwire::{
//!     reader::Reader,
//!     registry::{ReadHandlers, Registry, WriteHandlers},
//!     value::{Record, Value},
//!     writer::Writer,
//! };
//!
//! struct Point {
//!     x: i64,
//!     y: i64,
//! }
//!
//! let mut write = WriteHandlers::new();
//! assert!(write.register::<Point, _>("point", |writer, point| {
//!     writer.write_tag("point", 2)?;
//!     writer.write_int(point.x)?;
//!     writer.write_int(point.y)
//! }));
//!
//! let mut read = ReadHandlers::new();
//! assert!(read.register("point", |reader, tag, _| {
//!     let x = reader.read_int()?;
//!     let y = reader.read_int()?;
//!
//!     Ok(Value::Extended(Record::new(tag, vec![x.into(), y.into()])))
//! }));
//!
//! let registry = Registry::new(write, read);
//!
//! let mut writer = Writer::new(Vec::new(), registry.clone());
//! writer.write_object(&Point { x: 1, y: 2 }).unwrap();
//!
//! let bytes = writer.finish().unwrap();
//! let mut reader = Reader::new(&bytes[..], registry);
//!
//! assert_eq!(
//!     reader.read_object().unwrap(),
//!     Value::Extended(Record::new("point", vec![1.into(), 2.into()]))
//! );
//! ```

use std::{
    any::{Any, TypeId},
    collections::{hash_map::Entry, HashMap},
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use derive_new::new;
use getset::{CopyGetters, Getters};

use crate::{
    codes,
    error::{Error, Result},
    reader::ObjectReader,
    value::{Record, Value},
    writer::ObjectWriter,
};

pub mod builtin;

/// Encodes objects of one runtime type.
pub trait WriteHandler: Send + Sync {
    /// Writes `object` through `writer`.
    ///
    /// # Errors
    ///
    /// Returns whatever the writer fails with.
    fn write(&self, writer: &mut dyn ObjectWriter, object: &dyn Any)
        -> Result<()>;
}

impl<F> WriteHandler for F
where
    F: Fn(&mut dyn ObjectWriter, &dyn Any) -> Result<()> + Send + Sync,
{
    fn write(
        &self,
        writer: &mut dyn ObjectWriter,
        object: &dyn Any,
    ) -> Result<()> {
        self(writer, object)
    }
}

/// Decodes the structures carrying one tag.
pub trait ReadHandler: Send + Sync {
    /// Reads exactly `component_count` components from `reader` and builds
    /// the value.
    ///
    /// # Errors
    ///
    /// Returns whatever the reader fails with.
    fn read(
        &self,
        reader: &mut dyn ObjectReader,
        tag: &str,
        component_count: usize,
    ) -> Result<Value>;
}

impl<F> ReadHandler for F
where
    F: Fn(&mut dyn ObjectReader, &str, usize) -> Result<Value> + Send + Sync,
{
    fn read(
        &self,
        reader: &mut dyn ObjectReader,
        tag: &str,
        component_count: usize,
    ) -> Result<Value> {
        self(reader, tag, component_count)
    }
}

struct Typed<T, F> {
    handler: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Any, F> WriteHandler for Typed<T, F>
where
    F: Fn(&mut dyn ObjectWriter, &T) -> Result<()> + Send + Sync,
{
    fn write(
        &self,
        writer: &mut dyn ObjectWriter,
        object: &dyn Any,
    ) -> Result<()> {
        let object = object.downcast_ref::<T>().ok_or(
            Error::UnsupportedType { type_name: std::any::type_name::<T>() },
        )?;

        (self.handler)(writer, object)
    }
}

/// The tag and handler a runtime type resolves to.
#[derive(Clone, Getters, new)]
pub struct WriteEntry {
    /// The name the handler is known by.
    #[get = "pub"]
    #[new(into)]
    tag: String,

    /// The handler itself.
    #[get = "pub"]
    handler: Arc<dyn WriteHandler>,
}

impl Debug for WriteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteEntry")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

type Upcast = dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync;

fn upcast_fn<F>(upcast: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any>,
{
    upcast
}

/// The declared immediate supertype of a runtime type.
#[derive(Clone, CopyGetters)]
pub struct Supertype {
    /// The type identifier of the supertype.
    #[get_copy = "pub"]
    type_id: TypeId,

    upcast: Arc<Upcast>,
}

impl Supertype {
    /// Declares `Super` as the immediate supertype of `Sub`.
    #[must_use]
    pub fn of<Sub: Any, Super: Any>(upcast: fn(&Sub) -> &Super) -> Self {
        Self {
            type_id: TypeId::of::<Super>(),
            upcast: Arc::new(upcast_fn(move |object| {
                object
                    .downcast_ref::<Sub>()
                    .map(|sub| upcast(sub) as &dyn Any)
            })),
        }
    }

    /// Views `object` as its supertype.
    ///
    /// Returns `None` if `object` is not of the subtype this was declared
    /// for.
    #[must_use]
    pub fn upcast<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.upcast)(object)
    }
}

impl Debug for Supertype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supertype")
            .field("type_id", &self.type_id)
            .finish_non_exhaustive()
    }
}

/// Looks up write handlers by runtime type.
///
/// Implemented by [`WriteHandlers`]; any other type implementing it acts as a
/// capability object answering lookups on its own terms.
pub trait WriteLookup: Send + Sync {
    /// Gets the entry registered for exactly this type.
    fn value_at(&self, type_id: TypeId) -> Option<WriteEntry>;

    /// Gets the declared immediate supertype of this type.
    fn supertype_of(&self, type_id: TypeId) -> Option<Supertype>;
}

/// Looks up read handlers by tag.
pub trait ReadLookup: Send + Sync {
    /// Gets the handler registered for exactly this tag.
    fn value_at(&self, tag: &str) -> Option<Arc<dyn ReadHandler>>;
}

impl<T: WriteLookup + ?Sized> WriteLookup for Arc<T> {
    fn value_at(&self, type_id: TypeId) -> Option<WriteEntry> {
        (**self).value_at(type_id)
    }

    fn supertype_of(&self, type_id: TypeId) -> Option<Supertype> {
        (**self).supertype_of(type_id)
    }
}

impl<T: ReadLookup + ?Sized> ReadLookup for Arc<T> {
    fn value_at(&self, tag: &str) -> Option<Arc<dyn ReadHandler>> {
        (**self).value_at(tag)
    }
}

/// A map-backed [`WriteLookup`].
#[derive(Debug, Clone, Default)]
pub struct WriteHandlers {
    entries: HashMap<TypeId, WriteEntry>,
    supertypes: HashMap<TypeId, Supertype>,
}

impl WriteHandlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers the handler of `T`.
    ///
    /// Returns `false`, leaving the table untouched, if `T` already has a
    /// handler.
    #[must_use]
    pub fn register<T: Any, F>(
        &mut self,
        tag: impl Into<String>,
        handler: F,
    ) -> bool
    where
        F: Fn(&mut dyn ObjectWriter, &T) -> Result<()> + Send + Sync + 'static,
    {
        self.register_entry(
            TypeId::of::<T>(),
            WriteEntry::new(
                tag,
                Arc::new(Typed { handler, _phantom: PhantomData }),
            ),
        )
    }

    /// Registers a type-erased handler for the given type.
    ///
    /// Returns `false`, leaving the table untouched, if the type already has
    /// a handler.
    #[must_use]
    pub fn register_entry(
        &mut self,
        type_id: TypeId,
        entry: WriteEntry,
    ) -> bool {
        match self.entries.entry(type_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        }
    }

    /// Declares `Super` as the immediate supertype of `Sub`, so that `Sub`
    /// is written by the handler of `Super` when it has none of its own.
    ///
    /// Only this one level is followed: the supertype of `Super` is never
    /// consulted for `Sub`.
    ///
    /// Returns `false` if `Sub` already has a declared supertype.
    #[must_use]
    pub fn register_supertype<Sub: Any, Super: Any>(
        &mut self,
        upcast: fn(&Sub) -> &Super,
    ) -> bool {
        match self.supertypes.entry(TypeId::of::<Sub>()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Supertype::of(upcast));
                true
            }
        }
    }

    /// The number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl WriteLookup for WriteHandlers {
    fn value_at(&self, type_id: TypeId) -> Option<WriteEntry> {
        self.entries.get(&type_id).cloned()
    }

    fn supertype_of(&self, type_id: TypeId) -> Option<Supertype> {
        self.supertypes.get(&type_id).cloned()
    }
}

/// A map-backed [`ReadLookup`].
#[derive(Clone, Default)]
pub struct ReadHandlers {
    entries: HashMap<String, Arc<dyn ReadHandler>>,
}

impl ReadHandlers {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers the handler of `tag`.
    ///
    /// Returns `false`, leaving the table untouched, if the tag is reserved
    /// for a built-in type or already has a handler.
    #[must_use]
    pub fn register<F>(&mut self, tag: impl Into<String>, handler: F) -> bool
    where
        F: Fn(&mut dyn ObjectReader, &str, usize) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.register_handler(tag, Arc::new(handler))
    }

    /// Registers a type-erased handler for `tag`.
    ///
    /// Returns `false`, leaving the table untouched, if the tag is reserved
    /// for a built-in type or already has a handler.
    #[must_use]
    pub fn register_handler(
        &mut self,
        tag: impl Into<String>,
        handler: Arc<dyn ReadHandler>,
    ) -> bool {
        let tag = tag.into();
        if codes::is_reserved_tag(&tag) {
            return false;
        }

        match self.entries.entry(tag) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(handler);
                true
            }
        }
    }

    /// Registers a handler decoding `tag` as a generic [`Record`].
    #[must_use]
    pub fn register_record(&mut self, tag: impl Into<String>) -> bool {
        self.register(tag, read_record)
    }

    /// The number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl ReadLookup for ReadHandlers {
    fn value_at(&self, tag: &str) -> Option<Arc<dyn ReadHandler>> {
        self.entries.get(tag).cloned()
    }
}

impl Debug for ReadHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Reads `component_count` components into a [`Record`].
///
/// # Errors
///
/// Returns whatever the reader fails with.
pub fn read_record(
    reader: &mut dyn ObjectReader,
    tag: &str,
    component_count: usize,
) -> Result<Value> {
    let components = (0..component_count)
        .map(|_| reader.read_value())
        .collect::<Result<Vec<_>>>()?;

    Ok(Value::Extended(Record::new(tag, components)))
}

/// Two lookups consulted in order: `first`, then `second`.
///
/// Neither lookup is modified; the chain only changes which answer wins.
#[derive(Debug, Clone, new)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: WriteLookup, B: WriteLookup> WriteLookup for Chain<A, B> {
    fn value_at(&self, type_id: TypeId) -> Option<WriteEntry> {
        self.first.value_at(type_id).or_else(|| self.second.value_at(type_id))
    }

    fn supertype_of(&self, type_id: TypeId) -> Option<Supertype> {
        self.first
            .supertype_of(type_id)
            .or_else(|| self.second.supertype_of(type_id))
    }
}

impl<A: ReadLookup, B: ReadLookup> ReadLookup for Chain<A, B> {
    fn value_at(&self, tag: &str) -> Option<Arc<dyn ReadHandler>> {
        self.first.value_at(tag).or_else(|| self.second.value_at(tag))
    }
}

/// The immutable lookups a session runs with.
///
/// Custom write lookups are kept apart from the built-in write handlers, which
/// are only consulted after them. Cloning is cheap, and a registry can be
/// shared by any number of sessions.
#[derive(Clone)]
pub struct Registry {
    custom: Arc<dyn WriteLookup>,
    builtin: Arc<dyn WriteLookup>,
    read: Arc<dyn ReadLookup>,
}

impl Registry {
    /// Creates a registry consulting the given lookups before the built-in
    /// handlers.
    #[must_use]
    pub fn new(
        write: impl WriteLookup + 'static,
        read: impl ReadLookup + 'static,
    ) -> Self {
        Self {
            custom: Arc::new(write),
            builtin: Arc::new(builtin::write_handlers()),
            read: Arc::new(read),
        }
    }

    /// Creates a registry holding only the built-in handlers.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(WriteHandlers::new(), ReadHandlers::new())
    }

    /// Finds the write handler of a runtime type.
    ///
    /// The custom lookup is asked for the exact type first. Failing that,
    /// the supertype it declares for the type is followed once: its handler
    /// comes from the custom lookup or else the built-in one, and `object`
    /// is returned viewed as that supertype. Only then are the built-in
    /// handlers asked for the exact type.
    #[must_use]
    pub fn resolve_write<'a>(
        &self,
        type_id: TypeId,
        object: &'a dyn Any,
    ) -> Option<(WriteEntry, &'a dyn Any)> {
        if let Some(entry) = self.custom.value_at(type_id) {
            return Some((entry, object));
        }

        if let Some(supertype) = self.custom.supertype_of(type_id) {
            let entry = self
                .custom
                .value_at(supertype.type_id())
                .or_else(|| self.builtin.value_at(supertype.type_id()));

            if let (Some(entry), Some(object)) =
                (entry, supertype.upcast(object))
            {
                return Some((entry, object));
            }
        }

        self.builtin.value_at(type_id).map(|entry| (entry, object))
    }

    /// Finds the read handler of a tag; exact matches only.
    #[must_use]
    pub fn read_handler(&self, tag: &str) -> Option<Arc<dyn ReadHandler>> {
        self.read.value_at(tag)
    }
}

impl Default for Registry {
    fn default() -> Self { Self::builtin() }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test;
