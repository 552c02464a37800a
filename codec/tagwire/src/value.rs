//! Contains the definition of [`Value`], the closed set of shapes the codec
//! moves across the wire.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    hash::{Hash, Hasher},
};

use enum_as_inner::EnumAsInner;
use getset::Getters;

pub mod big_int;

pub use big_int::BigInt;

/// A user-defined tagged structure with a fixed number of components.
///
/// This is the generic in-memory form of an extended value: the tag names
/// the structure and the components are its ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Getters)]
pub struct Record {
    /// The tag naming the structure.
    #[get = "pub"]
    tag: String,

    /// The ordered components of the structure.
    #[get = "pub"]
    components: Vec<Value>,
}

impl Record {
    /// Creates a new record.
    #[must_use]
    pub fn new(tag: impl Into<String>, components: Vec<Value>) -> Self {
        Self { tag: tag.into(), components }
    }

    /// Destructures the record into its tag and components.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.tag, self.components)
    }
}

/// A value that can be written to and read from a stream.
///
/// Values have a total order, equality and hash so that any value can be a
/// map key or a set element. Floating point numbers compare with
/// [`f64::total_cmp`], which makes two floats equal exactly when they are
/// bit-identical.
#[derive(Debug, Clone, EnumAsInner)]
#[allow(missing_docs)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<Value, Value>),
    Set(BTreeSet<Value>),
    Extended(Record),
}

impl Value {
    /// A short human readable name of the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Float32(_) => "float",
            Self::Float64(_) => "double",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Extended(_) => "extended",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Nil => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::BigInt(_) => 3,
            Self::Float32(_) => 4,
            Self::Float64(_) => 5,
            Self::Bytes(_) => 6,
            Self::String(_) => 7,
            Self::List(_) => 8,
            Self::Map(_) => 9,
            Self::Set(_) => 10,
            Self::Extended(_) => 11,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Nil, Self::Nil) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::BigInt(a), Self::BigInt(b)) => a.cmp(b),
            (Self::Float32(a), Self::Float32(b)) => a.total_cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::Extended(a), Self::Extended(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);

        match self {
            Self::Nil => {}
            Self::Bool(value) => value.hash(state),
            Self::Int(value) => value.hash(state),
            Self::BigInt(value) => value.hash(state),
            Self::Float32(value) => value.to_bits().hash(state),
            Self::Float64(value) => value.to_bits().hash(state),
            Self::Bytes(value) => value.hash(state),
            Self::String(value) => value.hash(state),
            Self::List(value) => value.hash(state),
            Self::Map(value) => value.hash(state),
            Self::Set(value) => value.hash(state),
            Self::Extended(value) => value.hash(state),
        }
    }
}

macro_rules! impl_from_small_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self { Self::Int(i64::from(value)) }
            }
        )*
    };
}

impl_from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map_or_else(|_| Self::BigInt(BigInt::from(value)), Self::Int)
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        i64::try_from(value)
            .map_or_else(|_| Self::BigInt(BigInt::from(value)), Self::Int)
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        i64::try_from(value)
            .map_or_else(|_| Self::BigInt(BigInt::from(value)), Self::Int)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self { Self::from(value as i128) }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self { Self::from(value as u128) }
}

impl From<()> for Value {
    fn from((): ()) -> Self { Self::Nil }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self { Self::Float32(value) }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self { Self::Float64(value) }
}

impl From<String> for Value {
    fn from(value: String) -> Self { Self::String(value) }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self { Self::String(value.to_owned()) }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self { Self::Bytes(value) }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self { Self::Bytes(value.to_vec()) }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self { Self::List(value) }
}

impl From<BTreeMap<Self, Self>> for Value {
    fn from(value: BTreeMap<Self, Self>) -> Self { Self::Map(value) }
}

impl From<BTreeSet<Self>> for Value {
    fn from(value: BTreeSet<Self>) -> Self { Self::Set(value) }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self { Self::BigInt(value) }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self { Self::Extended(value) }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl FromIterator<Self> for Value {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        Self::List(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod arbitrary;

#[cfg(test)]
mod test;
