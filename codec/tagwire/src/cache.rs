//! The per-session caches that replace repeated values and structure
//! definitions with short back-references.
//!
//! Both sides hand out indices in the same order: an index is taken when a
//! cache-eligible value *starts*, before its payload, so nested
//! cache-eligible values never reorder the sequence.

use std::{collections::HashMap, hash::Hash};

use log::trace;

use crate::{
    error::{Corruption, Result},
    value::Value,
};

/// Assigns consecutive indices to distinct keys on the write side.
///
/// The table can be truncated back to an earlier length, which is how a
/// failed top-level write forgets the entries it assigned.
#[derive(Debug, Clone)]
pub struct Interner<K> {
    indices: HashMap<K, usize>,
    len: usize,
}

impl<K> Default for Interner<K> {
    fn default() -> Self { Self { indices: HashMap::new(), len: 0 } }
}

impl<K: Hash + Eq> Interner<K> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Gets the index previously assigned to `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<usize> {
        self.indices.get(key).copied()
    }

    /// Assigns the next index to `key`, which must not be present.
    pub fn assign(&mut self, key: K) -> usize {
        let index = self.len;

        self.indices.insert(key, index);
        self.len += 1;

        index
    }

    /// The number of indices assigned.
    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    /// Returns `true` if no index has been assigned.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Forgets every index at or past `len`.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.indices.retain(|_, index| *index < len);
            self.len = len;
        }
    }

    /// Forgets every index.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.len = 0;
    }
}

/// The key of a structure definition: its tag and component count.
pub type StructKey = (String, usize);

/// The write side of both caches.
#[derive(Debug, Clone, Default)]
pub struct WriteCaches {
    priority: Interner<Value>,
    structs: Interner<StructKey>,
}

/// The lengths of the write caches at some point, used to roll them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    priority: usize,
    structs: usize,
}

impl WriteCaches {
    /// Gets the priority cache index of `value`.
    #[must_use]
    pub fn priority_index(&self, value: &Value) -> Option<usize> {
        self.priority.get(value)
    }

    /// Assigns the next priority cache index to `value`.
    pub fn assign_priority(&mut self, value: Value) -> usize {
        let index = self.priority.assign(value);
        trace!("priority cache: assigned index {index}");

        index
    }

    /// Gets the struct cache index of a definition.
    #[must_use]
    pub fn struct_index(&self, key: &StructKey) -> Option<usize> {
        self.structs.get(key)
    }

    /// Assigns the next struct cache index to a definition.
    pub fn assign_struct(&mut self, key: StructKey) -> usize {
        let index = self.structs.assign(key);
        trace!("struct cache: assigned index {index}");

        index
    }

    /// Records the current lengths of both caches.
    #[must_use]
    pub const fn checkpoint(&self) -> Checkpoint {
        Checkpoint { priority: self.priority.len(), structs: self.structs.len() }
    }

    /// Forgets everything assigned after `checkpoint` was taken.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.priority.truncate(checkpoint.priority);
        self.structs.truncate(checkpoint.structs);
    }

    /// Clears both caches.
    pub fn reset(&mut self) {
        self.priority.clear();
        self.structs.clear();
    }
}

/// The read side of both caches.
#[derive(Debug, Clone, Default)]
pub struct ReadCaches {
    priority: Vec<Option<Value>>,
    structs: Vec<StructKey>,
}

impl ReadCaches {
    /// Reserves the next priority cache index for a value about to be read.
    pub fn reserve_priority(&mut self) -> usize {
        let index = self.priority.len();
        self.priority.push(None);
        trace!("priority cache: reserved index {index}");

        index
    }

    /// Stores the value read for a reserved index.
    pub fn fill_priority(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.priority.get_mut(index) {
            *slot = Some(value);
        }
    }

    /// Resolves a priority cache reference.
    ///
    /// # Errors
    ///
    /// Returns [`Corruption::CacheIndexOutOfRange`] for an unassigned index
    /// and [`Corruption::CacheEntryUnderConstruction`] for an index whose
    /// value is still being read.
    pub fn priority(&self, index: usize) -> Result<&Value> {
        match self.priority.get(index) {
            Some(Some(value)) => Ok(value),
            Some(None) => {
                Err(Corruption::CacheEntryUnderConstruction(index).into())
            }
            None => Err(Corruption::CacheIndexOutOfRange {
                index,
                len: self.priority.len(),
            }
            .into()),
        }
    }

    /// Assigns the next struct cache index to a definition just read.
    pub fn define_struct(&mut self, key: StructKey) -> usize {
        let index = self.structs.len();
        self.structs.push(key);
        trace!("struct cache: assigned index {index}");

        index
    }

    /// Resolves a struct cache reference.
    ///
    /// # Errors
    ///
    /// Returns [`Corruption::StructIndexOutOfRange`] for an unassigned index.
    pub fn struct_definition(&self, index: usize) -> Result<&StructKey> {
        self.structs.get(index).ok_or_else(|| {
            Corruption::StructIndexOutOfRange { index, len: self.structs.len() }
                .into()
        })
    }

    /// Clears both caches.
    pub fn reset(&mut self) {
        self.priority.clear();
        self.structs.clear();
    }
}

/// Returns `true` if `value` may ever take a priority cache slot.
///
/// Values whose encoding is already a single byte gain nothing from a
/// reference.
#[must_use]
pub fn is_cacheable(value: &Value) -> bool {
    match value {
        Value::Nil | Value::Bool(_) => false,
        Value::Int(int) => !(-1..=63).contains(int),
        Value::Float64(double) => {
            let bits = double.to_bits();
            bits != 0.0f64.to_bits() && bits != 1.0f64.to_bits()
        }
        Value::String(string) => !string.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod test;
