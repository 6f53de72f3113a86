//! Entry (row) implementation for BCSV tables

use std::collections::HashMap;

use crate::field::FieldValue;
use crate::hash::HashTable;

/// A key that can be used to access field values
#[derive(Debug, Clone)]
pub enum FieldKey {
    /// Access by hash value
    Hash(u32),
    /// Access by field name (will be hashed)
    Name(String),
}

impl FieldKey {
    /// Resolve this key to a field hash
    pub fn resolve<H: HashTable>(&self, hash_table: &H) -> u32 {
        match self {
            FieldKey::Hash(hash) => *hash,
            FieldKey::Name(name) => hash_table.calc(name),
        }
    }

    /// Label used in error messages
    pub fn label<H: HashTable>(&self, hash_table: &H) -> String {
        match self {
            FieldKey::Hash(hash) => hash_table.find(*hash),
            FieldKey::Name(name) => name.clone(),
        }
    }
}

impl From<u32> for FieldKey {
    fn from(hash: u32) -> Self {
        FieldKey::Hash(hash)
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        FieldKey::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        FieldKey::Name(name)
    }
}

impl From<&String> for FieldKey {
    fn from(name: &String) -> Self {
        FieldKey::Name(name.clone())
    }
}

/// An entry (row) in a BCSV table
///
/// Holds one value per schema field, keyed by field hash
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    data: HashMap<u32, FieldValue>,
}

impl Entry {
    /// Create a new empty entry
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Create an entry with pre-allocated capacity
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
        }
    }

    /// Get a value by hash
    pub fn get_by_hash(&self, hash: u32) -> Option<&FieldValue> {
        self.data.get(&hash)
    }

    pub(crate) fn get_mut_by_hash(&mut self, hash: u32) -> Option<&mut FieldValue> {
        self.data.get_mut(&hash)
    }

    /// Set a value by hash
    pub(crate) fn set_by_hash(&mut self, hash: u32, value: FieldValue) {
        self.data.insert(hash, value);
    }

    pub(crate) fn remove_by_hash(&mut self, hash: u32) -> Option<FieldValue> {
        self.data.remove(&hash)
    }

    /// Check if this entry contains a field by hash
    pub fn contains_hash(&self, hash: u32) -> bool {
        self.data.contains_key(&hash)
    }

    /// Get the number of fields in this entry
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this entry is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over all hash-value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &FieldValue)> {
        self.data.iter()
    }
}
