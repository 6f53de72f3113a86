//! Typed, fail-soft access to entry values
//!
//! Getters return the type's zero value (or [`NULL_STRING`] for strings) when the
//! field is absent, the row does not exist, or the field's declared type does not
//! match the accessor. Setters return `false` and change nothing in those cases.

use tracing::debug;

use crate::bcsv::BcsvIO;
use crate::entry::FieldKey;
use crate::field::{FieldType, FieldValue};
use crate::hash::HashTable;
use crate::io::{encoded_len, Encoding};

/// Value returned by string getters when the field cannot be read
pub const NULL_STRING: &str = "(null)";

fn is_word_integer(field_type: &FieldType) -> bool {
    matches!(*field_type, FieldType::Integer | FieldType::Integer2)
}

fn is_short(field_type: &FieldType) -> bool {
    *field_type == FieldType::Short
}

fn is_byte(field_type: &FieldType) -> bool {
    *field_type == FieldType::Byte
}

fn is_float(field_type: &FieldType) -> bool {
    *field_type == FieldType::Float
}

/// Cut a string so it encodes to at most `limit` bytes, keeping whole characters
pub(crate) fn truncate_to(mut value: String, limit: usize, encoding: Encoding) -> String {
    let len = encoded_len(&value, encoding);
    if len <= limit {
        return value;
    }

    let mut used = 0;
    let mut end = 0;
    let mut buf = [0u8; 4];
    for (index, ch) in value.char_indices() {
        let width = encoded_len(ch.encode_utf8(&mut buf), encoding);
        if used + width > limit {
            break;
        }
        used += width;
        end = index + ch.len_utf8();
    }

    debug!(len, limit, "truncating inline string");
    value.truncate(end);
    value
}

impl<H: HashTable> BcsvIO<H> {
    fn read_value(
        &self,
        entry_index: usize,
        key: FieldKey,
        accepts: fn(&FieldType) -> bool,
    ) -> Option<&FieldValue> {
        let hash = key.resolve(self.hash_table());
        let field = self.schema.find(hash).filter(|f| accepts(&f.field_type))?;
        self.entries.get(entry_index)?.get_by_hash(field.hash)
    }

    fn write_value(
        &mut self,
        entry_index: usize,
        key: FieldKey,
        accepts: fn(&FieldType) -> bool,
        value: FieldValue,
    ) -> bool {
        let hash = key.resolve(self.hash_table());
        let Some(field) = self.schema.find(hash).filter(|f| accepts(&f.field_type)) else {
            return false;
        };

        let value = match (field.field_type, value) {
            (_, FieldValue::U32(v)) => FieldValue::U32(field.truncate(v)),
            (FieldType::String, FieldValue::Str(s)) => {
                FieldValue::Str(truncate_to(s, self.schema.string_size(), self.options().encoding))
            }
            (_, other) => other,
        };

        match self
            .entries
            .get_mut(entry_index)
            .and_then(|entry| entry.get_mut_by_hash(hash))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn read_u32(&self, entry_index: usize, key: FieldKey, accepts: fn(&FieldType) -> bool) -> u32 {
        self.read_value(entry_index, key, accepts)
            .and_then(FieldValue::as_u32)
            .unwrap_or(0)
    }

    /// Read an `Integer`/`Integer2` field as an unsigned int
    ///
    /// # Arguments
    /// - `entry_index` - The index of the entry to read
    /// - `key` - The field name or its precomputed hash
    ///
    /// # Returns
    /// - The stored value, or 0 if the row or field is missing or the field is not an `Integer`/`Integer2`
    pub fn get_unsigned_int(&self, entry_index: usize, key: impl Into<FieldKey>) -> u32 {
        self.read_u32(entry_index, key.into(), is_word_integer)
    }

    /// Read an `Integer`/`Integer2` field as a signed int; 0 if unavailable
    pub fn get_signed_int(&self, entry_index: usize, key: impl Into<FieldKey>) -> i32 {
        self.read_u32(entry_index, key.into(), is_word_integer) as i32
    }

    /// Read a `Short` field; 0 if unavailable
    pub fn get_short(&self, entry_index: usize, key: impl Into<FieldKey>) -> u16 {
        self.read_u32(entry_index, key.into(), is_short) as u16
    }

    /// Read a `Byte` field; 0 if unavailable
    pub fn get_char(&self, entry_index: usize, key: impl Into<FieldKey>) -> u8 {
        self.read_u32(entry_index, key.into(), is_byte) as u8
    }

    /// Read a `Float` field; 0.0 if unavailable
    pub fn get_float(&self, entry_index: usize, key: impl Into<FieldKey>) -> f32 {
        self.read_value(entry_index, key.into(), is_float)
            .and_then(FieldValue::as_f32)
            .unwrap_or(0.0)
    }

    /// Read any integer-family field as a flag; false if unavailable
    pub fn get_boolean(&self, entry_index: usize, key: impl Into<FieldKey>) -> bool {
        self.read_u32(entry_index, key.into(), FieldType::is_integer) != 0
    }

    /// Read a `String`/`StringOffset` field
    ///
    /// # Arguments
    /// - `entry_index` - The index of the entry to read
    /// - `key` - The field name or its precomputed hash
    ///
    /// # Returns
    /// - The stored string, or [`NULL_STRING`] if the row or field is missing or the field holds no string
    pub fn get_string(&self, entry_index: usize, key: impl Into<FieldKey>) -> String {
        self.read_value(entry_index, key.into(), FieldType::is_string)
            .and_then(FieldValue::as_str)
            .unwrap_or(NULL_STRING)
            .to_string()
    }

    /// Write an `Integer`/`Integer2` field, keeping only the bits its mask covers
    ///
    /// # Arguments
    /// - `entry_index` - The index of the entry to write
    /// - `key` - The field name or its precomputed hash
    /// - `value` - The new value
    ///
    /// # Returns
    /// - `true` if the value was stored, `false` if the row or field is missing or of another type
    pub fn set_unsigned_int(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: u32) -> bool {
        self.write_value(entry_index, key.into(), is_word_integer, FieldValue::U32(value))
    }

    /// Write an `Integer`/`Integer2` field from a signed value
    pub fn set_signed_int(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: i32) -> bool {
        self.write_value(entry_index, key.into(), is_word_integer, FieldValue::U32(value as u32))
    }

    /// Write a `Short` field
    pub fn set_short(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: u16) -> bool {
        self.write_value(entry_index, key.into(), is_short, FieldValue::U32(value as u32))
    }

    /// Write a `Byte` field
    pub fn set_char(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: u8) -> bool {
        self.write_value(entry_index, key.into(), is_byte, FieldValue::U32(value as u32))
    }

    /// Write a `Float` field
    pub fn set_float(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: f32) -> bool {
        self.write_value(entry_index, key.into(), is_float, FieldValue::F32(value))
    }

    /// Write 1 or 0 into any integer-family field
    pub fn set_boolean(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: bool) -> bool {
        self.write_value(entry_index, key.into(), FieldType::is_integer, FieldValue::U32(value as u32))
    }

    /// Write a `String`/`StringOffset` field
    ///
    /// Inline strings whose encoded form is longer than the schema's string size
    /// are cut to fit, on a character boundary
    ///
    /// # Returns
    /// - `true` if the value was stored, `false` if the row or field is missing or holds no string
    pub fn set_string(&mut self, entry_index: usize, key: impl Into<FieldKey>, value: impl Into<String>) -> bool {
        self.write_value(entry_index, key.into(), FieldType::is_string, FieldValue::Str(value.into()))
    }
}
