use tracing::debug;

use crate::entry::{Entry, FieldKey};
use crate::error::{BcsvError, Result};
use crate::field::{FieldInfo, FieldType, FieldValue};
use crate::hash::HashTable;
use crate::io::{IoOptions, FIELD_DEF_SIZE, HEADER_SIZE};
use crate::schema::FieldSchema;

/// The in-memory representation of a BCSV/JMP table: a field schema and the rows it describes
///
/// Every entry holds exactly one value per schema field. Schema mutations
/// recompute the layout and keep all entries complete.
///
/// Field format as documented on [this page](https://www.lumasworkshop.com/wiki/BCSV_(File_format))
#[derive(Debug)]
pub struct BcsvIO<H: HashTable> {
    /// The hash table used for field name lookups
    hash_table: H,
    /// Fields and their layout
    pub(crate) schema: FieldSchema,
    /// List of entries
    pub(crate) entries: Vec<Entry>,
    /// Byte order and string encoding used by load and save
    options: IoOptions,
}

impl<H: HashTable> BcsvIO<H> {
    /// Create a new empty table with the given hash table
    ///
    /// # Arguments
    /// - `hash_table` - The hash table to use for field name lookups
    ///
    /// # Returns
    /// - A `BcsvIO` with no fields, no entries and the default [`IoOptions`]
    pub fn new(hash_table: H) -> Self {
        Self::with_options(hash_table, IoOptions::default())
    }

    /// Create a new empty table using explicit I/O options
    pub fn with_options(hash_table: H, options: IoOptions) -> Self {
        Self {
            hash_table,
            schema: FieldSchema::new(),
            entries: Vec::new(),
            options,
        }
    }

    /// Get a reference to the hash table
    pub fn hash_table(&self) -> &H {
        &self.hash_table
    }

    /// Get a mutable reference to the hash table
    pub fn hash_table_mut(&mut self) -> &mut H {
        &mut self.hash_table
    }

    /// Byte order and string encoding in use
    pub fn options(&self) -> &IoOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: IoOptions) {
        self.options = options;
    }

    /// Get the field schema
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Get the number of fields (columns)
    pub fn field_count(&self) -> usize {
        self.schema.len()
    }

    /// Get the number of entries (rows)
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if entries are empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of a single entry in bytes
    pub fn entry_size(&self) -> u32 {
        self.schema.entry_size()
    }

    /// Width of inline strings in bytes
    pub fn string_size(&self) -> usize {
        self.schema.string_size()
    }

    /// Change the width of inline strings (16 to 32 bytes)
    ///
    /// Also used before [`BcsvIO::load`] for files written with narrower inline strings
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if the new width pushes a field past byte 0xFFFF
    pub fn set_string_size(&mut self, string_size: usize) -> Result<()> {
        self.schema.set_string_size(string_size)
    }

    /// Size of a file holding `row_count` entries with the current layout,
    /// not counting the string table
    ///
    /// # Arguments
    /// - `row_count` - The number of entries the file would hold
    ///
    /// # Returns
    /// - Header, field table and entry block size in bytes
    pub fn projected_file_size(&self, row_count: usize) -> usize {
        HEADER_SIZE + self.schema.len() * FIELD_DEF_SIZE + row_count * self.entry_size() as usize
    }

    /// Get an iterator over all fields
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.schema.fields()
    }

    /// Resolve a name or hash to the field's hash
    pub fn field_hash(&self, key: impl Into<FieldKey>) -> u32 {
        key.into().resolve(&self.hash_table)
    }

    /// Find a field by name or hash
    ///
    /// # Arguments
    /// - `key` - The field name or its precomputed hash
    ///
    /// # Returns
    /// - `Some(&FieldInfo)` if the field exists, `None` otherwise
    pub fn find_field(&self, key: impl Into<FieldKey>) -> Option<&FieldInfo> {
        self.schema.find(self.field_hash(key))
    }

    /// Find a field by name or hash, failing when it does not exist
    ///
    /// # Errors
    /// - `BcsvError::FieldNotFound` if the schema has no such field
    pub fn require_field(&self, key: impl Into<FieldKey>) -> Result<&FieldInfo> {
        let key = key.into();
        let hash = key.resolve(&self.hash_table);
        self.schema
            .find(hash)
            .ok_or_else(|| BcsvError::FieldNotFound(key.label(&self.hash_table)))
    }

    /// Check if a field exists
    pub fn contains_field(&self, key: impl Into<FieldKey>) -> bool {
        self.find_field(key).is_some()
    }

    /// Get the name of a field by its hash
    pub fn field_name(&self, hash: u32) -> String {
        self.hash_table.find(hash)
    }

    /// Append a new field and recompute the layout
    ///
    /// Existing entries receive the type's default value for the new field.
    /// The name is registered in the hash table only once the field is accepted
    ///
    /// # Arguments
    /// - `name` - The field name, hashed with the table's algorithm
    /// - `field_type` - The type of the new field
    ///
    /// # Errors
    /// - `BcsvError::FieldAlreadyExists` if a field with the same hash already exists
    /// - `BcsvError::LayoutOverflow` if the field would start past byte 0xFFFF
    pub fn add_field(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        let hash = self.hash_table.calc(name);
        if self.schema.contains(hash) {
            return Err(BcsvError::FieldAlreadyExists(name.to_string()));
        }

        self.schema.add_field(hash, field_type)?;
        self.hash_table.add(name);

        let default = FieldValue::default_for(field_type);
        for entry in &mut self.entries {
            entry.set_by_hash(hash, default.clone());
        }

        debug!(field = name, hash = %format!("{:08X}", hash), %field_type, entry_size = self.entry_size(), "added BCSV field");
        Ok(())
    }

    /// Remove a field and recompute the layout
    ///
    /// Removing a field that does not exist is a no-op
    ///
    /// # Arguments
    /// - `key` - The field name or its precomputed hash
    ///
    /// # Returns
    /// - `true` if a field was removed, `false` if there was none
    pub fn remove_field(&mut self, key: impl Into<FieldKey>) -> bool {
        let hash = self.field_hash(key);

        if self.schema.remove_field(hash).is_none() {
            return false;
        }

        for entry in &mut self.entries {
            entry.remove_by_hash(hash);
        }

        debug!(hash = %format!("{:08X}", hash), entry_size = self.entry_size(), "removed BCSV field");
        true
    }

    /// Recompute every field's position and the entry size
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if a field would start past byte 0xFFFF
    pub fn recompute_layout(&mut self) -> Result<()> {
        self.schema.recompute_layout()
    }

    /// Get a slice of all entries
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Get an entry by index
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    fn default_entry(&self) -> Entry {
        let mut entry = Entry::with_capacity(self.schema.len());
        for field in self.schema.fields() {
            entry.set_by_hash(field.hash, FieldValue::default_for(field.field_type));
        }
        entry
    }

    /// Append a new entry holding default values for all fields and return its index
    pub fn create_entry(&mut self) -> usize {
        let entry = self.default_entry();
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Remove an entry by index
    ///
    /// # Arguments
    /// - `index` - The index of the entry to remove
    ///
    /// # Returns
    /// - The removed entry
    ///
    /// # Errors
    /// - `BcsvError::EntryIndexOutOfBounds` if the index is out of bounds
    pub fn remove_entry(&mut self, index: usize) -> Result<Entry> {
        if index >= self.entries.len() {
            return Err(BcsvError::EntryIndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }

        Ok(self.entries.remove(index))
    }

    /// Clear all entries but keep the field definitions
    pub fn clear_entries(&mut self) {
        self.entries.clear();
    }

    /// Replace the store with `count` entries holding default values
    pub(crate) fn reset_entries(&mut self, count: usize) {
        let template = self.default_entry();
        self.entries = vec![template; count];
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

impl<'a, H: HashTable> IntoIterator for &'a BcsvIO<H> {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
