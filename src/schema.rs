//! Field schema and entry layout computation

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::error::{BcsvError, Result};
use crate::field::{FieldInfo, FieldType};

/// Default width of inline strings
pub const DEFAULT_STRING_SIZE: usize = 32;
/// Smallest supported inline string width
pub const MIN_STRING_SIZE: usize = 16;
/// Largest supported inline string width
pub const MAX_STRING_SIZE: usize = 32;

/// Round a byte offset up to the format's 4 byte word alignment
#[inline]
pub(crate) const fn align4(value: u32) -> u32 {
    (value + 3) & !3
}

/// Narrow a computed start offset to the 16-bit descriptor field
fn descriptor_start(start: u32) -> Result<u16> {
    u16::try_from(start).map_err(|_| BcsvError::LayoutOverflow { start })
}

/// Byte position and bit placement of one field, as produced by the layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub start: u16,
    pub bitmask: u32,
    pub shift: u8,
}

/// Compute the placement of every field type in `types`, in order, and the resulting entry size
///
/// Word-sized fields and inline strings start on a 4 byte boundary.
/// Consecutive `Short`/`Byte` fields share a 32-bit word, filled from the
/// high bits down, and a new word is opened when the current one is full
///
/// # Arguments
/// - `types` - The field types in schema order
/// - `string_size` - Width of inline strings in bytes
///
/// # Returns
/// - The placement of each field, in the same order, and the entry size
///
/// # Errors
/// - `BcsvError::LayoutOverflow` if a field would start past byte 0xFFFF
pub fn compute_layout<I>(types: I, string_size: usize) -> Result<(Vec<Placement>, u32)>
where
    I: IntoIterator<Item = FieldType>,
{
    let mut placements = Vec::new();
    let mut cursor: u32 = 0;
    // start of the word being packed and the number of bits still free in it
    let mut open_word: Option<(u32, u32)> = None;

    for field_type in types {
        let placement = match field_type {
            FieldType::Short | FieldType::Byte => {
                let bits = field_type.size() as u32 * 8;
                let (start, free) = match open_word {
                    Some((start, free)) if free >= bits => (start, free),
                    _ => {
                        let start = align4(cursor);
                        cursor = start + 4;
                        (start, 32)
                    }
                };
                let shift = free - bits;
                open_word = Some((start, shift));
                Placement {
                    start: descriptor_start(start)?,
                    bitmask: field_type.default_mask() << shift,
                    shift: shift as u8,
                }
            }
            FieldType::String => {
                open_word = None;
                let start = align4(cursor);
                cursor = start + string_size as u32;
                Placement {
                    start: descriptor_start(start)?,
                    bitmask: field_type.default_mask(),
                    shift: 0,
                }
            }
            FieldType::Integer | FieldType::Integer2 | FieldType::Float | FieldType::StringOffset => {
                open_word = None;
                let start = align4(cursor);
                cursor = start + 4;
                Placement {
                    start: descriptor_start(start)?,
                    bitmask: field_type.default_mask(),
                    shift: 0,
                }
            }
        };
        placements.push(placement);
    }

    Ok((placements, align4(cursor)))
}

/// Ordered set of field descriptors and the entry layout derived from them
///
/// Order is the on-disk field table order and the layout pass order
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: IndexMap<u32, FieldInfo>,
    entry_size: u32,
    string_size: usize,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSchema {
    /// Create an empty schema with 32 byte inline strings
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            entry_size: 0,
            string_size: DEFAULT_STRING_SIZE,
        }
    }

    /// Create an empty schema with the given inline string width, clamped to 16..=32
    pub fn with_string_size(string_size: usize) -> Self {
        Self {
            string_size: string_size.clamp(MIN_STRING_SIZE, MAX_STRING_SIZE),
            ..Self::new()
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields in schema order
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.values()
    }

    /// Find a field by hash
    pub fn find(&self, hash: u32) -> Option<&FieldInfo> {
        self.fields.get(&hash)
    }

    /// Check if a field exists
    pub fn contains(&self, hash: u32) -> bool {
        self.fields.contains_key(&hash)
    }

    /// Size of one entry in bytes
    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    pub(crate) fn set_entry_size(&mut self, entry_size: u32) {
        self.entry_size = entry_size;
    }

    /// Width of inline strings in bytes
    pub fn string_size(&self) -> usize {
        self.string_size
    }

    /// Change the inline string width, clamped to 16..=32, and recompute the layout
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if the wider strings push a field past byte 0xFFFF;
    ///   the previous width and layout are kept
    pub fn set_string_size(&mut self, string_size: usize) -> Result<()> {
        let previous = self.string_size;
        self.string_size = string_size.clamp(MIN_STRING_SIZE, MAX_STRING_SIZE);
        self.recompute_layout().inspect_err(|_| self.string_size = previous)
    }

    /// Append a field and recompute the layout
    ///
    /// # Errors
    /// - `BcsvError::FieldAlreadyExists` if a field with the same hash is present
    /// - `BcsvError::LayoutOverflow` if the field would start past byte 0xFFFF;
    ///   the schema is left as it was
    pub fn add_field(&mut self, hash: u32, field_type: FieldType) -> Result<()> {
        if self.fields.contains_key(&hash) {
            return Err(BcsvError::FieldAlreadyExists(format!("[{:08X}]", hash)));
        }

        self.fields.insert(hash, FieldInfo::new(hash, field_type));
        self.recompute_layout().inspect_err(|_| {
            self.fields.pop();
        })
    }

    /// Remove a field if present and recompute the layout
    ///
    /// If the recomputed layout would not fit, the previous placements are kept
    /// and the next write reports the overflow
    pub fn remove_field(&mut self, hash: u32) -> Option<FieldInfo> {
        let removed = self.fields.shift_remove(&hash)?;
        if let Err(err) = self.recompute_layout() {
            warn!(error = %err, "kept previous BCSV layout after field removal");
        }
        Some(removed)
    }

    /// Append a field exactly as described by a field table, without touching the layout
    ///
    /// # Errors
    /// - `BcsvError::MalformedHeader` if the table lists the same hash twice
    pub(crate) fn push_described(&mut self, field: FieldInfo) -> Result<()> {
        if self.fields.contains_key(&field.hash) {
            return Err(BcsvError::MalformedHeader(format!(
                "field [{:08X}] is described twice",
                field.hash
            )));
        }
        self.fields.insert(field.hash, field);
        Ok(())
    }

    /// Reassign every field's start, bitmask and shift and the entry size
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if a field would start past byte 0xFFFF;
    ///   no field is changed in that case
    pub fn recompute_layout(&mut self) -> Result<()> {
        let (placements, entry_size) = compute_layout(
            self.fields.values().map(|f| f.field_type),
            self.string_size,
        )?;

        for (field, placement) in self.fields.values_mut().zip(placements) {
            field.start = placement.start;
            field.bitmask = placement.bitmask;
            field.shift = placement.shift;
        }
        self.entry_size = entry_size;

        trace!(
            fields = self.fields.len(),
            entry_size,
            "recomputed BCSV layout"
        );
        Ok(())
    }

    /// Width in bytes of the word holding the integer fields starting at `start`
    ///
    /// All integer-family fields sharing a start are read through the same word,
    /// as wide as the widest of them needs
    pub fn word_width(&self, start: u16) -> usize {
        self.fields
            .values()
            .filter(|f| f.start == start && f.field_type.is_integer())
            .map(FieldInfo::required_width)
            .max()
            .unwrap_or(4)
    }

    /// Number of bytes read or written to access `field`
    pub fn access_width(&self, field: &FieldInfo) -> usize {
        match field.field_type {
            FieldType::String => self.string_size,
            FieldType::Float | FieldType::StringOffset => 4,
            FieldType::Integer | FieldType::Integer2 | FieldType::Short | FieldType::Byte => {
                self.word_width(field.start)
            }
        }
    }

    /// Smallest entry size able to hold every field of the current layout
    pub fn required_entry_size(&self) -> u32 {
        let end = self
            .fields
            .values()
            .map(|f| f.start as u32 + self.access_width(f) as u32)
            .max()
            .unwrap_or(0);
        align4(end)
    }
}
