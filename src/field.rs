use std::fmt;

/// Data types supported by the BCSV/JMP format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    /// 32-bit integer (4 bytes)
    Integer = 0,
    /// Inline string (`string_size` bytes, 16 to 32)
    String = 1,
    /// 32-bit floating point (4 bytes)
    Float = 2,
    /// Second 32-bit integer type, stored exactly like `Integer`
    Integer2 = 3,
    /// 16-bit integer, packable into a shared word
    Short = 4,
    /// 8-bit integer, packable into a shared word
    Byte = 5,
    /// String stored in the string table (4 byte offset)
    StringOffset = 6,
}

impl FieldType {
    /// Natural size in bytes for this field type
    ///
    /// Inline strings have no fixed size, their width is owned by the schema
    pub const fn size(&self) -> usize {
        match self {
            FieldType::Integer => 4,
            FieldType::String => 0,
            FieldType::Float => 4,
            FieldType::Integer2 => 4,
            FieldType::Short => 2,
            FieldType::Byte => 1,
            FieldType::StringOffset => 4,
        }
    }

    /// Default bitmask for this field type
    pub const fn default_mask(&self) -> u32 {
        match self {
            FieldType::Integer => 0xFFFFFFFF,
            FieldType::String => 0x00000000,
            FieldType::Float => 0xFFFFFFFF,
            FieldType::Integer2 => 0xFFFFFFFF,
            FieldType::Short => 0x0000FFFF,
            FieldType::Byte => 0x000000FF,
            FieldType::StringOffset => 0xFFFFFFFF,
        }
    }

    /// Whether values of this type go through the mask/shift machinery
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Integer2 | FieldType::Short | FieldType::Byte
        )
    }

    /// Whether values of this type are strings
    pub const fn is_string(&self) -> bool {
        matches!(self, FieldType::String | FieldType::StringOffset)
    }

    /// Parse field type from raw byte value
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(FieldType::Integer),
            1 => Some(FieldType::String),
            2 => Some(FieldType::Float),
            3 => Some(FieldType::Integer2),
            4 => Some(FieldType::Short),
            5 => Some(FieldType::Byte),
            6 => Some(FieldType::StringOffset),
            _ => None,
        }
    }

    /// Human readable name of this field type
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "Integer",
            FieldType::String => "String",
            FieldType::Float => "Float",
            FieldType::Integer2 => "Integer2",
            FieldType::Short => "Short",
            FieldType::Byte => "Byte",
            FieldType::StringOffset => "StringOffset",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A value stored for one field of one entry
///
/// Integer-family fields hold their unpacked logical value,
/// never the raw word they share with sibling fields
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer value (for Integer, Integer2, Short, Byte)
    U32(u32),
    /// Floating point value
    F32(f32),
    /// String value (for String or StringOffset)
    Str(String),
}

impl FieldValue {
    /// Get the default value for a field type
    pub fn default_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer | FieldType::Integer2 | FieldType::Short | FieldType::Byte => {
                FieldValue::U32(0)
            }
            FieldType::Float => FieldValue::F32(0.0),
            FieldType::String | FieldType::StringOffset => FieldValue::Str(String::new()),
        }
    }

    /// Check if this value is compatible with a field type
    pub fn is_compatible_with(&self, field_type: FieldType) -> bool {
        match self {
            FieldValue::U32(_) => field_type.is_integer(),
            FieldValue::F32(_) => field_type == FieldType::Float,
            FieldValue::Str(_) => field_type.is_string(),
        }
    }

    /// Get as integer, if this is a U32 value
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            FieldValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as float, if this is a F32 value
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string reference, if this is a Str value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::F32(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::U32(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::F32(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

/// Definition of a field (column) in a BCSV table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Hash of the field name
    pub hash: u32,
    /// Bitmask isolating the field inside its word
    pub bitmask: u32,
    /// Byte offset of the field within an entry
    pub start: u16,
    /// Right shift aligning the masked value
    pub shift: u8,
    /// Data type of the field
    pub field_type: FieldType,
}

impl FieldInfo {
    /// Create an unplaced field; the schema assigns its layout
    pub fn new(hash: u32, field_type: FieldType) -> Self {
        Self {
            hash,
            bitmask: field_type.default_mask(),
            start: 0,
            shift: 0,
            field_type,
        }
    }

    /// Narrowest word width in bytes that can hold this field's mask and type
    pub fn required_width(&self) -> usize {
        let mask_width = if self.bitmask > 0xFFFF {
            4
        } else if self.bitmask > 0xFF {
            2
        } else {
            1
        };
        mask_width.max(self.field_type.size())
    }

    /// Extract this field's logical value from the word it lives in
    #[inline]
    pub fn unpack(&self, word: u32) -> u32 {
        (word & self.bitmask).checked_shr(self.shift as u32).unwrap_or(0)
    }

    /// Merge a logical value into a word, leaving bits outside the mask untouched
    #[inline]
    pub fn pack(&self, word: u32, value: u32) -> u32 {
        (word & !self.bitmask) | (value.checked_shl(self.shift as u32).unwrap_or(0) & self.bitmask)
    }

    /// Clamp a logical value to the bits this field can represent
    #[inline]
    pub fn truncate(&self, value: u32) -> u32 {
        self.unpack(self.pack(0, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids_round_trip() {
        for raw in 0..7u8 {
            let ty = FieldType::from_raw(raw).unwrap();
            assert_eq!(ty as u8, raw);
        }
        assert_eq!(FieldType::from_raw(7), None);
    }

    #[test]
    fn test_pack_keeps_sibling_bits() {
        let high = FieldInfo {
            hash: 1,
            bitmask: 0x0000FF00,
            start: 0,
            shift: 8,
            field_type: FieldType::Byte,
        };
        let word = high.pack(0x0000_00CD, 0xAB);
        assert_eq!(word, 0x0000_ABCD);
        assert_eq!(high.unpack(word), 0xAB);
    }

    #[test]
    fn test_truncate_to_mask() {
        let flag = FieldInfo {
            hash: 1,
            bitmask: 0x0000_0030,
            start: 0,
            shift: 4,
            field_type: FieldType::Integer,
        };
        assert_eq!(flag.truncate(0xFF), 0x3);
        assert_eq!(flag.required_width(), 4);
    }

    #[test]
    fn test_required_width() {
        let mut field = FieldInfo::new(1, FieldType::Byte);
        assert_eq!(field.required_width(), 1);
        field.bitmask = 0xFF00;
        assert_eq!(field.required_width(), 2);
        field.bitmask = 0xFF00_0000;
        assert_eq!(field.required_width(), 4);
    }

    #[test]
    fn test_value_compatibility() {
        assert!(FieldValue::U32(1).is_compatible_with(FieldType::Byte));
        assert!(FieldValue::F32(1.0).is_compatible_with(FieldType::Float));
        assert!(!FieldValue::F32(1.0).is_compatible_with(FieldType::Integer));
        assert!(FieldValue::from("x").is_compatible_with(FieldType::StringOffset));
        assert_eq!(FieldValue::default_for(FieldType::String), FieldValue::Str(String::new()));
    }
}
