use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::bcsv::BcsvIO;
use crate::entry::Entry;
use crate::error::{BcsvError, Result};
use crate::field::{FieldInfo, FieldType, FieldValue};
use crate::hash::HashTable;
use crate::schema::FieldSchema;
use crate::serializable::Serializable;

/// Size of the file header
pub const HEADER_SIZE: usize = 0x10;
/// Size of one field descriptor in the field table
pub const FIELD_DEF_SIZE: usize = 0x0C;
/// Written files are padded to a multiple of this size
const FILE_ALIGNMENT: usize = 0x20;
/// Byte used for the trailing file padding
const PADDING_BYTE: u8 = 0x40;

/// Options for reading/writing BCSV files
#[derive(Debug, Clone)]
pub struct IoOptions {
    /// Whether data is big-endian or little-endian
    pub big_endian: bool,
    /// String encoding: "shift_jis" (for japanese language) or "utf-8"
    pub encoding: Encoding,
}

/// String encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Shift-JIS encoding
    ShiftJis,
    /// UTF-8 encoding
    Utf8,
}

impl Default for IoOptions {
    fn default() -> Self {
        Self {
            big_endian: true,
            encoding: Encoding::ShiftJis,
        }
    }
}

impl IoOptions {
    /// Options for Super Mario Galaxy (Wii)
    pub fn super_mario_galaxy() -> Self {
        Self::default()
    }
}

/// The 16 byte file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    entry_count: u32,
    field_count: u32,
    entry_data_offset: u32,
    entry_size: u32,
}

impl<H: HashTable> BcsvIO<H> {
    /// Replace the schema and entries with the table encoded in `data`
    ///
    /// Fields are read exactly as the file describes them. Inline strings are
    /// read with the current string size. On failure nothing is changed.
    ///
    /// # Arguments
    /// - `data` - The byte buffer containing the BCSV data
    ///
    /// # Errors
    /// - `BcsvError::TruncatedStream` if `data` ends before the header, field table, entries or a string
    /// - `BcsvError::MalformedHeader` if the header is inconsistent
    /// - `BcsvError::InvalidFieldType` if a field descriptor has an unknown type
    /// - `BcsvError::SchemaLayoutMismatch` if the declared entry size differs from the one the fields need
    pub fn load(&mut self, data: &[u8]) -> Result<()> {
        match decode(data, self.schema.string_size(), self.options()) {
            Ok((schema, entries)) => {
                debug!(
                    entries = entries.len(),
                    fields = schema.len(),
                    entry_size = schema.entry_size(),
                    "loaded BCSV table"
                );
                self.schema = schema;
                self.entries = entries;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, len = data.len(), "rejected BCSV data");
                Err(err)
            }
        }
    }

    /// Recompute the layout, serialize one entry per entity, then write the table to `stream`
    ///
    /// Every entity writes its values through [`Serializable::serialize`] into a
    /// fresh entry holding defaults. The resulting entries replace the store.
    ///
    /// # Arguments
    /// - `entities` - The entities to write, one entry each, in order
    /// - `stream` - The destination of the encoded table
    ///
    /// # Type
    /// - `E` - The entity type, which must implement [`Serializable`] for this hash table
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if a field would start past byte 0xFFFF
    /// - `BcsvError::EncodingError` if a string cannot be encoded
    /// - `BcsvError::StreamWriteFailure` if the stream rejects the data
    pub fn save<E, W>(&mut self, entities: &[E], stream: &mut W) -> Result<()>
    where
        E: Serializable<H>,
        W: Write,
    {
        self.save_with(entities, stream, |io, index, entity| entity.serialize(io, index))
    }

    /// Like [`BcsvIO::save`], with a caller supplied serializer for each entity
    ///
    /// # Arguments
    /// - `entities` - The entities to write, one entry each, in order
    /// - `stream` - The destination of the encoded table
    /// - `serializer` - Called with the table, the entry index and the entity
    pub fn save_with<E, W, F>(&mut self, entities: &[E], stream: &mut W, mut serializer: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&mut Self, usize, &E),
    {
        self.schema.recompute_layout()?;
        self.reset_entries(entities.len());

        for (index, entity) in entities.iter().enumerate() {
            serializer(self, index, entity);
        }

        self.write(stream)
    }

    /// Recompute the layout and write the current entries to `stream`
    ///
    /// # Errors
    /// - `BcsvError::LayoutOverflow` if a field would start past byte 0xFFFF
    /// - `BcsvError::EncodingError` if a string cannot be encoded
    /// - `BcsvError::StreamWriteFailure` if the stream rejects the data
    pub fn write<W: Write>(&mut self, stream: &mut W) -> Result<()> {
        self.schema.recompute_layout()?;
        let buffer = encode(&self.schema, &self.entries, self.options())?;

        stream
            .write_all(&buffer)
            .and_then(|_| stream.flush())
            .map_err(BcsvError::StreamWriteFailure)?;

        debug!(
            entries = self.entries.len(),
            fields = self.schema.len(),
            entry_size = self.schema.entry_size(),
            bytes = buffer.len(),
            "saved BCSV table"
        );
        Ok(())
    }
}

/// Read a table from a byte buffer
///
/// # Arguments
/// - `hash_table` - The hash table to use for field name lookups
/// - `data` - The byte buffer containing the BCSV data
/// - `options` - Options for endianness and string encoding
///
/// # Type
/// - `H` - The type of hash table to use, which must implement the `HashTable` trait
///
/// # Returns
/// - A `BcsvIO` holding the decoded schema and entries
pub fn from_buffer<H: HashTable>(hash_table: H, data: &[u8], options: &IoOptions) -> Result<BcsvIO<H>> {
    let mut io = BcsvIO::with_options(hash_table, options.clone());
    io.load(data)?;
    Ok(io)
}

/// Read a table from a file
///
/// # Arguments
/// - `hash_table` - The hash table to use for field name lookups
/// - `path` - The path to the BCSV file to read
/// - `options` - Options for endianness and string encoding
///
/// # Errors
/// - `BcsvError::Io` if the file cannot be read, then any error of [`BcsvIO::load`]
pub fn from_file<H: HashTable, P: AsRef<Path>>(hash_table: H, path: P, options: &IoOptions) -> Result<BcsvIO<H>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    from_buffer(hash_table, &data, options)
}

/// Write a table to a byte buffer, recomputing its layout first
///
/// # Arguments
/// - `io` - The table to encode, with its own options
///
/// # Returns
/// - The encoded file, padded to 32 bytes
pub fn to_buffer<H: HashTable>(io: &mut BcsvIO<H>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io.write(&mut buffer)?;
    Ok(buffer)
}

/// Write a table to a file, recomputing its layout first
///
/// # Arguments
/// - `io` - The table to encode, with its own options
/// - `path` - The path to the file where the BCSV data should be written
pub fn to_file<H: HashTable, P: AsRef<Path>>(io: &mut BcsvIO<H>, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    io.write(&mut file)
}

// Helper functions

fn read_u32(data: &[u8], big_endian: bool) -> u32 {
    if big_endian {
        BigEndian::read_u32(data)
    } else {
        LittleEndian::read_u32(data)
    }
}

fn write_u32(buffer: &mut [u8], value: u32, big_endian: bool) {
    if big_endian {
        BigEndian::write_u32(buffer, value);
    } else {
        LittleEndian::write_u32(buffer, value);
    }
}

/// Read a 1, 2 or 4 byte word
fn read_word(data: &[u8], big_endian: bool) -> u32 {
    let width = data.len();
    if big_endian {
        BigEndian::read_uint(data, width) as u32
    } else {
        LittleEndian::read_uint(data, width) as u32
    }
}

/// Write a 1, 2 or 4 byte word, dropping bits that do not fit
fn write_word(buffer: &mut [u8], value: u32, big_endian: bool) {
    let width = buffer.len();
    let value = (value as u64) & ((1u64 << (width * 8)) - 1);
    if big_endian {
        BigEndian::write_uint(buffer, value, width);
    } else {
        LittleEndian::write_uint(buffer, value, width);
    }
}

fn read_header(data: &[u8], big_endian: bool) -> Result<Header> {
    if data.len() < HEADER_SIZE {
        return Err(BcsvError::TruncatedStream {
            expected: HEADER_SIZE,
            got: data.len(),
        });
    }

    Ok(Header {
        entry_count: read_u32(&data[0x00..0x04], big_endian),
        field_count: read_u32(&data[0x04..0x08], big_endian),
        entry_data_offset: read_u32(&data[0x08..0x0C], big_endian),
        entry_size: read_u32(&data[0x0C..0x10], big_endian),
    })
}

/// Read a field descriptor
///
/// # Errors
/// - `BcsvError::InvalidFieldType` if the field type byte is not a valid `FieldType`
fn read_field(data: &[u8], big_endian: bool) -> Result<FieldInfo> {
    let raw_type = data[0x0B];
    let field_type = FieldType::from_raw(raw_type).ok_or(BcsvError::InvalidFieldType(raw_type))?;

    let start = if big_endian {
        BigEndian::read_u16(&data[0x08..0x0A])
    } else {
        LittleEndian::read_u16(&data[0x08..0x0A])
    };

    Ok(FieldInfo {
        hash: read_u32(&data[0x00..0x04], big_endian),
        bitmask: read_u32(&data[0x04..0x08], big_endian),
        start,
        shift: data[0x0A],
        field_type,
    })
}

fn write_field(buffer: &mut [u8], field: &FieldInfo, big_endian: bool) {
    write_u32(&mut buffer[0x00..0x04], field.hash, big_endian);
    write_u32(&mut buffer[0x04..0x08], field.bitmask, big_endian);
    if big_endian {
        BigEndian::write_u16(&mut buffer[0x08..0x0A], field.start);
    } else {
        LittleEndian::write_u16(&mut buffer[0x08..0x0A], field.start);
    }
    buffer[0x0A] = field.shift;
    buffer[0x0B] = field.field_type as u8;
}

/// Parse a whole table without touching any existing state
fn decode(data: &[u8], string_size: usize, options: &IoOptions) -> Result<(FieldSchema, Vec<Entry>)> {
    let header = read_header(data, options.big_endian)?;

    let overflow = || BcsvError::MalformedHeader("table size overflows".to_string());

    let fields_end = (header.field_count as usize)
        .checked_mul(FIELD_DEF_SIZE)
        .and_then(|size| size.checked_add(HEADER_SIZE))
        .ok_or_else(overflow)?;
    if data.len() < fields_end {
        return Err(BcsvError::TruncatedStream {
            expected: fields_end,
            got: data.len(),
        });
    }

    let entry_data_offset = header.entry_data_offset as usize;
    if entry_data_offset < fields_end {
        return Err(BcsvError::MalformedHeader(format!(
            "entry data at 0x{:X} overlaps the field table ending at 0x{:X}",
            entry_data_offset, fields_end
        )));
    }

    let entry_size = header.entry_size as usize;
    if entry_size == 0 && header.entry_count > 0 {
        return Err(BcsvError::MalformedHeader(format!(
            "{} entries of zero bytes",
            header.entry_count
        )));
    }

    let string_table_offset = (header.entry_count as usize)
        .checked_mul(entry_size)
        .and_then(|size| size.checked_add(entry_data_offset))
        .ok_or_else(overflow)?;
    if data.len() < string_table_offset {
        return Err(BcsvError::TruncatedStream {
            expected: string_table_offset,
            got: data.len(),
        });
    }

    let mut schema = FieldSchema::with_string_size(string_size);
    for descriptor in data[HEADER_SIZE..fields_end].chunks_exact(FIELD_DEF_SIZE) {
        schema.push_described(read_field(descriptor, options.big_endian)?)?;
    }
    schema.set_entry_size(header.entry_size);

    let computed = schema.required_entry_size();
    if header.entry_size != computed {
        return Err(BcsvError::SchemaLayoutMismatch {
            declared: header.entry_size,
            computed,
        });
    }

    let widths: Vec<usize> = schema.fields().map(|f| schema.access_width(f)).collect();
    let strings = &data[string_table_offset..];

    // rows are bounded by the bytes present, never by the header's count alone
    let entries = if entry_size == 0 {
        Vec::new()
    } else {
        data[entry_data_offset..string_table_offset]
            .chunks_exact(entry_size)
            .map(|row_data| -> Result<Entry> {
                let mut entry = Entry::with_capacity(schema.len());
                for (field, &width) in schema.fields().zip(&widths) {
                    let bytes = &row_data[field.start as usize..field.start as usize + width];
                    let value = read_field_value(bytes, strings, string_table_offset, field, options)?;
                    entry.set_by_hash(field.hash, value);
                }
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?
    };

    Ok((schema, entries))
}

/// Decode one value from the bytes the field occupies in its row
fn read_field_value(
    bytes: &[u8],
    strings: &[u8],
    string_table_offset: usize,
    field: &FieldInfo,
    options: &IoOptions,
) -> Result<FieldValue> {
    let value = match field.field_type {
        FieldType::Integer | FieldType::Integer2 | FieldType::Short | FieldType::Byte => {
            FieldValue::U32(field.unpack(read_word(bytes, options.big_endian)))
        }

        FieldType::Float => {
            let value = if options.big_endian {
                BigEndian::read_f32(bytes)
            } else {
                LittleEndian::read_f32(bytes)
            };
            FieldValue::F32(value)
        }

        FieldType::String => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            FieldValue::Str(decode_string(&bytes[..end], options.encoding)?)
        }

        FieldType::StringOffset => {
            let offset = read_u32(bytes, options.big_endian) as usize;
            let tail = strings.get(offset..).unwrap_or_default();
            let end = tail.iter().position(|&b| b == 0).ok_or_else(|| {
                let got = string_table_offset + strings.len();
                BcsvError::TruncatedStream {
                    expected: (string_table_offset + offset).max(got) + 1,
                    got,
                }
            })?;
            FieldValue::Str(decode_string(&tail[..end], options.encoding)?)
        }
    };

    Ok(value)
}

/// Encode the header, field table, entries and string table
fn encode(schema: &FieldSchema, entries: &[Entry], options: &IoOptions) -> Result<Vec<u8>> {
    let entry_size = schema.entry_size() as usize;
    let entry_data_offset = HEADER_SIZE + schema.len() * FIELD_DEF_SIZE;

    let mut buffer = vec![0u8; entry_data_offset + entries.len() * entry_size];

    write_u32(&mut buffer[0x00..0x04], entries.len() as u32, options.big_endian);
    write_u32(&mut buffer[0x04..0x08], schema.len() as u32, options.big_endian);
    write_u32(&mut buffer[0x08..0x0C], entry_data_offset as u32, options.big_endian);
    write_u32(&mut buffer[0x0C..0x10], entry_size as u32, options.big_endian);

    for (field, descriptor) in schema
        .fields()
        .zip(buffer[HEADER_SIZE..entry_data_offset].chunks_exact_mut(FIELD_DEF_SIZE))
    {
        write_field(descriptor, field, options.big_endian);
    }

    let widths: Vec<usize> = schema.fields().map(|f| schema.access_width(f)).collect();
    let mut strings = StringTable::default();

    if entry_size > 0 {
        for (entry, row) in entries
            .iter()
            .zip(buffer[entry_data_offset..].chunks_exact_mut(entry_size))
        {
            for (field, &width) in schema.fields().zip(&widths) {
                let default;
                let value = match entry.get_by_hash(field.hash) {
                    Some(value) if value.is_compatible_with(field.field_type) => value,
                    _ => {
                        default = FieldValue::default_for(field.field_type);
                        &default
                    }
                };
                let bytes = &mut row[field.start as usize..field.start as usize + width];
                write_field_value(bytes, value, field, &mut strings, options)?;
            }
        }
    }

    buffer.extend_from_slice(&strings.data);

    let aligned_len = buffer.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
    buffer.resize(aligned_len, PADDING_BYTE);

    Ok(buffer)
}

/// Deduplicated string table built while writing entries
#[derive(Debug, Default)]
struct StringTable {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    /// Offset of `value` in the table, appending it on first use
    fn offset_of(&mut self, value: &str, encoding: Encoding) -> Result<u32> {
        if let Some(&offset) = self.offsets.get(value) {
            return Ok(offset);
        }

        let offset = self.data.len() as u32;
        self.data.extend_from_slice(&encode_string(value, encoding)?);
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        Ok(offset)
    }
}

/// Encode one value into the bytes the field occupies in its row
///
/// Integer-family fields are merged into the word they share with their siblings
fn write_field_value(
    bytes: &mut [u8],
    value: &FieldValue,
    field: &FieldInfo,
    strings: &mut StringTable,
    options: &IoOptions,
) -> Result<()> {
    match (field.field_type, value) {
        (FieldType::Integer | FieldType::Integer2 | FieldType::Short | FieldType::Byte, FieldValue::U32(v)) => {
            let existing = read_word(bytes, options.big_endian);
            write_word(bytes, field.pack(existing, *v), options.big_endian);
        }

        (FieldType::Float, FieldValue::F32(v)) => {
            if options.big_endian {
                BigEndian::write_f32(bytes, *v);
            } else {
                LittleEndian::write_f32(bytes, *v);
            }
        }

        (FieldType::String, FieldValue::Str(s)) => {
            let encoded = encode_string(s, options.encoding)?;
            let len = encoded.len().min(bytes.len());
            bytes[..len].copy_from_slice(&encoded[..len]);
        }

        (FieldType::StringOffset, FieldValue::Str(s)) => {
            let offset = strings.offset_of(s, options.encoding)?;
            write_u32(bytes, offset, options.big_endian);
        }

        // values are checked against the field type before reaching here
        _ => {}
    }

    Ok(())
}

/// Decode a byte slice into a string using the specified encoding
///
/// # Errors
/// - `BcsvError::EncodingError` if the bytes are not valid UTF-8 when UTF-8 is requested
fn decode_string(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => {
            String::from_utf8(bytes.to_vec()).map_err(|e| BcsvError::EncodingError(e.to_string()))
        }
        Encoding::ShiftJis => {
            let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Number of bytes `s` takes once encoded
pub(crate) fn encoded_len(s: &str, encoding: Encoding) -> usize {
    match encoding {
        Encoding::Utf8 => s.len(),
        Encoding::ShiftJis => encoding_rs::SHIFT_JIS.encode(s).0.len(),
    }
}

/// Encode a string into a byte vector using the specified encoding
///
/// # Errors
/// - `BcsvError::EncodingError` if the string has characters Shift-JIS cannot represent
fn encode_string(s: &str, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => Ok(s.as_bytes().to_vec()),
        Encoding::ShiftJis => {
            let (encoded, _, had_errors) = encoding_rs::SHIFT_JIS.encode(s);
            if had_errors {
                return Err(BcsvError::EncodingError(format!(
                    "'{}' cannot be represented in Shift-JIS",
                    s
                )));
            }
            Ok(encoded.into_owned())
        }
    }
}
