use thiserror::Error;

/// Result type alias for BCSV operations
pub type Result<T> = std::result::Result<T, BcsvError>;

/// Errors that can occur while loading, saving or editing a BCSV table
#[derive(Error, Debug)]
pub enum BcsvError {
    /// The header or the field table is inconsistent with itself
    #[error("Malformed BCSV header: {0}")]
    MalformedHeader(String),

    /// The stream ends before the data the header announces
    #[error("Truncated stream: expected at least {expected} bytes, got {got}")]
    TruncatedStream { expected: usize, got: usize },

    /// The declared entry size cannot hold the layout described by the field table
    #[error("Schema layout mismatch: header declares {declared} bytes per entry, fields need {computed}")]
    SchemaLayoutMismatch { declared: u32, computed: u32 },

    /// A field would start past the 16-bit offset range of a field descriptor
    #[error("Layout overflow: field would start at byte {start}, past the 0xFFFF limit")]
    LayoutOverflow { start: u32 },

    /// Invalid field type ID encountered during parsing
    #[error("Invalid field type ID: 0x{0:02X}")]
    InvalidFieldType(u8),

    /// Field not found in the schema
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Field already exists in the schema
    #[error("Field already exists: {0}")]
    FieldAlreadyExists(String),

    /// Entry index out of bounds
    #[error("Entry index out of bounds: {index} (len: {len})")]
    EntryIndexOutOfBounds { index: usize, len: usize },

    /// String encoding error
    #[error("String encoding error: {0}")]
    EncodingError(String),

    /// The output stream rejected the encoded table
    #[error("Stream write failure: {0}")]
    StreamWriteFailure(#[source] std::io::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lookup file not found
    #[error("Lookup file not found: {0}")]
    LookupFileNotFound(String),
}
