//! # bcsv-io
//!
//! A Rust codec for Nintendo's BCSV/JMP tabular format.
//! This format is used by Super Mario Galaxy and some other games to store level data
//! as fixed-layout rows described by a schema of hashed field names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bcsv_io::{from_file, smg_hash_table_with_lookup, to_file, IoOptions};
//!
//! // Create a hash table with known field names
//! let hash_table = smg_hash_table_with_lookup("hashtable_smg.txt").unwrap();
//!
//! // Read a BCSV file
//! let mut bcsv = from_file(hash_table, "scenariodata.bcsv", &IoOptions::default()).unwrap();
//!
//! // Read and edit some data
//! for row in 0..bcsv.entry_count() {
//!     println!("Scenario {}", bcsv.get_unsigned_int(row, "ScenarioNo"));
//! }
//! bcsv.set_string(0, "ZoneName", "EggStarGalaxy");
//!
//! // Write it back
//! to_file(&mut bcsv, "scenariodata_edited.bcsv").unwrap();
//! ```
//!
//! ## Features
//!
//! - Read and write BCSV files, including bitfield-packed fields and the string table
//! - Fail-soft typed accessors by field name or hash
//! - Schema editing with automatic layout computation
//! - big-endian and little-endian support
//! - Shift-JIS and UTF-8 string encoding

pub mod accessor;
pub mod bcsv;
pub mod entry;
pub mod error;
pub mod field;
pub mod hash;
pub mod io;
pub mod schema;
pub mod serializable;

pub use crate::accessor::NULL_STRING;
pub use crate::bcsv::BcsvIO;
pub use crate::entry::{Entry, FieldKey};
pub use crate::error::{BcsvError, Result};
pub use crate::field::{FieldInfo, FieldType, FieldValue};
pub use crate::hash::{
    calc_hash, calc_jmp_hash, jmp_hash_table, smg_hash_table, smg_hash_table_with_lookup,
    FileHashTable, HashAlgorithm, HashTable,
};
pub use crate::io::{from_buffer, from_file, to_buffer, to_file, Encoding, IoOptions};
pub use crate::schema::FieldSchema;
pub use crate::serializable::Serializable;
