use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{BcsvError, Result};

/// Prime used by the older JMP hash
pub const JMP_HASH_PRIME: u32 = 33_554_393;

/// Widen a name byte the way the game's `char` arithmetic does
#[inline]
fn signed_byte(byte: u8) -> u32 {
    byte as i8 as i32 as u32
}

/// The hash function used by Super Mario Galaxy 1/2
///
/// # Arguments
/// - `field_name` - The field name to hash
///
/// # Returns
/// A 32-bit hash value
pub fn calc_hash(field_name: &str) -> u32 {
    field_name
        .bytes()
        .fold(0u32, |hash, byte| hash.wrapping_mul(31).wrapping_add(signed_byte(byte)))
}

/// The hash function used by JMP tables of earlier titles
///
/// The accumulator is shifted one byte left (dropping overflowing bits),
/// the character is added, and the result is reduced modulo [`JMP_HASH_PRIME`]
///
/// # Arguments
/// - `field_name` - The field name to hash
///
/// # Returns
/// A 32-bit hash value, always below [`JMP_HASH_PRIME`]
pub fn calc_jmp_hash(field_name: &str) -> u32 {
    field_name.bytes().fold(0u32, |hash, byte| {
        (hash << 8).wrapping_add(signed_byte(byte)) % JMP_HASH_PRIME
    })
}

/// Trait for hash table implementations
pub trait HashTable {
    /// Calculate the hash for a field name
    fn calc(&self, field_name: &str) -> u32;

    /// Find the field name for a given hash
    /// Returns a hex representation like `[DEADBEEF]` if not found
    fn find(&self, hash: u32) -> String;

    /// Add a field name to the lookup table and return its hash
    fn add(&mut self, field_name: &str) -> u32;
}

/// Type of hash algorithm to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// Super Mario Galaxy BCSV hash
    #[default]
    Smg,
    /// Prime-modulo JMP hash
    Jmp,
}

impl HashAlgorithm {
    /// Calculate hash using this algorithm
    pub fn calc(&self, field_name: &str) -> u32 {
        match self {
            HashAlgorithm::Smg => calc_hash(field_name),
            HashAlgorithm::Jmp => calc_jmp_hash(field_name),
        }
    }
}

/// A hash lookup table backed by a file of known field names
#[derive(Debug, Clone, Default)]
pub struct FileHashTable {
    algorithm: HashAlgorithm,
    lookup: HashMap<u32, String>,
}

impl FileHashTable {
    /// Create a new empty hash table with the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            lookup: HashMap::new(),
        }
    }

    /// Create a new hash table with the given algorithm and lookup file
    ///
    /// The lookup file should contain one field name per line
    /// Lines starting with '#' are treated as comments
    ///
    /// # Errors
    /// - `BcsvError::LookupFileNotFound` if the file cannot be opened
    pub fn from_file<P: AsRef<Path>>(algorithm: HashAlgorithm, path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|_| BcsvError::LookupFileNotFound(path.display().to_string()))?;

        let mut table = Self::new(algorithm);
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            table.add(line);
        }

        Ok(table)
    }

    /// Get the hash algorithm used by this table
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Number of known names
    pub fn known_names(&self) -> usize {
        self.lookup.len()
    }
}

impl HashTable for FileHashTable {
    fn calc(&self, field_name: &str) -> u32 {
        self.algorithm.calc(field_name)
    }

    fn find(&self, hash: u32) -> String {
        self.lookup
            .get(&hash)
            .cloned()
            .unwrap_or_else(|| format!("[{:08X}]", hash))
    }

    fn add(&mut self, field_name: &str) -> u32 {
        let hash = self.calc(field_name);
        self.lookup.entry(hash).or_insert_with(|| field_name.to_string());
        hash
    }
}

/// Create a hash table configured for Super Mario Galaxy 1/2
pub fn smg_hash_table() -> FileHashTable {
    FileHashTable::new(HashAlgorithm::Smg)
}

/// Create a hash table for Super Mario Galaxy with a custom lookup file
pub fn smg_hash_table_with_lookup<P: AsRef<Path>>(path: P) -> Result<FileHashTable> {
    FileHashTable::from_file(HashAlgorithm::Smg, path)
}

/// Create a hash table using the prime-modulo JMP hash
pub fn jmp_hash_table() -> FileHashTable {
    FileHashTable::new(HashAlgorithm::Jmp)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_hash() {
        // Known hash values from Super Mario Galaxy (verified with https://mariogalaxy.org/hash)
        assert_eq!(calc_hash("ScenarioNo"), 0xED08B591);
        assert_eq!(calc_hash("ZoneName"), 0x3666C077);
    }

    #[test]
    fn test_hash_is_case_sensitive_and_deterministic() {
        assert_eq!(calc_hash("Comet"), calc_hash("Comet"));
        assert_eq!(smg_hash_table().calc("Comet"), smg_hash_table().calc("Comet"));
        assert_ne!(calc_hash("Comet"), calc_hash("comet"));
        assert_eq!(calc_hash(""), 0);
    }

    #[test]
    fn test_distinct_fixture_names() {
        let names = [
            "ScenarioNo",
            "ZoneName",
            "PowerStarId",
            "PowerStarType",
            "AppearPowerStarObj",
            "Comet",
            "CometLimitTimer",
            "ScenarioName",
            "LuigiModeTimer",
            "ErrorCheck",
            "IsHidden",
        ];
        let hashes: std::collections::HashSet<u32> = names.iter().map(|n| calc_hash(n)).collect();
        assert_eq!(hashes.len(), names.len());
    }

    #[test]
    fn test_high_bytes_are_sign_extended() {
        // 0xC3 0xA9 ("é") contributes -61 and -87
        let expected = 0u32
            .wrapping_mul(31)
            .wrapping_add(-61i32 as u32)
            .wrapping_mul(31)
            .wrapping_add(-87i32 as u32);
        assert_eq!(calc_hash("é"), expected);
    }

    #[test]
    fn test_jmp_hash() {
        assert_eq!(calc_jmp_hash("A"), 0x41);
        assert_eq!(calc_jmp_hash("AB"), 0x4142);
        assert_eq!(calc_jmp_hash("ABCD"), 0x0142_4824);
        assert_eq!(calc_jmp_hash("ScenarioNo"), 0x008A_7117);
        assert!(calc_jmp_hash("CometLimitTimer") < JMP_HASH_PRIME);
    }

    #[test]
    fn test_hash_table() {
        let mut table = smg_hash_table();

        let hash = table.add("TestField");
        assert_eq!(table.find(hash), "TestField");

        let unknown = table.find(0xDEADBEEF);
        assert_eq!(unknown, "[DEADBEEF]");
    }

    #[test]
    fn test_hash_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# scenario fields").unwrap();
        writeln!(file, "ScenarioNo").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  ZoneName  ").unwrap();

        let table = smg_hash_table_with_lookup(file.path()).unwrap();
        assert_eq!(table.known_names(), 2);
        assert_eq!(table.find(0xED08B591), "ScenarioNo");
        assert_eq!(table.find(0x3666C077), "ZoneName");
    }

    #[test]
    fn test_missing_lookup_file() {
        let err = smg_hash_table_with_lookup("does/not/exist.txt").unwrap_err();
        assert!(matches!(err, BcsvError::LookupFileNotFound(_)));
    }
}
