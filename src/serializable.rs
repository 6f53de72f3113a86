//! Entity-side contract used to move domain objects in and out of table rows

use crate::bcsv::BcsvIO;
use crate::hash::{FileHashTable, HashTable};

/// An object that stores itself in one row of a BCSV table
///
/// Implementations only touch the table through its typed accessors,
/// so they keep working when fields are missing from a file.
pub trait Serializable<H: HashTable = FileHashTable> {
    /// Write this object's fields into the entry at `entry_index`
    fn serialize(&self, io: &mut BcsvIO<H>, entry_index: usize);

    /// Read this object's fields from the entry at `entry_index`
    fn deserialize(&mut self, io: &BcsvIO<H>, entry_index: usize);
}

impl<H: HashTable, T: Serializable<H> + ?Sized> Serializable<H> for Box<T> {
    fn serialize(&self, io: &mut BcsvIO<H>, entry_index: usize) {
        (**self).serialize(io, entry_index)
    }

    fn deserialize(&mut self, io: &BcsvIO<H>, entry_index: usize) {
        (**self).deserialize(io, entry_index)
    }
}

impl<H: HashTable> BcsvIO<H> {
    /// Build one entity per entry, in row order
    pub fn deserialize_all<E: Serializable<H> + Default>(&self) -> Vec<E> {
        (0..self.entry_count())
            .map(|entry_index| {
                let mut entity = E::default();
                entity.deserialize(self, entry_index);
                entity
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use crate::hash::smg_hash_table;
    use crate::io::{from_buffer, IoOptions};

    #[derive(Debug, Default, PartialEq)]
    struct Scenario {
        scenario_no: u32,
        comet: String,
        power_star_type: u8,
    }

    impl Serializable for Scenario {
        fn serialize(&self, io: &mut BcsvIO<FileHashTable>, entry_index: usize) {
            io.set_unsigned_int(entry_index, "ScenarioNo", self.scenario_no);
            io.set_string(entry_index, "Comet", self.comet.as_str());
            io.set_char(entry_index, "PowerStarType", self.power_star_type);
        }

        fn deserialize(&mut self, io: &BcsvIO<FileHashTable>, entry_index: usize) {
            self.scenario_no = io.get_unsigned_int(entry_index, "ScenarioNo");
            self.comet = io.get_string(entry_index, "Comet");
            self.power_star_type = io.get_char(entry_index, "PowerStarType");
        }
    }

    struct Marker(u32);

    impl Serializable for Marker {
        fn serialize(&self, io: &mut BcsvIO<FileHashTable>, entry_index: usize) {
            io.set_unsigned_int(entry_index, "ScenarioNo", self.0);
        }

        fn deserialize(&mut self, io: &BcsvIO<FileHashTable>, entry_index: usize) {
            self.0 = io.get_unsigned_int(entry_index, "ScenarioNo");
        }
    }

    fn scenario_table() -> BcsvIO<FileHashTable> {
        let mut io = BcsvIO::new(smg_hash_table());
        io.add_field("ScenarioNo", FieldType::Integer).unwrap();
        io.add_field("Comet", FieldType::StringOffset).unwrap();
        io.add_field("PowerStarType", FieldType::Byte).unwrap();
        io
    }

    #[test]
    fn test_save_and_deserialize_entities() {
        let scenarios = vec![
            Scenario { scenario_no: 1, comet: String::new(), power_star_type: 0 },
            Scenario { scenario_no: 2, comet: "Red".to_string(), power_star_type: 3 },
            Scenario { scenario_no: 3, comet: "Red".to_string(), power_star_type: 1 },
        ];

        let mut io = scenario_table();
        let mut data = Vec::new();
        io.save(&scenarios, &mut data).unwrap();
        assert_eq!(io.entry_count(), 3);

        let reloaded = from_buffer(smg_hash_table(), &data, &IoOptions::default()).unwrap();
        let restored: Vec<Scenario> = reloaded.deserialize_all();
        assert_eq!(restored, scenarios);
    }

    #[test]
    fn test_save_replaces_previous_entries() {
        let mut io = scenario_table();
        for _ in 0..5 {
            io.create_entry();
        }

        let mut data = Vec::new();
        io.save(&[Marker(7)], &mut data).unwrap();
        assert_eq!(io.entry_count(), 1);
        assert_eq!(io.get_unsigned_int(0, "ScenarioNo"), 7);
        assert_eq!(io.get_string(0, "Comet"), "");
    }

    #[test]
    fn test_boxed_entities() {
        let entities: Vec<Box<dyn Serializable>> = vec![
            Box::new(Marker(4)),
            Box::new(Scenario { scenario_no: 9, comet: "Dark".to_string(), power_star_type: 2 }),
        ];

        let mut io = scenario_table();
        let mut data = Vec::new();
        io.save(&entities, &mut data).unwrap();

        assert_eq!(io.get_unsigned_int(0, "ScenarioNo"), 4);
        assert_eq!(io.get_unsigned_int(1, "ScenarioNo"), 9);
        assert_eq!(io.get_string(1, "Comet"), "Dark");
    }

    #[test]
    fn test_save_with_hook() {
        let mut io = scenario_table();
        let mut data = Vec::new();
        io.save_with(&[10u32, 20, 30], &mut data, |io, index, value| {
            io.set_unsigned_int(index, "ScenarioNo", *value + index as u32);
        })
        .unwrap();

        let reloaded = from_buffer(smg_hash_table(), &data, &IoOptions::default()).unwrap();
        let values: Vec<u32> = (0..3).map(|i| reloaded.get_unsigned_int(i, "ScenarioNo")).collect();
        assert_eq!(values, vec![10, 21, 32]);
    }
}
