//! Property-based tests for the BCSV load/save cycle

use bcsv_io::{
    from_buffer, from_file, smg_hash_table, to_buffer, to_file, BcsvIO, FieldType, FieldValue,
    FileHashTable, IoOptions,
};
use proptest::prelude::*;

fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Integer),
        Just(FieldType::String),
        Just(FieldType::Float),
        Just(FieldType::Integer2),
        Just(FieldType::Short),
        Just(FieldType::Byte),
        Just(FieldType::StringOffset),
    ]
}

fn value_for(field_type: FieldType) -> BoxedStrategy<FieldValue> {
    match field_type {
        FieldType::Integer | FieldType::Integer2 => any::<u32>().prop_map(FieldValue::U32).boxed(),
        FieldType::Short => any::<u16>().prop_map(|v| FieldValue::U32(v as u32)).boxed(),
        FieldType::Byte => any::<u8>().prop_map(|v| FieldValue::U32(v as u32)).boxed(),
        FieldType::Float => (-1.0e6f32..1.0e6f32).prop_map(FieldValue::F32).boxed(),
        FieldType::String => "[a-zA-Z0-9_]{0,32}".prop_map(FieldValue::Str).boxed(),
        FieldType::StringOffset => "[a-zA-Z0-9_ ]{0,48}".prop_map(FieldValue::Str).boxed(),
    }
}

// Field types plus rows of values conforming to them
fn table_strategy() -> impl Strategy<Value = (Vec<FieldType>, Vec<Vec<FieldValue>>)> {
    prop::collection::vec(field_type(), 1..10).prop_flat_map(|types| {
        let row: Vec<BoxedStrategy<FieldValue>> = types.iter().map(|t| value_for(*t)).collect();
        (Just(types), prop::collection::vec(row, 0..12))
    })
}

fn field_name(index: usize) -> String {
    format!("Field{}", index)
}

fn build_table(types: &[FieldType], rows: &[Vec<FieldValue>]) -> BcsvIO<FileHashTable> {
    let mut io = BcsvIO::new(smg_hash_table());
    for (index, field_type) in types.iter().enumerate() {
        io.add_field(&field_name(index), *field_type).unwrap();
    }

    for values in rows {
        let row = io.create_entry();
        for (index, value) in values.iter().enumerate() {
            let name = field_name(index);
            let written = match value {
                FieldValue::U32(v) => match types[index] {
                    FieldType::Short => io.set_short(row, &name, *v as u16),
                    FieldType::Byte => io.set_char(row, &name, *v as u8),
                    _ => io.set_unsigned_int(row, &name, *v),
                },
                FieldValue::F32(v) => io.set_float(row, &name, *v),
                FieldValue::Str(s) => io.set_string(row, &name, s.as_str()),
            };
            assert!(written);
        }
    }
    io
}

proptest! {
    // -------------------------------------------------------------
    // 1. Loading what was saved gives back every value.
    // -------------------------------------------------------------
    #[test]
    fn prop_save_then_load_round_trips((types, rows) in table_strategy()) {
        let mut io = build_table(&types, &rows);
        let data = to_buffer(&mut io).unwrap();

        prop_assert!(data.len() >= io.projected_file_size(rows.len()));
        prop_assert_eq!(data.len() % 0x20, 0);

        let reloaded = from_buffer(smg_hash_table(), &data, &IoOptions::default()).unwrap();
        prop_assert_eq!(reloaded.entry_count(), rows.len());
        prop_assert_eq!(reloaded.field_count(), types.len());
        prop_assert_eq!(reloaded.entry_size(), io.entry_size());
        prop_assert_eq!(reloaded.entries(), io.entries());

        for (row, values) in rows.iter().enumerate() {
            for (index, value) in values.iter().enumerate() {
                let stored = reloaded.entry(row).unwrap().get_by_hash(reloaded.field_hash(field_name(index).as_str()));
                prop_assert_eq!(stored, Some(value));
            }
        }
    }

    // -------------------------------------------------------------
    // 2. Saving a reloaded table yields the same bytes.
    // -------------------------------------------------------------
    #[test]
    fn prop_resave_is_stable((types, rows) in table_strategy()) {
        let mut io = build_table(&types, &rows);
        let first = to_buffer(&mut io).unwrap();

        let mut reloaded = from_buffer(smg_hash_table(), &first, &IoOptions::default()).unwrap();
        let second = to_buffer(&mut reloaded).unwrap();
        prop_assert_eq!(first, second);
    }

    // -------------------------------------------------------------
    // 3. Writing one packed field never disturbs its word siblings.
    // -------------------------------------------------------------
    #[test]
    fn prop_packed_fields_are_isolated(
        narrow in prop::collection::vec(prop::bool::ANY, 2..12),
        writes in prop::collection::vec((any::<prop::sample::Index>(), any::<u16>()), 1..40)
    ) {
        let mut io = BcsvIO::new(smg_hash_table());
        let types: Vec<FieldType> = narrow
            .iter()
            .map(|&is_byte| if is_byte { FieldType::Byte } else { FieldType::Short })
            .collect();
        for (index, field_type) in types.iter().enumerate() {
            io.add_field(&field_name(index), *field_type).unwrap();
        }
        io.create_entry();

        let mut expected = vec![0u16; types.len()];
        for (target, value) in &writes {
            let index = target.index(types.len());
            let name = field_name(index);
            if types[index] == FieldType::Byte {
                prop_assert!(io.set_char(0, &name, *value as u8));
                expected[index] = *value & 0xFF;
            } else {
                prop_assert!(io.set_short(0, &name, *value));
                expected[index] = *value;
            }
        }

        let data = to_buffer(&mut io).unwrap();
        let reloaded = from_buffer(smg_hash_table(), &data, &IoOptions::default()).unwrap();

        for (index, field_type) in types.iter().enumerate() {
            let name = field_name(index);
            let actual = match field_type {
                FieldType::Byte => reloaded.get_char(0, &name) as u16,
                _ => reloaded.get_short(0, &name),
            };
            prop_assert_eq!(actual, expected[index]);
        }
    }

    // -------------------------------------------------------------
    // 4. Any prefix shorter than the declared data is rejected
    //    and leaves the previous table in place.
    // -------------------------------------------------------------
    #[test]
    fn prop_truncated_streams_are_rejected((types, rows) in table_strategy(), cut in any::<prop::sample::Index>()) {
        prop_assume!(!rows.is_empty());

        let mut io = build_table(&types, &rows);
        let data = to_buffer(&mut io).unwrap();
        let required = io.projected_file_size(rows.len());
        let truncated = &data[..cut.index(required)];

        let before = io.entries().to_vec();
        let entry_size = io.entry_size();
        prop_assert!(io.load(truncated).is_err());
        prop_assert_eq!(io.entries(), before.as_slice());
        prop_assert_eq!(io.entry_size(), entry_size);
        prop_assert_eq!(io.field_count(), types.len());
    }
}

#[test]
fn test_add_remove_keeps_layout() {
    let mut io = BcsvIO::new(smg_hash_table());
    io.add_field("ScenarioNo", FieldType::Integer).unwrap();
    io.add_field("ZoneName", FieldType::String).unwrap();
    io.add_field("PowerStarType", FieldType::Byte).unwrap();
    let before = io.entry_size();

    io.add_field("F", FieldType::Integer).unwrap();
    assert_ne!(io.entry_size(), before);
    assert!(io.remove_field("F"));
    assert_eq!(io.entry_size(), before);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenariodata.bcsv");

    let mut io = BcsvIO::new(smg_hash_table());
    io.add_field("ScenarioNo", FieldType::Integer).unwrap();
    io.add_field("ZoneName", FieldType::StringOffset).unwrap();
    io.add_field("CometLimitTimer", FieldType::Float).unwrap();
    for no in 1..=3u32 {
        let row = io.create_entry();
        io.set_unsigned_int(row, "ScenarioNo", no);
        io.set_string(row, "ZoneName", "EggStarGalaxy");
        io.set_float(row, "CometLimitTimer", no as f32 * 1.5);
    }
    to_file(&mut io, &path).unwrap();

    let reloaded = from_file(smg_hash_table(), &path, &IoOptions::default()).unwrap();
    assert_eq!(reloaded.entries(), io.entries());
    assert_eq!(reloaded.get_float(2, "CometLimitTimer"), 4.5);

    // a single copy of the shared zone name in the string table
    let data = std::fs::read(&path).unwrap();
    let occurrences = data.windows(b"EggStarGalaxy".len()).filter(|w| *w == b"EggStarGalaxy").count();
    assert_eq!(occurrences, 1);
}
