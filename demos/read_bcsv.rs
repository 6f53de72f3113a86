//! Example: Read a BCSV file and print its fields and entries

use std::path::PathBuf;

use bcsv_io::{from_file, smg_hash_table, smg_hash_table_with_lookup, FieldType, IoOptions};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let bcsv_path = PathBuf::from(args.next().unwrap_or_else(|| "scenariodata.bcsv".to_string()));
    let hash_table = match args.next() {
        Some(lookup_path) => smg_hash_table_with_lookup(lookup_path)?,
        None => {
            let mut table = smg_hash_table();
            for name in ["ScenarioNo", "ZoneName", "PowerStarId", "Comet", "CometLimitTimer", "IsHidden"] {
                bcsv_io::HashTable::add(&mut table, name);
            }
            table
        }
    };

    let bcsv = from_file(hash_table, &bcsv_path, &IoOptions::default())?;

    println!("BCSV Info");
    println!("Entries: {}", bcsv.entry_count());
    println!("Fields: {}", bcsv.field_count());
    println!();

    println!("Fields");
    for field in bcsv.fields() {
        let name = bcsv.field_name(field.hash);
        println!(
            "+0x{:X} - {} - {} (mask 0x{:08X}, shift {})",
            field.start, name, field.field_type, field.bitmask, field.shift
        );
    }
    println!();

    println!("Entries");
    for row in 0..bcsv.entry_count() {
        let values: Vec<String> = bcsv
            .fields()
            .map(|field| match field.field_type {
                FieldType::Float => bcsv.get_float(row, field.hash).to_string(),
                FieldType::String | FieldType::StringOffset => bcsv.get_string(row, field.hash),
                FieldType::Short => bcsv.get_short(row, field.hash).to_string(),
                FieldType::Byte => bcsv.get_char(row, field.hash).to_string(),
                FieldType::Integer | FieldType::Integer2 => bcsv.get_signed_int(row, field.hash).to_string(),
            })
            .collect();
        println!("{}", values.join(", "));
    }

    Ok(())
}
