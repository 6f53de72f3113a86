//! Example: Build a scenario table from entities, write it as BCSV, then read it back

use std::fs::File;
use std::io::BufWriter;

use bcsv_io::{from_file, smg_hash_table, BcsvIO, FieldType, FileHashTable, IoOptions, Serializable};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Scenario {
    scenario_no: u32,
    zone_name: String,
    power_star_id: u32,
    comet: String,
    comet_limit_timer: u32,
    is_hidden: bool,
}

impl Scenario {
    fn new(scenario_no: u32, comet: &str, comet_limit_timer: u32, is_hidden: bool) -> Self {
        Self {
            scenario_no,
            zone_name: "EggStarGalaxy".to_string(),
            power_star_id: scenario_no,
            comet: comet.to_string(),
            comet_limit_timer,
            is_hidden,
        }
    }
}

impl Serializable for Scenario {
    fn serialize(&self, io: &mut BcsvIO<FileHashTable>, entry_index: usize) {
        io.set_unsigned_int(entry_index, "ScenarioNo", self.scenario_no);
        io.set_string(entry_index, "ZoneName", self.zone_name.as_str());
        io.set_unsigned_int(entry_index, "PowerStarId", self.power_star_id);
        io.set_string(entry_index, "Comet", self.comet.as_str());
        io.set_unsigned_int(entry_index, "CometLimitTimer", self.comet_limit_timer);
        io.set_boolean(entry_index, "IsHidden", self.is_hidden);
    }

    fn deserialize(&mut self, io: &BcsvIO<FileHashTable>, entry_index: usize) {
        self.scenario_no = io.get_unsigned_int(entry_index, "ScenarioNo");
        self.zone_name = io.get_string(entry_index, "ZoneName");
        self.power_star_id = io.get_unsigned_int(entry_index, "PowerStarId");
        self.comet = io.get_string(entry_index, "Comet");
        self.comet_limit_timer = io.get_unsigned_int(entry_index, "CometLimitTimer");
        self.is_hidden = io.get_boolean(entry_index, "IsHidden");
    }
}

const FIELDS: [(&str, FieldType); 6] = [
    ("ScenarioNo", FieldType::Integer),
    ("ZoneName", FieldType::StringOffset),
    ("PowerStarId", FieldType::Integer),
    ("Comet", FieldType::StringOffset),
    ("CometLimitTimer", FieldType::Integer),
    ("IsHidden", FieldType::Byte),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let output = std::env::args().nth(1).unwrap_or_else(|| "scenariodata.bcsv".to_string());

    let mut bcsv = BcsvIO::new(smg_hash_table());
    for (name, field_type) in FIELDS {
        bcsv.add_field(name, field_type)?;
    }

    let scenarios = [
        Scenario::new(1, "", 0, false),
        Scenario::new(2, "", 0, false),
        Scenario::new(3, "Red", 0, false),
        Scenario::new(4, "Dark", 180, true),
    ];

    let mut writer = BufWriter::new(File::create(&output)?);
    bcsv.save(&scenarios, &mut writer)?;
    drop(writer);

    println!("BCSV Info");
    println!("Entries: {}", bcsv.entry_count());
    println!("Fields: {}", bcsv.field_count());
    println!("Entry size: {}", bcsv.entry_size());
    println!("File size: {} bytes before strings", bcsv.projected_file_size(scenarios.len()));
    println!("\nWritten to {}", output);

    let reloaded = from_file(smg_hash_table(), &output, &IoOptions::default())?;
    let restored: Vec<Scenario> = reloaded.deserialize_all();

    println!("\nRead back from {}", output);
    for scenario in &restored {
        println!("{:?}", scenario);
    }

    Ok(())
}
