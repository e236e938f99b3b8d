//! CSV ingestion: turns plant exports into validated records for the engine.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use dacforge_core::{aggregation::WeeklyEntryBook, validation::validate_cycle};
use dacforge_schemas::{
    cycle::{AuxiliaryEnergy, CycleRecord},
    weekly::WeeklyEntry,
};
use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};
use tracing::{info, warn};

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// One row of the cycle export. Energy columns may instead come from a separate energy export.
#[derive(Debug, Deserialize)]
struct CycleRow {
    #[serde(rename = "Cycle #")]
    cycle_number: u32,
    #[serde(rename = "Machine")]
    machine: String,
    #[serde(rename = "Start Time")]
    start_time: String,
    #[serde(rename = "ADS CO2 (kg)", default)]
    ads_co2_kg: Option<f64>,
    #[serde(rename = "DES CO2 (kg)", default)]
    des_co2_kg: Option<f64>,
    #[serde(rename = "BAG CO2", default)]
    bag_co2_kg: Option<f64>,
    #[serde(rename = "eTotal kWh", default)]
    total_kwh: Option<f64>,
    #[serde(rename = "Steam (kg)", default)]
    steam_kg: Option<f64>,
    #[serde(rename = "Boiler (kWh)", default)]
    boiler_kwh: Option<f64>,
    #[serde(rename = "SRV/LRVP (kWh)", default)]
    srv_lrvp_kwh: Option<f64>,
    #[serde(rename = "CT (kWh)", default)]
    ct_kwh: Option<f64>,
    #[serde(rename = "NM1 Fan (kWh)", default)]
    nm1_fan_kwh: Option<f64>,
    #[serde(rename = "NM2 Fan (kWh)", default)]
    nm2_fan_kwh: Option<f64>,
    #[serde(rename = "NM3 Fan (kWh)", default)]
    nm3_fan_kwh: Option<f64>,
    #[serde(rename = "NM4 Fan (kWh)", default)]
    nm4_fan_kwh: Option<f64>,
}

impl CycleRow {
    fn energy(&self) -> EnergyColumns {
        EnergyColumns {
            boiler_kwh: self.boiler_kwh,
            srv_lrvp_kwh: self.srv_lrvp_kwh,
            ct_kwh: self.ct_kwh,
            nm1_fan_kwh: self.nm1_fan_kwh,
            nm2_fan_kwh: self.nm2_fan_kwh,
            nm3_fan_kwh: self.nm3_fan_kwh,
            nm4_fan_kwh: self.nm4_fan_kwh,
        }
    }
}

/// Boiler and auxiliary meter readings, from whichever export carries them.
#[derive(Debug, Default, Clone)]
struct EnergyColumns {
    boiler_kwh: Option<f64>,
    srv_lrvp_kwh: Option<f64>,
    ct_kwh: Option<f64>,
    nm1_fan_kwh: Option<f64>,
    nm2_fan_kwh: Option<f64>,
    nm3_fan_kwh: Option<f64>,
    nm4_fan_kwh: Option<f64>,
}

impl EnergyColumns {
    fn auxiliary(&self) -> Option<AuxiliaryEnergy> {
        let components: Vec<(&str, f64)> = [
            ("srv_lrvp", self.srv_lrvp_kwh),
            ("ct", self.ct_kwh),
            ("nm1_fan", self.nm1_fan_kwh),
            ("nm2_fan", self.nm2_fan_kwh),
            ("nm3_fan", self.nm3_fan_kwh),
            ("nm4_fan", self.nm4_fan_kwh),
        ]
        .into_iter()
        .filter_map(|(name, kwh)| kwh.map(|kwh| (name, kwh)))
        .collect();
        if components.is_empty() {
            return None;
        }
        Some(
            components
                .into_iter()
                .fold(AuxiliaryEnergy::new(), |aux, (name, kwh)| aux.with_component(name, kwh)),
        )
    }

    /// Fills gaps in `self` from `other`.
    fn or(self, other: &EnergyColumns) -> Self {
        Self {
            boiler_kwh: self.boiler_kwh.or(other.boiler_kwh),
            srv_lrvp_kwh: self.srv_lrvp_kwh.or(other.srv_lrvp_kwh),
            ct_kwh: self.ct_kwh.or(other.ct_kwh),
            nm1_fan_kwh: self.nm1_fan_kwh.or(other.nm1_fan_kwh),
            nm2_fan_kwh: self.nm2_fan_kwh.or(other.nm2_fan_kwh),
            nm3_fan_kwh: self.nm3_fan_kwh.or(other.nm3_fan_kwh),
            nm4_fan_kwh: self.nm4_fan_kwh.or(other.nm4_fan_kwh),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnergyRow {
    #[serde(rename = "Cycle #")]
    cycle_number: u32,
    #[serde(rename = "Machine")]
    machine: String,
    #[serde(rename = "eTotal (kWh)", default)]
    total_kwh: Option<f64>,
    #[serde(rename = "Boiler (kWh)", default)]
    boiler_kwh: Option<f64>,
    #[serde(rename = "SRV/LRVP (kWh)", default)]
    srv_lrvp_kwh: Option<f64>,
    #[serde(rename = "CT (kWh)", default)]
    ct_kwh: Option<f64>,
    #[serde(rename = "NM1 Fan (kWh)", default)]
    nm1_fan_kwh: Option<f64>,
    #[serde(rename = "NM2 Fan (kWh)", default)]
    nm2_fan_kwh: Option<f64>,
    #[serde(rename = "NM3 Fan (kWh)", default)]
    nm3_fan_kwh: Option<f64>,
    #[serde(rename = "NM4 Fan (kWh)", default)]
    nm4_fan_kwh: Option<f64>,
}

impl EnergyRow {
    fn energy(&self) -> EnergyColumns {
        EnergyColumns {
            boiler_kwh: self.boiler_kwh,
            srv_lrvp_kwh: self.srv_lrvp_kwh,
            ct_kwh: self.ct_kwh,
            nm1_fan_kwh: self.nm1_fan_kwh,
            nm2_fan_kwh: self.nm2_fan_kwh,
            nm3_fan_kwh: self.nm3_fan_kwh,
            nm4_fan_kwh: self.nm4_fan_kwh,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntryRow {
    week_start: NaiveDate,
    liquefied_co2_kg: f64,
    #[serde(default)]
    liquefaction_energy_kwh: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub added: usize,
    pub duplicates: usize,
    /// One message per row that failed parsing or validation.
    pub rejected: Vec<String>,
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Reads cycle records, optionally merging a separate per-cycle energy export.
///
/// Duplicate `(cycle number, machine)` keys keep the first accepted row; rows
/// with unparseable timestamps, missing CO₂ readings or negative values are
/// rejected and reported.
pub fn read_cycles(path: &Path, energy_path: Option<&Path>) -> Result<(Vec<CycleRecord>, ImportReport)> {
    let energy = match energy_path {
        Some(p) => read_energy(p)?,
        None => HashMap::new(),
    };

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open cycle CSV: {}", path.display()))?;
    let mut report = ImportReport::default();
    let mut seen = HashSet::new();
    let mut cycles = Vec::new();

    for (index, row) in reader.deserialize::<CycleRow>().enumerate() {
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.rejected.push(format!("line {}: {}", line, e));
                continue;
            }
        };
        let key = (row.cycle_number, row.machine.clone());
        if seen.contains(&key) {
            warn!(cycle = row.cycle_number, machine = %row.machine, "duplicate cycle skipped");
            report.duplicates += 1;
            continue;
        }
        let Some(start_time) = parse_timestamp(&row.start_time) else {
            report.rejected.push(format!(
                "line {}: unrecognised start time '{}'",
                line, row.start_time
            ));
            continue;
        };
        let (Some(ads_co2_kg), Some(des_co2_kg), Some(bag_co2_kg)) =
            (row.ads_co2_kg, row.des_co2_kg, row.bag_co2_kg)
        else {
            report
                .rejected
                .push(format!("line {}: missing ADS, DES or BAG CO2 value", line));
            continue;
        };

        let (metered_total, energy_columns) = match energy.get(&key) {
            Some(extra) => (extra.total_kwh, row.energy().or(&extra.energy())),
            None => (None, row.energy()),
        };
        let record = CycleRecord {
            cycle_number: row.cycle_number,
            machine: row.machine,
            start_time,
            ads_co2_kg,
            des_co2_kg,
            bag_co2_kg,
            thermal_energy_kwh: energy_columns.boiler_kwh.unwrap_or(0.0),
            auxiliary: energy_columns.auxiliary(),
            total_energy_kwh: metered_total.or(row.total_kwh),
            steam_kg: row.steam_kg.unwrap_or(0.0),
        };
        if let Err(e) = validate_cycle(&record) {
            report.rejected.push(format!("line {}: {}", line, e));
            continue;
        }

        let (cycle_number, machine) = record.key();
        seen.insert((cycle_number, machine.to_string()));
        report.date_range = Some(match report.date_range {
            Some((first, last)) => (first.min(start_time), last.max(start_time)),
            None => (start_time, start_time),
        });
        report.added += 1;
        cycles.push(record);
    }

    for message in &report.rejected {
        warn!("{}", message);
    }
    info!(
        path = %path.display(),
        added = report.added,
        duplicates = report.duplicates,
        rejected = report.rejected.len(),
        "imported cycles"
    );
    Ok((cycles, report))
}

fn read_energy(path: &Path) -> Result<HashMap<(u32, String), EnergyRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open energy CSV: {}", path.display()))?;
    let mut rows = HashMap::new();
    for row in reader.deserialize::<EnergyRow>() {
        let row = row.with_context(|| format!("Failed to parse energy CSV: {}", path.display()))?;
        rows.entry((row.cycle_number, row.machine.clone())).or_insert(row);
    }
    Ok(rows)
}

/// Reads weekly liquefied CO₂ entries; a later row for the same week replaces an earlier one.
pub fn read_entries(path: &Path) -> Result<WeeklyEntryBook> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open entries CSV: {}", path.display()))?;
    let mut book = WeeklyEntryBook::new();
    for row in reader.deserialize::<EntryRow>() {
        let row = row.with_context(|| format!("Failed to parse entries CSV: {}", path.display()))?;
        let mut entry = WeeklyEntry::new(row.week_start, row.liquefied_co2_kg)
            .with_liquefaction_energy(row.liquefaction_energy_kwh.unwrap_or(0.0));
        if let Some(notes) = row.notes.as_deref().filter(|n| !n.is_empty()) {
            entry = entry.with_notes(notes);
        }
        let week = row.week_start;
        if book
            .insert(entry)
            .with_context(|| format!("Invalid weekly entry for {}", week))?
            .is_some()
        {
            warn!(%week, "weekly entry replaced by a later row");
        }
    }
    info!(path = %path.display(), weeks = book.len(), "imported weekly entries");
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_common_timestamp_layouts() {
        assert!(parse_timestamp("2024-03-04 06:30:00").is_some());
        assert!(parse_timestamp("03/04/2024 06:30").is_some());
        assert_eq!(
            parse_timestamp("2024-03-04").map(|t| t.date()),
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn reads_cycles_with_metered_energy() {
        let cycles = csv_file(
            "Cycle #,Machine,Start Time,ADS CO2 (kg),DES CO2 (kg),BAG CO2,eTotal kWh,Steam (kg),Boiler (kWh),CT (kWh),NM1 Fan (kWh)\n\
             1,NM1,2024-03-04 06:30:00,10,9,8,150,2,100,20,5\n\
             1,NM1,2024-03-04 07:30:00,10,9,8,150,2,100,20,5\n\
             2,NM2,2024-03-05 06:30:00,11,9,8,140,2,100,,\n\
             3,NM3,not a date,11,9,8,140,2,100,,\n\
             4,NM4,2024-03-06 06:30:00,-1,9,8,140,2,100,,\n",
        );
        let (records, report) = read_cycles(cycles.path(), None).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.rejected.len(), 2);

        let metered = &records[0];
        assert_eq!(metered.thermal_energy_kwh, 100.0);
        assert_eq!(metered.auxiliary.as_ref().map(|a| a.total_kwh()), Some(25.0));

        let unmetered = &records[1];
        assert!(unmetered.auxiliary.is_none());
        assert_eq!(unmetered.total_energy_kwh, Some(140.0));
    }

    #[test]
    fn rejected_row_does_not_shadow_a_later_valid_one() {
        let cycles = csv_file(
            "Cycle #,Machine,Start Time,ADS CO2 (kg),DES CO2 (kg),BAG CO2,Boiler (kWh)\n\
             5,NM1,garbled,10,9,8,100\n\
             5,NM1,2024-03-04 06:30:00,10,9,8,100\n\
             6,NM2,2024-03-04 08:30:00,10,,8,100\n",
        );
        let (records, report) = read_cycles(cycles.path(), None).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key(), (5, "NM1"));
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.rejected.len(), 2);
        assert!(report.rejected[1].contains("missing"));
    }

    #[test]
    fn energy_export_fills_missing_columns() {
        let cycles = csv_file(
            "Cycle #,Machine,Start Time,ADS CO2 (kg),DES CO2 (kg),BAG CO2,eTotal kWh,Steam (kg)\n\
             7,NM2,2024-03-05 06:30:00,11,9,8,140,2\n",
        );
        let energy = csv_file(
            "Cycle #,Machine,eTotal (kWh),Boiler (kWh),SRV/LRVP (kWh),CT (kWh)\n\
             7,NM2,145,100,30,15\n",
        );
        let (records, _) = read_cycles(cycles.path(), Some(energy.path())).unwrap();
        assert_eq!(records[0].thermal_energy_kwh, 100.0);
        assert_eq!(records[0].total_energy_kwh, Some(145.0));
        assert_eq!(records[0].auxiliary.as_ref().map(|a| a.total_kwh()), Some(45.0));
    }

    #[test]
    fn later_entry_row_wins() {
        let entries = csv_file(
            "week_start,liquefied_co2_kg,liquefaction_energy_kwh,notes\n\
             2024-03-04,500,,first\n\
             2024-03-04,520,40,corrected\n",
        );
        let book = read_entries(entries.path()).unwrap();
        assert_eq!(book.len(), 1);
        let week = dacforge_core::week::WeekStart::new(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
            .unwrap();
        let entry = book.get(week).unwrap();
        assert_eq!(entry.liquefied_co2_kg, 520.0);
        assert_eq!(entry.liquefaction_energy_kwh, 40.0);
    }

    #[test]
    fn entry_on_a_wednesday_is_an_error() {
        let entries = csv_file("week_start,liquefied_co2_kg\n2024-03-06,500\n");
        assert!(read_entries(entries.path()).is_err());
    }
}
