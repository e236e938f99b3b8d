use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Manually measured liquefied CO₂ for one ISO week, keyed by the week's Monday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyEntry {
    pub week_start: NaiveDate,
    pub liquefied_co2_kg: f64,
    /// Plant-level liquefaction energy, booked as auxiliary energy for the week.
    #[serde(default)]
    pub liquefaction_energy_kwh: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WeeklyEntry {
    pub fn new(week_start: NaiveDate, liquefied_co2_kg: f64) -> Self {
        Self {
            week_start,
            liquefied_co2_kg,
            liquefaction_energy_kwh: 0.0,
            notes: None,
        }
    }

    pub fn with_liquefaction_energy(mut self, kwh: f64) -> Self {
        self.liquefaction_energy_kwh = kwh;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}
