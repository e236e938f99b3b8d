use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single line of the plant's embodied-emissions inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbodiedInfrastructureItem {
    pub zone: String,
    pub item: String,
    #[serde(default)]
    pub material_type: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// kg CO₂e per kg; overrides the configured material factor when present.
    #[serde(default)]
    pub emission_factor: Option<f64>,
    /// Pre-computed embodied total; takes precedence over weight × factor.
    #[serde(default)]
    pub embodied_co2_kg: Option<f64>,
    #[serde(default)]
    pub lifetime_years: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorbentBatch {
    pub batch_number: u32,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub alumina_kg: Option<f64>,
    #[serde(default)]
    pub pei_kg: Option<f64>,
    #[serde(default)]
    pub methanol_kg: Option<f64>,
    #[serde(default)]
    pub production_embodied_kg: f64,
    #[serde(default)]
    pub eol_embodied_kg: f64,
    #[serde(default)]
    pub lifetime_weeks: Option<u32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl SorbentBatch {
    pub fn total_embodied_kg(&self) -> f64 {
        self.production_embodied_kg + self.eol_embodied_kg
    }

    /// Material quantities as `(material, kg)` pairs, skipping unrecorded ones.
    pub fn material_quantities(&self) -> Vec<(&'static str, f64)> {
        [
            ("alumina", self.alumina_kg),
            ("pei", self.pei_kg),
            ("methanol", self.methanol_kg),
        ]
        .into_iter()
        .filter_map(|(name, kg)| kg.map(|kg| (name, kg)))
        .collect()
    }
}
