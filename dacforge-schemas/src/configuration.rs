use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_GRID_EMISSION_FACTOR: f64 = 0.049;
pub const DEFAULT_INFRASTRUCTURE_LIFETIME_WEEKS: u32 = 520;
pub const DEFAULT_SORBENT_LIFETIME_WEEKS: u32 = 156;
/// 365.11 kg CO₂e × 10 years × 30 t/yr spread over 520 weeks.
pub const DEFAULT_WEEKLY_INFRASTRUCTURE_CHARGE_KG: f64 = 365.11 * 10.0 * 30.0 / 520.0;

/// Emission factors and amortized charges for one calculation.
///
/// Every engine call takes this explicitly; a result is reproducible from its
/// records plus the `Configuration` it was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// kg CO₂e per kWh drawn from the grid.
    pub grid_emission_factor: f64,
    /// kg CO₂e per kWh of thermal energy in the alternate (geothermal) scenario.
    pub alternate_thermal_emission_factor: f64,
    /// kg CO₂e per kg of material, keyed by material name.
    pub material_emission_factors: BTreeMap<String, f64>,
    pub infrastructure_lifetime_weeks: u32,
    pub sorbent_lifetime_weeks: u32,
    pub weekly_infrastructure_charge_kg: f64,
    pub weekly_sorbent_charge_kg: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            grid_emission_factor: DEFAULT_GRID_EMISSION_FACTOR,
            alternate_thermal_emission_factor: 0.0,
            material_emission_factors: BTreeMap::new(),
            infrastructure_lifetime_weeks: DEFAULT_INFRASTRUCTURE_LIFETIME_WEEKS,
            sorbent_lifetime_weeks: DEFAULT_SORBENT_LIFETIME_WEEKS,
            weekly_infrastructure_charge_kg: DEFAULT_WEEKLY_INFRASTRUCTURE_CHARGE_KG,
            weekly_sorbent_charge_kg: 0.0,
        }
    }
}

impl Configuration {
    pub fn with_alternate_thermal_emission_factor(mut self, factor: f64) -> Self {
        self.alternate_thermal_emission_factor = factor;
        self
    }

    pub fn with_material_emission_factor(mut self, material: &str, factor: f64) -> Self {
        self.material_emission_factors
            .insert(material.to_string(), factor);
        self
    }

    /// Replaces both amortized weekly charges.
    pub fn with_weekly_charges(mut self, infrastructure_kg: f64, sorbent_kg: f64) -> Self {
        self.weekly_infrastructure_charge_kg = infrastructure_kg;
        self.weekly_sorbent_charge_kg = sorbent_kg;
        self
    }

    pub fn weekly_embodied_charge_kg(&self) -> f64 {
        self.weekly_infrastructure_charge_kg + self.weekly_sorbent_charge_kg
    }

    pub fn material_emission_factor(&self, material: &str) -> Option<f64> {
        self.material_emission_factors
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(material))
            .map(|(_, factor)| *factor)
    }
}
