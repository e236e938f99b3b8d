use crate::{error::DacError, validation::validate_configuration};
use chrono::NaiveDate;
use dacforge_schemas::{
    configuration::Configuration,
    embodied::{EmbodiedInfrastructureItem, SorbentBatch},
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const FIXED_FORMULA_EMISSION_FACTOR_KG: f64 = 365.11;
pub const PLANT_LIFETIME_YEARS: f64 = 10.0;
pub const ANNUAL_CAPTURE_TONNES: f64 = 30.0;
pub const WEEKS_IN_PLANT_LIFETIME: f64 = 520.0;
const WEEKS_PER_YEAR: u32 = 52;

/// Weekly embodied charge when no inventory is available.
pub fn fixed_formula_weekly_charge_kg() -> f64 {
    FIXED_FORMULA_EMISSION_FACTOR_KG * PLANT_LIFETIME_YEARS * ANNUAL_CAPTURE_TONNES
        / WEEKS_IN_PLANT_LIFETIME
}

/// Embodied CO₂ of one inventory line: the explicit total, else weight × item
/// factor, else weight × the configured factor for its material.
pub fn item_embodied_kg(item: &EmbodiedInfrastructureItem, config: &Configuration) -> Option<f64> {
    if let Some(embodied) = item.embodied_co2_kg {
        return Some(embodied);
    }
    let weight = item.weight_kg?;
    let factor = item.emission_factor.or_else(|| {
        item.material_type
            .as_deref()
            .and_then(|m| config.material_emission_factor(m))
    })?;
    Some(weight * factor)
}

fn item_lifetime_weeks(
    item: &EmbodiedInfrastructureItem,
    config: &Configuration,
) -> Result<u32, DacError> {
    let weeks = match item.lifetime_years {
        Some(years) => years.checked_mul(WEEKS_PER_YEAR).ok_or_else(|| {
            DacError::invalid_input(
                "lifetime_years",
                &format!("infrastructure item '{}' in zone '{}'", item.item, item.zone),
                format!("{} years does not fit in a week count", years),
            )
        })?,
        None => 0,
    };
    Ok(if weeks > 0 {
        weeks
    } else {
        config.infrastructure_lifetime_weeks
    })
}

/// Total embodied CO₂ of a sorbent batch. Recorded production and end-of-life
/// totals win; otherwise material quantities are priced with configured factors.
pub fn batch_embodied_kg(batch: &SorbentBatch, config: &Configuration) -> f64 {
    let recorded = batch.total_embodied_kg();
    if recorded > 0.0 {
        return recorded;
    }
    batch
        .material_quantities()
        .into_iter()
        .filter_map(|(material, kg)| config.material_emission_factor(material).map(|f| kg * f))
        .sum()
}

/// Whether `batch` is in service on `date`.
pub fn batch_in_service(batch: &SorbentBatch, date: NaiveDate) -> bool {
    batch.is_active
        && batch.start_date <= date
        && batch.end_date.map_or(true, |end| date <= end)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmbodiedBreakdown {
    /// Embodied CO₂ per zone, kg.
    pub zone_totals_kg: BTreeMap<String, f64>,
    pub infrastructure_total_kg: f64,
    pub infrastructure_weekly_kg: f64,
    pub sorbent_weekly_kg: f64,
    /// Items with neither an embodied total nor a usable weight and factor.
    pub unpriced_items: Vec<String>,
}

impl EmbodiedBreakdown {
    pub fn weekly_total_kg(&self) -> f64 {
        self.infrastructure_weekly_kg + self.sorbent_weekly_kg
    }

    /// `config` with its weekly charges replaced by this breakdown's.
    pub fn apply_to(&self, config: &Configuration) -> Configuration {
        config
            .clone()
            .with_weekly_charges(self.infrastructure_weekly_kg, self.sorbent_weekly_kg)
    }
}

/// Amortizes the inventory into weekly charges for the week containing `on`.
pub fn amortize(
    items: &[EmbodiedInfrastructureItem],
    batches: &[SorbentBatch],
    config: &Configuration,
    on: NaiveDate,
) -> Result<EmbodiedBreakdown, DacError> {
    validate_configuration(config)?;
    let mut breakdown = EmbodiedBreakdown::default();

    for item in items {
        let Some(embodied) = item_embodied_kg(item, config) else {
            breakdown
                .unpriced_items
                .push(format!("{} / {}", item.zone, item.item));
            continue;
        };
        if !embodied.is_finite() || embodied < 0.0 {
            return Err(DacError::invalid_input(
                "embodied_co2_kg",
                &format!("infrastructure item '{}' in zone '{}'", item.item, item.zone),
                format!("must be non-negative, got {}", embodied),
            ));
        }
        *breakdown
            .zone_totals_kg
            .entry(item.zone.clone())
            .or_insert(0.0) += embodied;
        breakdown.infrastructure_total_kg += embodied;
        breakdown.infrastructure_weekly_kg += embodied / item_lifetime_weeks(item, config)? as f64;
    }

    for batch in batches.iter().filter(|b| batch_in_service(b, on)) {
        let embodied = batch_embodied_kg(batch, config);
        if !embodied.is_finite() || embodied < 0.0 {
            return Err(DacError::invalid_input(
                "total_embodied_kg",
                &format!("sorbent batch {}", batch.batch_number),
                format!("must be non-negative, got {}", embodied),
            ));
        }
        let lifetime = batch
            .lifetime_weeks
            .filter(|w| *w > 0)
            .unwrap_or(config.sorbent_lifetime_weeks);
        breakdown.sorbent_weekly_kg += embodied / lifetime as f64;
    }

    Ok(breakdown)
}
