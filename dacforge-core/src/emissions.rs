use crate::{
    aggregation::WeeklyAggregate,
    error::DacError,
    ratio::Ratio,
    validation::{non_negative, validate_configuration},
    week::WeekStart,
};
use dacforge_schemas::configuration::Configuration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OperationalEmissions {
    pub thermal_kg: f64,
    pub auxiliary_kg: f64,
    pub total_kg: f64,
}

/// Energy × emission factor, with the thermal term's factor supplied separately
/// so the same function evaluates grid and alternate-fuel scenarios.
pub fn operational_emissions(
    thermal_energy_kwh: f64,
    auxiliary_energy_kwh: f64,
    thermal_emission_factor: f64,
    auxiliary_emission_factor: f64,
) -> OperationalEmissions {
    let thermal_kg = thermal_energy_kwh * thermal_emission_factor;
    let auxiliary_kg = auxiliary_energy_kwh * auxiliary_emission_factor;
    OperationalEmissions {
        thermal_kg,
        auxiliary_kg,
        total_kg: thermal_kg + auxiliary_kg,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EmbodiedEmissions {
    pub infrastructure_kg: f64,
    pub sorbent_kg: f64,
    pub total_kg: f64,
}

/// Applies the configured weekly charges; amortization happens upstream.
pub fn embodied_emissions(config: &Configuration) -> EmbodiedEmissions {
    EmbodiedEmissions {
        infrastructure_kg: config.weekly_infrastructure_charge_kg,
        sorbent_kg: config.weekly_sorbent_charge_kg,
        total_kg: config.weekly_infrastructure_charge_kg + config.weekly_sorbent_charge_kg,
    }
}

/// CO₂ lost between measurement stages. Losses reduce capture credit and are
/// never counted as emissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageLosses {
    /// Adsorbed → desorbed.
    pub stage_1_kg: f64,
    /// Desorbed → collected in the bag.
    pub stage_2_kg: f64,
    /// Bag → liquefied. Negative when carryover from earlier cycles inflates the week.
    pub stage_3_kg: f64,
    pub total_kg: f64,
    pub stage_1_pct: Ratio,
    pub stage_2_pct: Ratio,
    pub stage_3_pct: Ratio,
}

pub fn stage_losses(ads_kg: f64, des_kg: f64, bag_kg: f64, liquefied_kg: f64) -> StageLosses {
    let stage_1_kg = ads_kg - des_kg;
    let stage_2_kg = des_kg - bag_kg;
    let stage_3_kg = bag_kg - liquefied_kg;
    StageLosses {
        stage_1_kg,
        stage_2_kg,
        stage_3_kg,
        total_kg: stage_1_kg + stage_2_kg + stage_3_kg,
        stage_1_pct: Ratio::percent(stage_1_kg, ads_kg),
        stage_2_pct: Ratio::percent(stage_2_kg, des_kg),
        stage_3_pct: Ratio::percent(stage_3_kg, bag_kg),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetStatus {
    NetPositive,
    Neutral,
    NetNegative,
}

impl NetStatus {
    pub fn classify(net_removal_kg: f64) -> Self {
        if net_removal_kg > 0.0 {
            NetStatus::NetPositive
        } else if net_removal_kg < 0.0 {
            NetStatus::NetNegative
        } else {
            NetStatus::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NetStatus::NetPositive => "NET_POSITIVE",
            NetStatus::Neutral => "NEUTRAL",
            NetStatus::NetNegative => "NET_NEGATIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityFlag {
    /// Liquefied CO₂ exceeded the week's bag CO₂.
    Stage3Carryover,
    /// At least one cycle had no separately metered auxiliary energy.
    UnmeteredAuxiliary,
}

/// Everything derived for one week. Never mutated; recompute to update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyResult {
    pub week: WeekStart,
    pub cycle_count: usize,
    pub ads_co2_kg: f64,
    pub des_co2_kg: f64,
    pub bag_co2_kg: f64,
    pub liquefied_co2_kg: f64,
    pub thermal_energy_kwh: f64,
    pub auxiliary_energy_kwh: f64,
    pub total_energy_kwh: f64,
    pub steam_kg: f64,
    pub losses: StageLosses,
    pub operational: OperationalEmissions,
    pub embodied: EmbodiedEmissions,
    pub gross_captured_kg: f64,
    pub total_emissions_kg: f64,
    pub net_removal_kg: f64,
    pub status: NetStatus,
    pub flags: Vec<DataQualityFlag>,
}

impl WeeklyResult {
    pub fn has_flag(&self, flag: DataQualityFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Computes a week with the grid factor applied to both energy terms.
pub fn calculate_week(
    aggregate: &WeeklyAggregate,
    config: &Configuration,
) -> Result<WeeklyResult, DacError> {
    calculate_week_with_thermal_factor(aggregate, config, config.grid_emission_factor)
}

/// Computes a week with `thermal_emission_factor` on the thermal term and the
/// grid factor on auxiliary energy.
pub fn calculate_week_with_thermal_factor(
    aggregate: &WeeklyAggregate,
    config: &Configuration,
    thermal_emission_factor: f64,
) -> Result<WeeklyResult, DacError> {
    validate_configuration(config)?;
    if !thermal_emission_factor.is_finite() || thermal_emission_factor < 0.0 {
        return Err(DacError::InvalidConfig(format!(
            "thermal emission factor must be non-negative, got {}",
            thermal_emission_factor
        )));
    }

    let context = format!("week starting {}", aggregate.week.date());
    let liquefied_co2_kg = aggregate
        .liquefied_co2_kg
        .ok_or_else(|| DacError::missing_input("liquefied_co2_kg", context.clone()))?;

    for (field, value) in [
        ("ads_co2_kg", aggregate.ads_co2_kg),
        ("des_co2_kg", aggregate.des_co2_kg),
        ("bag_co2_kg", aggregate.bag_co2_kg),
        ("liquefied_co2_kg", liquefied_co2_kg),
        ("thermal_energy_kwh", aggregate.thermal_energy_kwh),
        ("auxiliary_energy_kwh", aggregate.auxiliary_energy_kwh),
        ("steam_kg", aggregate.steam_kg),
    ] {
        non_negative(field, value, &context)?;
    }

    let losses = stage_losses(
        aggregate.ads_co2_kg,
        aggregate.des_co2_kg,
        aggregate.bag_co2_kg,
        liquefied_co2_kg,
    );
    let operational = operational_emissions(
        aggregate.thermal_energy_kwh,
        aggregate.auxiliary_energy_kwh,
        thermal_emission_factor,
        config.grid_emission_factor,
    );
    let embodied = embodied_emissions(config);

    let gross_captured_kg = liquefied_co2_kg;
    let total_emissions_kg = operational.total_kg + embodied.total_kg;
    let net_removal_kg = gross_captured_kg - total_emissions_kg;

    let mut flags = Vec::new();
    if losses.stage_3_kg < 0.0 {
        flags.push(DataQualityFlag::Stage3Carryover);
    }
    if aggregate.unmetered_cycles > 0 {
        flags.push(DataQualityFlag::UnmeteredAuxiliary);
    }

    Ok(WeeklyResult {
        week: aggregate.week,
        cycle_count: aggregate.cycle_count,
        ads_co2_kg: aggregate.ads_co2_kg,
        des_co2_kg: aggregate.des_co2_kg,
        bag_co2_kg: aggregate.bag_co2_kg,
        liquefied_co2_kg,
        thermal_energy_kwh: aggregate.thermal_energy_kwh,
        auxiliary_energy_kwh: aggregate.auxiliary_energy_kwh,
        total_energy_kwh: aggregate.total_energy_kwh(),
        steam_kg: aggregate.steam_kg,
        losses,
        operational,
        embodied,
        gross_captured_kg,
        total_emissions_kg,
        net_removal_kg,
        status: NetStatus::classify(net_removal_kg),
        flags,
    })
}
