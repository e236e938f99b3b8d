use crate::{
    emissions::{operational_emissions, NetStatus, WeeklyResult},
    error::DacError,
    ratio::Ratio,
    validation::non_negative,
};
use dacforge_schemas::configuration::Configuration;
use serde::Serialize;

/// kWh consumed per tonne of liquefied CO₂.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyIntensity {
    pub total_kwh_per_tonne: Ratio,
    pub thermal_kwh_per_tonne: Ratio,
    pub auxiliary_kwh_per_tonne: Ratio,
}

pub fn energy_intensity(result: &WeeklyResult) -> EnergyIntensity {
    let tonnes = result.liquefied_co2_kg / 1000.0;
    EnergyIntensity {
        total_kwh_per_tonne: Ratio::of(result.total_energy_kwh, tonnes),
        thermal_kwh_per_tonne: Ratio::of(result.thermal_energy_kwh, tonnes),
        auxiliary_kwh_per_tonne: Ratio::of(result.auxiliary_energy_kwh, tonnes),
    }
}

/// Fraction of adsorbed CO₂ that ended up liquefied.
pub fn capture_efficiency(result: &WeeklyResult) -> Ratio {
    Ratio::of(result.liquefied_co2_kg, result.ads_co2_kg)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakEven {
    /// Liquefied CO₂ at which net removal is exactly zero.
    pub min_liquefied_kg: f64,
    pub actual_liquefied_kg: f64,
    /// Positive when the week cleared break-even.
    pub surplus_kg: f64,
    pub status: NetStatus,
}

pub fn break_even(result: &WeeklyResult) -> BreakEven {
    let min_liquefied_kg = result.operational.total_kg + result.embodied.total_kg;
    BreakEven {
        min_liquefied_kg,
        actual_liquefied_kg: result.liquefied_co2_kg,
        surplus_kg: result.liquefied_co2_kg - min_liquefied_kg,
        status: NetStatus::classify(result.liquefied_co2_kg - min_liquefied_kg),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyReduction {
    pub current_energy_kwh: f64,
    /// Highest consumption that keeps net removal at or above zero.
    /// `Undefined` when the emission factor is zero.
    pub max_energy_kwh: Ratio,
    pub reduction_kwh: Ratio,
    /// False when the embodied charge alone exceeds capture; the reduction
    /// then exceeds the current consumption.
    pub achievable: bool,
}

/// Solves `capture - energy × ef - embodied = 0` for energy.
pub fn energy_reduction_to_break_even(
    capture_kg: f64,
    current_energy_kwh: f64,
    embodied_kg: f64,
    grid_emission_factor: f64,
) -> Result<EnergyReduction, DacError> {
    let context = "energy reduction to break-even";
    non_negative("capture_kg", capture_kg, context)?;
    non_negative("current_energy_kwh", current_energy_kwh, context)?;
    non_negative("embodied_kg", embodied_kg, context)?;
    non_negative("grid_emission_factor", grid_emission_factor, context)?;

    let headroom = capture_kg - embodied_kg;
    let max_energy_kwh = Ratio::of(headroom, grid_emission_factor);
    let (reduction_kwh, achievable) = match max_energy_kwh {
        Ratio::Value(max) => (
            Ratio::Value((current_energy_kwh - max).max(0.0)),
            max >= 0.0,
        ),
        Ratio::Undefined if headroom >= 0.0 => (Ratio::Value(0.0), true),
        Ratio::Undefined => (Ratio::Undefined, false),
    };

    Ok(EnergyReduction {
        current_energy_kwh,
        max_energy_kwh,
        reduction_kwh,
        achievable,
    })
}

pub fn energy_reduction_for_week(
    result: &WeeklyResult,
    config: &Configuration,
) -> Result<EnergyReduction, DacError> {
    energy_reduction_to_break_even(
        result.liquefied_co2_kg,
        result.total_energy_kwh,
        result.embodied.total_kg,
        config.grid_emission_factor,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    CaptureEfficiency,
    ThermalEnergy,
    AuxiliaryEnergy,
    GridEmissionFactor,
    EmbodiedCharge,
}

impl SensitivityParameter {
    pub const ALL: [SensitivityParameter; 5] = [
        SensitivityParameter::CaptureEfficiency,
        SensitivityParameter::ThermalEnergy,
        SensitivityParameter::AuxiliaryEnergy,
        SensitivityParameter::GridEmissionFactor,
        SensitivityParameter::EmbodiedCharge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SensitivityParameter::CaptureEfficiency => "Capture efficiency",
            SensitivityParameter::ThermalEnergy => "Thermal energy",
            SensitivityParameter::AuxiliaryEnergy => "Auxiliary energy",
            SensitivityParameter::GridEmissionFactor => "Grid emission factor",
            SensitivityParameter::EmbodiedCharge => "Weekly embodied charge",
        }
    }
}

/// The inputs net removal depends on, each of which can be perturbed.
///
/// Capture efficiency is applied as a multiplier on liquefied CO₂ (1.0 at base).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityBase {
    pub liquefied_co2_kg: f64,
    pub capture_efficiency: f64,
    pub thermal_energy_kwh: f64,
    pub auxiliary_energy_kwh: f64,
    pub grid_emission_factor: f64,
    pub embodied_kg: f64,
}

impl SensitivityBase {
    pub fn from_week(result: &WeeklyResult, config: &Configuration) -> Self {
        Self {
            liquefied_co2_kg: result.liquefied_co2_kg,
            capture_efficiency: 1.0,
            thermal_energy_kwh: result.thermal_energy_kwh,
            auxiliary_energy_kwh: result.auxiliary_energy_kwh,
            grid_emission_factor: config.grid_emission_factor,
            embodied_kg: result.embodied.total_kg,
        }
    }

    pub fn net_removal_kg(&self) -> f64 {
        let operational = operational_emissions(
            self.thermal_energy_kwh,
            self.auxiliary_energy_kwh,
            self.grid_emission_factor,
            self.grid_emission_factor,
        );
        self.liquefied_co2_kg * self.capture_efficiency - (operational.total_kg + self.embodied_kg)
    }

    pub fn value_of(&self, parameter: SensitivityParameter) -> f64 {
        match parameter {
            SensitivityParameter::CaptureEfficiency => self.capture_efficiency,
            SensitivityParameter::ThermalEnergy => self.thermal_energy_kwh,
            SensitivityParameter::AuxiliaryEnergy => self.auxiliary_energy_kwh,
            SensitivityParameter::GridEmissionFactor => self.grid_emission_factor,
            SensitivityParameter::EmbodiedCharge => self.embodied_kg,
        }
    }

    pub fn scaled(&self, parameter: SensitivityParameter, factor: f64) -> Self {
        let mut scaled = *self;
        let slot = match parameter {
            SensitivityParameter::CaptureEfficiency => &mut scaled.capture_efficiency,
            SensitivityParameter::ThermalEnergy => &mut scaled.thermal_energy_kwh,
            SensitivityParameter::AuxiliaryEnergy => &mut scaled.auxiliary_energy_kwh,
            SensitivityParameter::GridEmissionFactor => &mut scaled.grid_emission_factor,
            SensitivityParameter::EmbodiedCharge => &mut scaled.embodied_kg,
        };
        *slot *= factor;
        scaled
    }
}

pub const SENSITIVITY_HIGH: f64 = 1.10;
pub const SENSITIVITY_LOW: f64 = 0.90;
const SENSITIVITY_SPAN: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityEntry {
    pub parameter: SensitivityParameter,
    pub base_value: f64,
    pub net_high_kg: f64,
    pub net_low_kg: f64,
    pub delta_high_kg: f64,
    pub delta_low_kg: f64,
    /// `(net_high - net_low) / (base_net × 0.20)`; undefined at a zero base.
    pub elasticity: Ratio,
}

impl SensitivityEntry {
    pub fn swing_kg(&self) -> f64 {
        (self.net_high_kg - self.net_low_kg).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityReport {
    pub base_net_removal_kg: f64,
    pub entries: Vec<SensitivityEntry>,
}

impl SensitivityReport {
    /// Entries by descending swing, for tornado charts.
    pub fn tornado_order(&self) -> Vec<&SensitivityEntry> {
        let mut ordered: Vec<&SensitivityEntry> = self.entries.iter().collect();
        ordered.sort_by(|a, b| b.swing_kg().total_cmp(&a.swing_kg()));
        ordered
    }

    pub fn entry(&self, parameter: SensitivityParameter) -> Option<&SensitivityEntry> {
        self.entries.iter().find(|e| e.parameter == parameter)
    }
}

/// One-at-a-time ±10 % perturbation of each parameter around `base`.
pub fn sensitivity(base: &SensitivityBase) -> SensitivityReport {
    let base_net = base.net_removal_kg();
    let entries = SensitivityParameter::ALL
        .iter()
        .map(|&parameter| {
            let net_high_kg = base.scaled(parameter, SENSITIVITY_HIGH).net_removal_kg();
            let net_low_kg = base.scaled(parameter, SENSITIVITY_LOW).net_removal_kg();
            SensitivityEntry {
                parameter,
                base_value: base.value_of(parameter),
                net_high_kg,
                net_low_kg,
                delta_high_kg: net_high_kg - base_net,
                delta_low_kg: net_low_kg - base_net,
                elasticity: Ratio::of(
                    net_high_kg - net_low_kg,
                    base_net * SENSITIVITY_SPAN,
                ),
            }
        })
        .collect();

    SensitivityReport {
        base_net_removal_kg: base_net,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregation::WeeklyAggregate, emissions::calculate_week, week::WeekStart};
    use chrono::NaiveDate;

    fn week(liquefied: f64, thermal: f64, auxiliary: f64, embodied: f64) -> (WeeklyResult, Configuration) {
        let config = Configuration::default().with_weekly_charges(embodied, 0.0);
        let aggregate = WeeklyAggregate {
            ads_co2_kg: 900.0,
            des_co2_kg: 800.0,
            bag_co2_kg: 700.0,
            liquefied_co2_kg: Some(liquefied),
            thermal_energy_kwh: thermal,
            auxiliary_energy_kwh: auxiliary,
            ..WeeklyAggregate::empty(
                WeekStart::new(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()).unwrap(),
            )
        };
        (calculate_week(&aggregate, &config).unwrap(), config)
    }

    #[test]
    fn intensity_per_tonne() {
        let (result, _) = week(600.0, 6_000.0, 3_000.0, 100.0);
        let intensity = energy_intensity(&result);
        assert_eq!(intensity.total_kwh_per_tonne, Ratio::Value(15_000.0));
        assert_eq!(intensity.thermal_kwh_per_tonne, Ratio::Value(10_000.0));
    }

    #[test]
    fn zero_liquefied_makes_intensity_undefined() {
        let (result, _) = week(0.0, 6_000.0, 3_000.0, 100.0);
        let intensity = energy_intensity(&result);
        assert!(intensity.total_kwh_per_tonne.is_undefined());
        assert!(intensity.auxiliary_kwh_per_tonne.is_undefined());
    }

    #[test]
    fn break_even_threshold_matches_status() {
        for liquefied in [300.0, 541.0, 900.0] {
            let (result, _) = week(liquefied, 6_000.0, 3_000.0, 100.0);
            let be = break_even(&result);
            assert_eq!(be.status, result.status);
            assert_eq!(
                result.status == NetStatus::NetPositive,
                result.liquefied_co2_kg > be.min_liquefied_kg
            );
        }
    }

    #[test]
    fn reduction_needed_when_below_break_even() {
        let r = energy_reduction_to_break_even(400.0, 9_000.0, 80.0, 0.049).unwrap();
        let max = r.max_energy_kwh.value().unwrap();
        assert!((max - 320.0 / 0.049).abs() < 1e-6);
        assert!((r.reduction_kwh.value().unwrap() - (9_000.0 - max)).abs() < 1e-6);
        assert!(r.achievable);
    }

    #[test]
    fn no_reduction_when_already_positive() {
        let r = energy_reduction_to_break_even(1_000.0, 1_000.0, 80.0, 0.049).unwrap();
        assert_eq!(r.reduction_kwh, Ratio::Value(0.0));
    }

    #[test]
    fn unreachable_when_embodied_exceeds_capture() {
        let r = energy_reduction_to_break_even(50.0, 1_000.0, 80.0, 0.049).unwrap();
        assert!(!r.achievable);
        let max = r.max_energy_kwh.value().unwrap();
        assert!((max - (-30.0 / 0.049)).abs() < 1e-9);
        let reduction = r.reduction_kwh.value().unwrap();
        assert!((reduction - (1_000.0 + 30.0 / 0.049)).abs() < 1e-9);
    }

    #[test]
    fn zero_grid_factor_leaves_max_energy_undefined() {
        let r = energy_reduction_to_break_even(100.0, 1_000.0, 80.0, 0.0).unwrap();
        assert!(r.max_energy_kwh.is_undefined());
        assert_eq!(r.reduction_kwh, Ratio::Value(0.0));
        let r = energy_reduction_to_break_even(50.0, 1_000.0, 80.0, 0.0).unwrap();
        assert!(r.reduction_kwh.is_undefined());
    }

    #[test]
    fn negative_inputs_are_rejected() {
        assert!(matches!(
            energy_reduction_to_break_even(-1.0, 1.0, 1.0, 0.049),
            Err(DacError::InvalidInput { .. })
        ));
    }

    #[test]
    fn sensitivity_perturbs_one_parameter_at_a_time() {
        let (result, config) = week(600.0, 6_500.0, 2_500.0, 145.48);
        let report = sensitivity(&SensitivityBase::from_week(&result, &config));
        assert!((report.base_net_removal_kg - result.net_removal_kg).abs() < 1e-9);
        assert_eq!(report.entries.len(), 5);

        let thermal = report.entry(SensitivityParameter::ThermalEnergy).unwrap();
        assert!((thermal.delta_high_kg + 31.85).abs() < 1e-9);
        assert!((thermal.delta_low_kg - 31.85).abs() < 1e-9);

        let capture = report.entry(SensitivityParameter::CaptureEfficiency).unwrap();
        assert!((capture.delta_high_kg - 60.0).abs() < 1e-9);
        let expected = 120.0 / (report.base_net_removal_kg * 0.2);
        assert!((capture.elasticity.value().unwrap() - expected).abs() < 1e-6);

        assert_eq!(
            report.tornado_order()[0].parameter,
            SensitivityParameter::CaptureEfficiency
        );
    }

    #[test]
    fn elasticity_undefined_at_zero_base() {
        let base = SensitivityBase {
            liquefied_co2_kg: 100.0,
            capture_efficiency: 1.0,
            thermal_energy_kwh: 0.0,
            auxiliary_energy_kwh: 0.0,
            grid_emission_factor: 0.049,
            embodied_kg: 100.0,
        };
        let report = sensitivity(&base);
        assert_eq!(report.base_net_removal_kg, 0.0);
        assert!(report.entries.iter().all(|e| e.elasticity.is_undefined()));
    }
}
