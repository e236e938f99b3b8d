use super::{settings::SimulationSettings, stats};
use crate::{
    emissions::{operational_emissions, WeeklyResult},
    error::DacError,
    validation::validate_configuration,
};
use dacforge_schemas::configuration::Configuration;
use rand::Rng;
use rand_distr::{Beta, Distribution, Normal};
use serde::{Deserialize, Serialize};

pub const CURRENT_SCENARIO: &str = "current";
pub const ALTERNATE_SCENARIO: &str = "alternate";

/// A named emissions variant, differing only in the factor on thermal energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub thermal_emission_factor: f64,
}

impl Scenario {
    pub fn new(name: &str, thermal_emission_factor: f64) -> Self {
        Self {
            name: name.to_string(),
            thermal_emission_factor,
        }
    }

    /// Thermal energy drawn from the grid.
    pub fn current(config: &Configuration) -> Self {
        Self::new(CURRENT_SCENARIO, config.grid_emission_factor)
    }

    /// Thermal energy from the alternate (geothermal) source.
    pub fn alternate(config: &Configuration) -> Self {
        Self::new(ALTERNATE_SCENARIO, config.alternate_thermal_emission_factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalParameter {
    pub mean: f64,
    pub std_dev: f64,
    /// False when `std_dev` is the configured fallback.
    pub empirical: bool,
}

impl NormalParameter {
    fn from_values(
        values: &[f64],
        min_history: usize,
        fallback_std: impl FnOnce(f64) -> f64,
    ) -> Self {
        let mean = stats::mean(values);
        if values.len() >= min_history.max(2) {
            Self {
                mean,
                std_dev: stats::std_dev(values, mean),
                empirical: true,
            }
        } else {
            Self {
                mean,
                std_dev: fallback_std(mean),
                empirical: false,
            }
        }
    }
}

/// Everything an iteration needs besides its random draws, fixed at simulation start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingParameters {
    pub history_weeks: usize,
    pub capture_efficiency: NormalParameter,
    pub thermal_energy_kwh: NormalParameter,
    pub auxiliary_energy_kwh: NormalParameter,
    pub expected_cycles: f64,
    pub capture_per_cycle_kg: f64,
    pub grid_emission_factor: f64,
    pub embodied_kg: f64,
}

impl SamplingParameters {
    /// Derives means and spreads from historical weeks.
    ///
    /// Capture efficiency is liquefied ÷ adsorbed per week, skipping weeks with
    /// no adsorption. Expected cycles × capture per cycle reproduces the mean
    /// weekly adsorbed CO₂.
    pub fn from_history(
        history: &[WeeklyResult],
        config: &Configuration,
        settings: &SimulationSettings,
    ) -> Result<Self, DacError> {
        validate_configuration(config)?;
        if history.is_empty() {
            return Err(DacError::missing_input(
                "historical weekly results",
                "simulation base period is empty",
            ));
        }

        let efficiencies: Vec<f64> = history
            .iter()
            .filter(|w| w.ads_co2_kg > 0.0)
            .map(|w| w.liquefied_co2_kg / w.ads_co2_kg)
            .collect();
        let thermal: Vec<f64> = history.iter().map(|w| w.thermal_energy_kwh).collect();
        let auxiliary: Vec<f64> = history.iter().map(|w| w.auxiliary_energy_kwh).collect();

        let min_history = settings.min_history_for_std;
        let capture_efficiency = NormalParameter::from_values(&efficiencies, min_history, |_| {
            settings.fallback_capture_efficiency_std
        });
        let thermal_energy_kwh = NormalParameter::from_values(&thermal, min_history, |mean| {
            mean * settings.fallback_thermal_relative_std
        });
        let auxiliary_energy_kwh = NormalParameter::from_values(&auxiliary, min_history, |mean| {
            mean * settings.fallback_auxiliary_relative_std
        });

        let weeks = history.len() as f64;
        let total_cycles: usize = history.iter().map(|w| w.cycle_count).sum();
        let total_ads: f64 = history.iter().map(|w| w.ads_co2_kg).sum();
        let (expected_cycles, capture_per_cycle_kg) = if total_cycles > 0 {
            (
                total_cycles as f64 / weeks,
                total_ads / total_cycles as f64,
            )
        } else {
            (1.0, total_ads / weeks)
        };

        Ok(Self {
            history_weeks: history.len(),
            capture_efficiency,
            thermal_energy_kwh,
            auxiliary_energy_kwh,
            expected_cycles,
            capture_per_cycle_kg,
            grid_emission_factor: config.grid_emission_factor,
            embodied_kg: config.weekly_embodied_charge_kg(),
        })
    }

    pub fn net_removal_kg(&self, draw: &IterationDraw, scenario: &Scenario) -> f64 {
        let throughput = self.expected_cycles * draw.uptime;
        let gross_captured = throughput * self.capture_per_cycle_kg * draw.capture_efficiency;
        let net_captured = gross_captured * (1.0 - draw.loss_rate);
        let operational = operational_emissions(
            draw.thermal_energy_kwh,
            draw.auxiliary_energy_kwh,
            scenario.thermal_emission_factor,
            self.grid_emission_factor,
        );
        net_captured - operational.total_kg - self.embodied_kg
    }
}

/// The five independent draws of one iteration, shared by every scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationDraw {
    pub capture_efficiency: f64,
    pub thermal_energy_kwh: f64,
    pub auxiliary_energy_kwh: f64,
    pub uptime: f64,
    pub loss_rate: f64,
}

pub struct SamplingDistributions {
    capture_efficiency: Normal<f64>,
    thermal_energy_kwh: Normal<f64>,
    auxiliary_energy_kwh: Normal<f64>,
    uptime: Beta<f64>,
    loss_rate: Beta<f64>,
}

impl SamplingDistributions {
    pub fn new(
        parameters: &SamplingParameters,
        settings: &SimulationSettings,
    ) -> Result<Self, DacError> {
        let normal = |name: &str, p: NormalParameter| {
            Normal::new(p.mean, p.std_dev).map_err(|e| {
                DacError::InvalidConfig(format!("cannot sample {}: {}", name, e))
            })
        };
        let beta = |name: &str, alpha: f64, beta: f64| {
            Beta::new(alpha, beta).map_err(|e| {
                DacError::InvalidConfig(format!("cannot sample {}: {}", name, e))
            })
        };

        Ok(Self {
            capture_efficiency: normal("capture efficiency", parameters.capture_efficiency)?,
            thermal_energy_kwh: normal("thermal energy", parameters.thermal_energy_kwh)?,
            auxiliary_energy_kwh: normal("auxiliary energy", parameters.auxiliary_energy_kwh)?,
            uptime: beta("uptime", settings.uptime_alpha, settings.uptime_beta)?,
            loss_rate: beta("loss rate", settings.loss_rate_alpha, settings.loss_rate_beta)?,
        })
    }

    /// Draws in a fixed order; Normal tails below zero are clamped to zero.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> IterationDraw {
        IterationDraw {
            capture_efficiency: self.capture_efficiency.sample(rng).max(0.0),
            thermal_energy_kwh: self.thermal_energy_kwh.sample(rng).max(0.0),
            auxiliary_energy_kwh: self.auxiliary_energy_kwh.sample(rng).max(0.0),
            uptime: self.uptime.sample(rng),
            loss_rate: self.loss_rate.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregation::WeeklyAggregate, emissions::calculate_week, week::WeekStart};
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn history(weeks: usize) -> Vec<WeeklyResult> {
        let first = WeekStart::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).unwrap();
        let mut week = first;
        (0..weeks)
            .map(|i| {
                let aggregate = WeeklyAggregate {
                    cycle_count: 40,
                    ads_co2_kg: 1_000.0,
                    des_co2_kg: 900.0,
                    bag_co2_kg: 800.0,
                    liquefied_co2_kg: Some(600.0 + 20.0 * i as f64),
                    thermal_energy_kwh: 6_000.0 + 100.0 * i as f64,
                    auxiliary_energy_kwh: 2_500.0,
                    ..WeeklyAggregate::empty(week)
                };
                week = week.next();
                calculate_week(&aggregate, &Configuration::default()).unwrap()
            })
            .collect()
    }

    #[test]
    fn empty_history_is_missing_input() {
        let err = SamplingParameters::from_history(
            &[],
            &Configuration::default(),
            &SimulationSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DacError::MissingInput { .. }));
    }

    #[test]
    fn empirical_parameters_from_history() {
        let params = SamplingParameters::from_history(
            &history(3),
            &Configuration::default(),
            &SimulationSettings::default(),
        )
        .unwrap();
        assert!((params.capture_efficiency.mean - 0.62).abs() < 1e-12);
        assert!(params.capture_efficiency.empirical);
        assert!((params.thermal_energy_kwh.mean - 6_100.0).abs() < 1e-9);
        assert_eq!(params.auxiliary_energy_kwh.std_dev, 0.0);
        assert_eq!(params.expected_cycles, 40.0);
        assert_eq!(params.capture_per_cycle_kg, 25.0);
    }

    #[test]
    fn single_week_uses_fallback_spread() {
        let settings = SimulationSettings::default();
        let params =
            SamplingParameters::from_history(&history(1), &Configuration::default(), &settings)
                .unwrap();
        assert!(!params.thermal_energy_kwh.empirical);
        assert!((params.thermal_energy_kwh.std_dev - 600.0).abs() < 1e-9);
        assert_eq!(
            params.capture_efficiency.std_dev,
            settings.fallback_capture_efficiency_std
        );
    }

    #[test]
    fn draws_are_physical() {
        let settings = SimulationSettings::default();
        let mut params =
            SamplingParameters::from_history(&history(3), &Configuration::default(), &settings)
                .unwrap();
        params.thermal_energy_kwh = NormalParameter {
            mean: 10.0,
            std_dev: 1_000.0,
            empirical: true,
        };
        let distributions = SamplingDistributions::new(&params, &settings).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1_000 {
            let draw = distributions.draw(&mut rng);
            assert!(draw.thermal_energy_kwh >= 0.0);
            assert!(draw.capture_efficiency >= 0.0);
            assert!((0.0..=1.0).contains(&draw.uptime));
            assert!((0.0..=1.0).contains(&draw.loss_rate));
        }
    }

    #[test]
    fn net_removal_follows_the_iteration_model() {
        let settings = SimulationSettings::default();
        let params =
            SamplingParameters::from_history(&history(3), &Configuration::default(), &settings)
                .unwrap();
        let draw = IterationDraw {
            capture_efficiency: 0.6,
            thermal_energy_kwh: 6_000.0,
            auxiliary_energy_kwh: 2_000.0,
            uptime: 0.9,
            loss_rate: 0.1,
        };
        let config = Configuration::default();
        let net = params.net_removal_kg(&draw, &Scenario::current(&config));
        let expected = 40.0 * 0.9 * 25.0 * 0.6 * 0.9
            - (6_000.0 * 0.049 + 2_000.0 * 0.049)
            - config.weekly_embodied_charge_kg();
        assert!((net - expected).abs() < 1e-9);

        let geo = params.net_removal_kg(&draw, &Scenario::alternate(&config));
        assert!((geo - net - 6_000.0 * 0.049).abs() < 1e-9);
    }
}
