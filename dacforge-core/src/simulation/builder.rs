use crate::{
    emissions::WeeklyResult,
    error::DacError,
    logger::SampleTraceWriter,
    simulation::{
        engine::SimulationEngine,
        settings::SimulationSettings,
        state::{SamplingDistributions, SamplingParameters, Scenario},
    },
    validation::validate_configuration,
};
use dacforge_schemas::configuration::Configuration;
use std::{
    collections::BTreeSet,
    sync::{atomic::AtomicBool, Arc},
    time::Instant,
};

/// A fluent builder for constructing a `SimulationEngine`.
///
/// Historical weeks and the configuration are snapshotted at `build()`; the
/// engine never sees later changes to either.
#[derive(Default)]
pub struct SimulationBuilder {
    history: Vec<WeeklyResult>,
    configuration: Option<Configuration>,
    settings: SimulationSettings,
    iterations: Option<usize>,
    seed: Option<u64>,
    scenarios: Vec<Scenario>,
    cancel_flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
    trace_path: Option<String>,
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weekly results from which sampling parameters are derived.
    pub fn with_history(mut self, history: Vec<WeeklyResult>) -> Self {
        self.history = history;
        self
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_settings(mut self, settings: SimulationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Overrides `settings.iterations`.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Fixes the random seed so repeated runs are bit-for-bit identical.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Adds a scenario. Without any, the current and alternate scenarios are run.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Aborts the run with `DacError::Cancelled` once the flag is set.
    pub fn with_cancellation_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Aborts the run with `DacError::Cancelled` once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Writes every iteration's draws and per-scenario net removal to a CSV file.
    pub fn with_sample_trace_to_file(mut self, path: &str) -> Self {
        self.trace_path = Some(path.to_string());
        self
    }

    /// Consumes the builder and returns a ready-to-run `SimulationEngine`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a bad configuration, settings, a zero iteration count
    /// or duplicate scenario names; `MissingInput` for an empty history;
    /// `FileIO` if the trace file cannot be created.
    pub fn build(self) -> Result<SimulationEngine, DacError> {
        let configuration = self.configuration.unwrap_or_default();
        validate_configuration(&configuration)?;

        let mut settings = self.settings;
        if let Some(iterations) = self.iterations {
            settings.iterations = iterations;
        }
        settings.validate()?;

        let scenarios = if self.scenarios.is_empty() {
            vec![
                Scenario::current(&configuration),
                Scenario::alternate(&configuration),
            ]
        } else {
            self.scenarios
        };
        let mut names = BTreeSet::new();
        for scenario in &scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(DacError::InvalidConfig(format!(
                    "duplicate scenario name '{}'",
                    scenario.name
                )));
            }
            if !scenario.thermal_emission_factor.is_finite()
                || scenario.thermal_emission_factor < 0.0
            {
                return Err(DacError::InvalidConfig(format!(
                    "scenario '{}' thermal emission factor must be non-negative, got {}",
                    scenario.name, scenario.thermal_emission_factor
                )));
            }
        }

        let parameters = SamplingParameters::from_history(&self.history, &configuration, &settings)?;
        let distributions = SamplingDistributions::new(&parameters, &settings)?;

        let trace = match self.trace_path {
            Some(path) => Some(SampleTraceWriter::new(&path)?),
            None => None,
        };

        Ok(SimulationEngine {
            parameters,
            distributions,
            scenarios,
            iterations: settings.iterations,
            batch_size: settings.batch_size,
            seed: self.seed.unwrap_or_else(rand::random),
            cancel_flag: self.cancel_flag,
            deadline: self.deadline,
            trace,
        })
    }
}
