use crate::error::DacError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ITERATIONS: usize = 10_000;

/// Tunables for the sampling model. Loaded from the `simulation` block of the
/// settings file; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub iterations: usize,
    /// Iterations per batch; each batch gets its own random sub-stream.
    pub batch_size: usize,
    /// Capture efficiency σ when history is too short for an empirical one.
    pub fallback_capture_efficiency_std: f64,
    /// Thermal energy σ as a fraction of its mean, for short histories.
    pub fallback_thermal_relative_std: f64,
    pub fallback_auxiliary_relative_std: f64,
    pub uptime_alpha: f64,
    pub uptime_beta: f64,
    pub loss_rate_alpha: f64,
    pub loss_rate_beta: f64,
    /// Fewest historical weeks from which an empirical σ is trusted.
    pub min_history_for_std: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            batch_size: 1_000,
            fallback_capture_efficiency_std: 0.05,
            fallback_thermal_relative_std: 0.10,
            fallback_auxiliary_relative_std: 0.08,
            uptime_alpha: 9.0,
            uptime_beta: 1.0,
            loss_rate_alpha: 2.0,
            loss_rate_beta: 18.0,
            min_history_for_std: 2,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), DacError> {
        if self.iterations == 0 {
            return Err(DacError::InvalidConfig(
                "iteration count must be a positive integer".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(DacError::InvalidConfig(
                "batch size must be a positive integer".to_string(),
            ));
        }
        for (name, value) in [
            ("fallback_capture_efficiency_std", self.fallback_capture_efficiency_std),
            ("fallback_thermal_relative_std", self.fallback_thermal_relative_std),
            ("fallback_auxiliary_relative_std", self.fallback_auxiliary_relative_std),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DacError::InvalidConfig(format!(
                    "'{}' must be non-negative, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("uptime_alpha", self.uptime_alpha),
            ("uptime_beta", self.uptime_beta),
            ("loss_rate_alpha", self.loss_rate_alpha),
            ("loss_rate_beta", self.loss_rate_beta),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DacError::InvalidConfig(format!(
                    "Beta shape '{}' must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
