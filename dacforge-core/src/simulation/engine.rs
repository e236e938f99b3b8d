use super::{
    state::{IterationDraw, SamplingDistributions, SamplingParameters, Scenario},
    stats::SimulationResult,
};
use crate::{error::DacError, logger::SampleTraceWriter};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

pub struct SimulationEngine {
    pub(super) parameters: SamplingParameters,
    pub(super) distributions: SamplingDistributions,
    pub(super) scenarios: Vec<Scenario>,
    pub(super) iterations: usize,
    pub(super) batch_size: usize,
    pub(super) seed: u64,
    pub(super) cancel_flag: Option<Arc<AtomicBool>>,
    pub(super) deadline: Option<Instant>,
    pub(super) trace: Option<SampleTraceWriter>,
}

/// Draws and per-scenario net removal for one batch of iterations.
struct BatchOutput {
    draws: Vec<IterationDraw>,
    net_removal_kg: Vec<Vec<f64>>,
}

/// Side-by-side results of every scenario from one run over shared draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub seed: u64,
    pub iterations: usize,
    pub parameters: SamplingParameters,
    pub results: Vec<SimulationResult>,
}

impl ScenarioComparison {
    pub fn get(&self, scenario: &str) -> Option<&SimulationResult> {
        self.results.iter().find(|r| r.scenario == scenario)
    }

    /// Mean net removal of `a` minus that of `b`.
    pub fn mean_difference(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.get(a)?.mean_kg - self.get(b)?.mean_kg)
    }
}

impl SimulationEngine {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn parameters(&self) -> &SamplingParameters {
        &self.parameters
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Runs all iterations in parallel batches.
    ///
    /// Batch `b` draws from stream `b` of a ChaCha generator seeded with the run
    /// seed, so results depend only on seed, iterations and batch size, never
    /// on the number of worker threads.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the cancellation flag or deadline trips before the last
    /// batch starts; `FileIO`/`CsvError` if the sample trace cannot be written.
    pub fn run(&mut self) -> Result<ScenarioComparison, DacError> {
        let batch_count = self.iterations.div_ceil(self.batch_size);
        let batches = (0..batch_count)
            .into_par_iter()
            .map(|index| self.run_batch(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut samples: Vec<Vec<f64>> = self
            .scenarios
            .iter()
            .map(|_| Vec::with_capacity(self.iterations))
            .collect();
        for batch in &batches {
            for (scenario_samples, batch_samples) in samples.iter_mut().zip(&batch.net_removal_kg) {
                scenario_samples.extend_from_slice(batch_samples);
            }
        }

        if let Some(mut trace) = self.trace.take() {
            let draws = batches.iter().flat_map(|b| b.draws.iter());
            for (iteration, draw) in draws.enumerate() {
                for (scenario, scenario_samples) in self.scenarios.iter().zip(&samples) {
                    trace.write_iteration(iteration, draw, &scenario.name, scenario_samples[iteration])?;
                }
            }
            trace.finish()?;
        }

        let results = self
            .scenarios
            .iter()
            .zip(samples)
            .map(|(scenario, scenario_samples)| {
                SimulationResult::from_samples(&scenario.name, scenario_samples)
            })
            .collect();

        Ok(ScenarioComparison {
            seed: self.seed,
            iterations: self.iterations,
            parameters: self.parameters.clone(),
            results,
        })
    }

    fn run_batch(&self, index: usize) -> Result<BatchOutput, DacError> {
        self.check_cancelled()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(index as u64);

        let start = index * self.batch_size;
        let len = self.batch_size.min(self.iterations - start);
        let mut output = BatchOutput {
            draws: Vec::with_capacity(len),
            net_removal_kg: self.scenarios.iter().map(|_| Vec::with_capacity(len)).collect(),
        };

        for _ in 0..len {
            let draw = self.distributions.draw(&mut rng);
            for (scenario, samples) in self.scenarios.iter().zip(output.net_removal_kg.iter_mut()) {
                samples.push(self.parameters.net_removal_kg(&draw, scenario));
            }
            output.draws.push(draw);
        }
        Ok(output)
    }

    fn check_cancelled(&self) -> Result<(), DacError> {
        let flagged = self
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        let expired = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if flagged || expired {
            return Err(DacError::Cancelled);
        }
        Ok(())
    }
}
