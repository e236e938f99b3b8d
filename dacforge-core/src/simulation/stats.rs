use serde::Serialize;

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation around `mean`.
pub fn std_dev(samples: &[f64], mean: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile of an ascending slice; `p` in `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Distribution of net removal for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub scenario: String,
    pub iterations: usize,
    pub mean_kg: f64,
    pub std_dev_kg: f64,
    pub p5_kg: f64,
    pub p50_kg: f64,
    pub p95_kg: f64,
    /// Fraction of samples strictly above zero.
    pub prob_net_positive: f64,
}

impl SimulationResult {
    pub fn from_samples(scenario: &str, mut samples: Vec<f64>) -> Self {
        let mean_kg = mean(&samples);
        let std_dev_kg = std_dev(&samples, mean_kg);
        let positive = samples.iter().filter(|x| **x > 0.0).count();
        let iterations = samples.len();
        samples.sort_by(|a, b| a.total_cmp(b));

        Self {
            scenario: scenario.to_string(),
            iterations,
            mean_kg,
            std_dev_kg,
            p5_kg: percentile(&samples, 5.0),
            p50_kg: percentile(&samples, 50.0),
            p95_kg: percentile(&samples, 95.0),
            prob_net_positive: if iterations == 0 {
                0.0
            } else {
                positive as f64 / iterations as f64
            },
        }
    }
}
