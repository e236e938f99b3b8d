use crate::{error::DacError, simulation::state::IterationDraw};
use csv::Writer;
use serde::Serialize;
use std::fs;

#[derive(Debug, Serialize)]
struct TraceRow<'a> {
    iteration: usize,
    scenario: &'a str,
    capture_efficiency: f64,
    thermal_energy_kwh: f64,
    auxiliary_energy_kwh: f64,
    uptime: f64,
    loss_rate: f64,
    net_removal_kg: f64,
}

/// Writes one CSV row per iteration and scenario of a Monte Carlo run.
pub struct SampleTraceWriter {
    path: String,
    writer: Writer<fs::File>,
}

impl SampleTraceWriter {
    pub fn new(path: &str) -> Result<Self, DacError> {
        let file = fs::File::create(path).map_err(|e| DacError::FileIO(path.to_string(), e))?;
        Ok(Self {
            path: path.to_string(),
            writer: Writer::from_writer(file),
        })
    }

    pub fn write_iteration(
        &mut self,
        iteration: usize,
        draw: &IterationDraw,
        scenario: &str,
        net_removal_kg: f64,
    ) -> Result<(), DacError> {
        let row = TraceRow {
            iteration,
            scenario,
            capture_efficiency: draw.capture_efficiency,
            thermal_energy_kwh: draw.thermal_energy_kwh,
            auxiliary_energy_kwh: draw.auxiliary_energy_kwh,
            uptime: draw.uptime,
            loss_rate: draw.loss_rate,
            net_removal_kg,
        };
        self.writer
            .serialize(row)
            .map_err(|e| DacError::CsvError(self.path.clone(), e))
    }

    pub fn finish(mut self) -> Result<(), DacError> {
        self.writer
            .flush()
            .map_err(|e| DacError::FileIO(self.path.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        let path = path.to_str().unwrap();

        let draw = IterationDraw {
            capture_efficiency: 0.6,
            thermal_energy_kwh: 6_000.0,
            auxiliary_energy_kwh: 2_500.0,
            uptime: 0.9,
            loss_rate: 0.1,
        };
        let mut trace = SampleTraceWriter::new(path).unwrap();
        trace.write_iteration(0, &draw, "current", 12.5).unwrap();
        trace.write_iteration(0, &draw, "alternate", 300.0).unwrap();
        trace.finish().unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("iteration,scenario,capture_efficiency"));
        assert!(lines[1].starts_with("0,current,0.6,"));
        assert!(lines[2].ends_with(",300.0"));
    }

    #[test]
    fn unwritable_path_is_file_error() {
        let err = SampleTraceWriter::new("/nonexistent-dir/trace.csv").err().unwrap();
        assert!(matches!(err, DacError::FileIO(..)));
    }
}
