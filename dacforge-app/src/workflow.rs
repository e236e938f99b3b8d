use crate::{
    config::{ConfigurationSource, Settings},
    ingest::{self, ImportReport},
};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use dacforge_core::{
    aggregation::{pair_breakdown, Aggregator, ModulePair, PairBreakdown, WeeklyEntryBook},
    analysis::{
        break_even, capture_efficiency, energy_intensity, energy_reduction_for_week, sensitivity,
        BreakEven, EnergyIntensity, EnergyReduction, SensitivityBase, SensitivityReport,
    },
    emissions::{calculate_week, calculate_week_with_thermal_factor, WeeklyResult},
    error::DacError,
    ratio::Ratio,
    rollup::{self, PeriodSummary},
    simulation::{builder::SimulationBuilder, engine::ScenarioComparison},
    week::WeekStart,
};
use dacforge_schemas::cycle::CycleRecord;
use serde::Serialize;
use std::{path::Path, time::Duration, time::Instant};
use tracing::{info, warn};

/// Everything read from the input files for one command.
pub struct Dataset {
    pub cycles: Vec<CycleRecord>,
    pub entries: WeeklyEntryBook,
    pub import: ImportReport,
}

impl Dataset {
    pub fn load(cycles: &Path, energy: Option<&Path>, entries: &Path) -> Result<Self> {
        let (cycles, import) = ingest::read_cycles(cycles, energy)?;
        let entries = ingest::read_entries(entries)?;
        Ok(Self {
            cycles,
            entries,
            import,
        })
    }

    fn aggregator(&self, pair: Option<ModulePair>) -> Aggregator<'_> {
        let aggregator = Aggregator::new(&self.cycles, &self.entries);
        match pair {
            Some(pair) => aggregator.for_pair(pair),
            None => aggregator,
        }
    }
}

/// Computes every week with data in `[from, to]`. Weeks still waiting for a
/// liquefied CO₂ entry are skipped with a warning.
pub fn weekly_results(
    dataset: &Dataset,
    source: &ConfigurationSource,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    pair: Option<ModulePair>,
) -> Result<Vec<WeeklyResult>> {
    let aggregator = dataset.aggregator(pair);
    let mut results = Vec::new();
    for week in aggregator.weeks_with_data() {
        let day = week.date();
        if from.is_some_and(|f| day < f) || to.is_some_and(|t| day > t) {
            continue;
        }
        let config = source.on(day)?;
        let aggregate = aggregator.aggregate_week(week)?;
        match calculate_week(&aggregate, &config) {
            Ok(result) => results.push(result),
            Err(DacError::MissingInput { field, context }) => {
                warn!(%field, %context, "week skipped");
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to compute week {}", week)),
        }
    }
    info!(weeks = results.len(), "computed weekly results");
    Ok(results)
}

#[derive(Debug, Serialize)]
pub struct WeekReport {
    pub result: WeeklyResult,
    /// Same week with the alternate thermal emission factor.
    pub alternate: WeeklyResult,
    pub intensity: EnergyIntensity,
    pub capture_efficiency: Ratio,
    pub break_even: BreakEven,
    pub energy_reduction: EnergyReduction,
}

pub fn week_report(
    dataset: &Dataset,
    source: &ConfigurationSource,
    week: WeekStart,
    pair: Option<ModulePair>,
) -> Result<WeekReport> {
    let config = source.on(week.date())?;
    let aggregate = dataset.aggregator(pair).aggregate_week(week)?;
    let result = calculate_week(&aggregate, &config)
        .with_context(|| format!("Failed to compute week {}", week))?;
    let alternate = calculate_week_with_thermal_factor(
        &aggregate,
        &config,
        config.alternate_thermal_emission_factor,
    )?;
    let energy_reduction = energy_reduction_for_week(&result, &config)?;

    Ok(WeekReport {
        intensity: energy_intensity(&result),
        capture_efficiency: capture_efficiency(&result),
        break_even: break_even(&result),
        energy_reduction,
        alternate,
        result,
    })
}

#[derive(Debug, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM` of the weeks' start dates.
    pub month: String,
    pub summary: PeriodSummary,
}

#[derive(Debug, Serialize)]
pub struct PeriodReport {
    pub weeks: Vec<WeeklyResult>,
    pub monthly: Vec<MonthSummary>,
    pub year_to_date: PeriodSummary,
    pub lifetime: PeriodSummary,
    pub net_positive_weeks: usize,
    pub pairs: PairBreakdown,
}

pub fn period_report(
    dataset: &Dataset,
    source: &ConfigurationSource,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<PeriodReport> {
    let weeks = weekly_results(dataset, source, from, to, None)?;
    let as_of = to
        .or_else(|| weeks.last().map(|w| w.week.date()))
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let monthly = rollup::monthly(&weeks)
        .into_iter()
        .map(|((year, month), summary)| MonthSummary {
            month: format!("{:04}-{:02}", year, month),
            summary,
        })
        .collect();
    let pairs = pair_breakdown(&dataset.cycles, from, to)?;

    Ok(PeriodReport {
        monthly,
        year_to_date: rollup::year_to_date(&weeks, as_of),
        lifetime: rollup::lifetime(&weeks),
        net_positive_weeks: PeriodSummary::net_positive_weeks(&weeks),
        pairs,
        weeks,
    })
}

pub struct SimulationOptions<'a> {
    pub iterations: Option<usize>,
    pub seed: Option<u64>,
    pub base_weeks: usize,
    pub trace: Option<&'a Path>,
    pub timeout: Option<Duration>,
}

/// Runs the Monte Carlo comparison over the most recent `base_weeks` computed weeks.
pub fn simulate(
    dataset: &Dataset,
    source: &ConfigurationSource,
    settings: &Settings,
    options: &SimulationOptions<'_>,
) -> Result<ScenarioComparison> {
    let mut history = weekly_results(dataset, source, None, None, None)?;
    if history.is_empty() {
        bail!("No complete weeks to base the simulation on; add liquefied CO2 entries first");
    }
    let keep = options.base_weeks.max(1).min(history.len());
    let history = history.split_off(history.len() - keep);
    let latest = history
        .last()
        .map(|w| w.week.date())
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    info!(
        base_weeks = history.len(),
        from = %history[0].week,
        to = %latest,
        "simulating from historical weeks"
    );

    let mut builder = SimulationBuilder::new()
        .with_history(history)
        .with_configuration(source.on(latest)?)
        .with_settings(settings.simulation.clone());
    if let Some(iterations) = options.iterations {
        builder = builder.with_iterations(iterations);
    }
    if let Some(seed) = options.seed {
        builder = builder.with_seed(seed);
    }
    if let Some(path) = options.trace {
        builder = builder.with_sample_trace_to_file(&path.to_string_lossy());
    }
    if let Some(timeout) = options.timeout {
        builder = builder.with_deadline(Instant::now() + timeout);
    }

    let mut engine = builder.build()?;
    info!(seed = engine.seed(), "starting Monte Carlo run");
    let started = Instant::now();
    let comparison = engine.run()?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Monte Carlo run complete");
    Ok(comparison)
}

pub fn sensitivity_report(
    dataset: &Dataset,
    source: &ConfigurationSource,
    week: WeekStart,
) -> Result<SensitivityReport> {
    let config = source.on(week.date())?;
    let aggregate = dataset.aggregator(None).aggregate_week(week)?;
    let result = calculate_week(&aggregate, &config)
        .with_context(|| format!("Failed to compute week {}", week))?;
    Ok(sensitivity(&SensitivityBase::from_week(&result, &config)))
}

/// Parses a week argument: any date in the week, or an ISO week such as `2024-W10`.
pub fn parse_week(raw: &str) -> Result<WeekStart> {
    if let Some((year, week)) = raw.split_once("-W") {
        let year: i32 = year.parse().with_context(|| format!("Invalid ISO year in '{}'", raw))?;
        let week: u32 = week.parse().with_context(|| format!("Invalid ISO week in '{}'", raw))?;
        return Ok(WeekStart::from_iso(year, week)?);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD or YYYY-Www, got '{}'", raw))?;
    if date.weekday() != chrono::Weekday::Mon {
        warn!(%date, "date is not a Monday; using the week that contains it");
    }
    Ok(WeekStart::containing_date(date))
}
