//! Monthly, year-to-date and lifetime totals built purely from weekly results,
//! so a period always equals the sum of its weeks.

use crate::{emissions::NetStatus, emissions::WeeklyResult, ratio::Ratio, week::WeekStart};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub first_week: Option<WeekStart>,
    pub last_week: Option<WeekStart>,
    pub weeks: usize,
    pub cycle_count: usize,
    pub ads_co2_kg: f64,
    pub des_co2_kg: f64,
    pub bag_co2_kg: f64,
    pub liquefied_co2_kg: f64,
    pub thermal_energy_kwh: f64,
    pub auxiliary_energy_kwh: f64,
    pub total_energy_kwh: f64,
    pub steam_kg: f64,
    pub loss_stage_1_kg: f64,
    pub loss_stage_2_kg: f64,
    pub loss_stage_3_kg: f64,
    pub total_loss_kg: f64,
    pub thermal_emissions_kg: f64,
    pub auxiliary_emissions_kg: f64,
    pub operational_emissions_kg: f64,
    pub infrastructure_embodied_kg: f64,
    pub sorbent_embodied_kg: f64,
    pub embodied_emissions_kg: f64,
    pub gross_captured_kg: f64,
    pub total_emissions_kg: f64,
    pub net_removal_kg: f64,
}

impl PeriodSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_week(&mut self, week: &WeeklyResult) {
        self.first_week = Some(self.first_week.map_or(week.week, |w| w.min(week.week)));
        self.last_week = Some(self.last_week.map_or(week.week, |w| w.max(week.week)));
        self.weeks += 1;
        self.cycle_count += week.cycle_count;
        self.ads_co2_kg += week.ads_co2_kg;
        self.des_co2_kg += week.des_co2_kg;
        self.bag_co2_kg += week.bag_co2_kg;
        self.liquefied_co2_kg += week.liquefied_co2_kg;
        self.thermal_energy_kwh += week.thermal_energy_kwh;
        self.auxiliary_energy_kwh += week.auxiliary_energy_kwh;
        self.total_energy_kwh += week.total_energy_kwh;
        self.steam_kg += week.steam_kg;
        self.loss_stage_1_kg += week.losses.stage_1_kg;
        self.loss_stage_2_kg += week.losses.stage_2_kg;
        self.loss_stage_3_kg += week.losses.stage_3_kg;
        self.total_loss_kg += week.losses.total_kg;
        self.thermal_emissions_kg += week.operational.thermal_kg;
        self.auxiliary_emissions_kg += week.operational.auxiliary_kg;
        self.operational_emissions_kg += week.operational.total_kg;
        self.infrastructure_embodied_kg += week.embodied.infrastructure_kg;
        self.sorbent_embodied_kg += week.embodied.sorbent_kg;
        self.embodied_emissions_kg += week.embodied.total_kg;
        self.gross_captured_kg += week.gross_captured_kg;
        self.total_emissions_kg += week.total_emissions_kg;
        self.net_removal_kg += week.net_removal_kg;
    }

    /// Combines two disjoint periods.
    pub fn merge(mut self, other: &PeriodSummary) -> Self {
        self.first_week = match (self.first_week, other.first_week) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_week = match (self.last_week, other.last_week) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.weeks += other.weeks;
        self.cycle_count += other.cycle_count;
        self.ads_co2_kg += other.ads_co2_kg;
        self.des_co2_kg += other.des_co2_kg;
        self.bag_co2_kg += other.bag_co2_kg;
        self.liquefied_co2_kg += other.liquefied_co2_kg;
        self.thermal_energy_kwh += other.thermal_energy_kwh;
        self.auxiliary_energy_kwh += other.auxiliary_energy_kwh;
        self.total_energy_kwh += other.total_energy_kwh;
        self.steam_kg += other.steam_kg;
        self.loss_stage_1_kg += other.loss_stage_1_kg;
        self.loss_stage_2_kg += other.loss_stage_2_kg;
        self.loss_stage_3_kg += other.loss_stage_3_kg;
        self.total_loss_kg += other.total_loss_kg;
        self.thermal_emissions_kg += other.thermal_emissions_kg;
        self.auxiliary_emissions_kg += other.auxiliary_emissions_kg;
        self.operational_emissions_kg += other.operational_emissions_kg;
        self.infrastructure_embodied_kg += other.infrastructure_embodied_kg;
        self.sorbent_embodied_kg += other.sorbent_embodied_kg;
        self.embodied_emissions_kg += other.embodied_emissions_kg;
        self.gross_captured_kg += other.gross_captured_kg;
        self.total_emissions_kg += other.total_emissions_kg;
        self.net_removal_kg += other.net_removal_kg;
        self
    }

    pub fn status(&self) -> NetStatus {
        NetStatus::classify(self.net_removal_kg)
    }

    /// kWh per tonne of liquefied CO₂ over the whole period.
    pub fn energy_intensity_kwh_per_tonne(&self) -> Ratio {
        Ratio::of(self.total_energy_kwh, self.liquefied_co2_kg / 1000.0)
    }

    pub fn net_positive_weeks(weeks: &[WeeklyResult]) -> usize {
        weeks
            .iter()
            .filter(|w| w.status == NetStatus::NetPositive)
            .count()
    }
}

impl<'a> FromIterator<&'a WeeklyResult> for PeriodSummary {
    fn from_iter<I: IntoIterator<Item = &'a WeeklyResult>>(iter: I) -> Self {
        let mut summary = PeriodSummary::new();
        for week in iter {
            summary.add_week(week);
        }
        summary
    }
}

/// Weeks whose start date falls within `[from, to]`.
pub fn summarize_range(results: &[WeeklyResult], from: NaiveDate, to: NaiveDate) -> PeriodSummary {
    results
        .iter()
        .filter(|r| r.week.date() >= from && r.week.date() <= to)
        .collect()
}

/// One summary per `(year, month)` of each week's start date.
pub fn monthly(results: &[WeeklyResult]) -> BTreeMap<(i32, u32), PeriodSummary> {
    let mut months: BTreeMap<(i32, u32), PeriodSummary> = BTreeMap::new();
    for result in results {
        let start = result.week.date();
        months
            .entry((start.year(), start.month()))
            .or_default()
            .add_week(result);
    }
    months
}

pub fn year_to_date(results: &[WeeklyResult], as_of: NaiveDate) -> PeriodSummary {
    let year_start = NaiveDate::from_yo_opt(as_of.year(), 1).unwrap_or(as_of);
    summarize_range(results, year_start, as_of)
}

pub fn lifetime(results: &[WeeklyResult]) -> PeriodSummary {
    results.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregation::WeeklyAggregate, emissions::calculate_week};
    use dacforge_schemas::configuration::Configuration;

    fn week_result(monday: NaiveDate, liquefied: f64, thermal: f64) -> WeeklyResult {
        let aggregate = WeeklyAggregate {
            cycle_count: 10,
            ads_co2_kg: liquefied * 1.5,
            des_co2_kg: liquefied * 1.3,
            bag_co2_kg: liquefied * 1.1,
            liquefied_co2_kg: Some(liquefied),
            thermal_energy_kwh: thermal,
            auxiliary_energy_kwh: thermal * 0.4,
            ..WeeklyAggregate::empty(WeekStart::new(monday).unwrap())
        };
        calculate_week(&aggregate, &Configuration::default()).unwrap()
    }

    fn weeks() -> Vec<WeeklyResult> {
        let first = NaiveDate::from_ymd_opt(2024, 1, 22).unwrap();
        (0..8)
            .map(|i| {
                let monday = first + chrono::Duration::days(7 * i);
                week_result(monday, 500.0 + 20.0 * i as f64, 6_000.0 - 100.0 * i as f64)
            })
            .collect()
    }

    #[test]
    fn lifetime_equals_sum_of_weeks() {
        let results = weeks();
        let total = lifetime(&results);
        let expected: f64 = results.iter().map(|r| r.net_removal_kg).sum();
        assert_eq!(total.weeks, 8);
        assert!((total.net_removal_kg - expected).abs() < 1e-9);
        assert_eq!(total.status(), NetStatus::classify(total.net_removal_kg));
    }

    #[test]
    fn monthly_groups_by_week_start() {
        let months = monthly(&weeks());
        let weeks_per_month: Vec<usize> = months.values().map(|m| m.weeks).collect();
        // Mondays: Jan 22, 29; Feb 5, 12, 19, 26; Mar 4, 11.
        assert_eq!(weeks_per_month, vec![2, 4, 2]);
        assert!(months.contains_key(&(2024, 2)));
    }

    #[test]
    fn year_to_date_stops_at_as_of() {
        let ytd = year_to_date(&weeks(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(ytd.weeks, 3);
        assert_eq!(
            ytd.first_week.map(|w| w.date()),
            NaiveDate::from_ymd_opt(2024, 1, 22)
        );
    }

    #[test]
    fn merge_of_partition_equals_whole() {
        let results = weeks();
        let whole = lifetime(&results);
        let (left, right) = results.split_at(3);
        let merged = lifetime(left).merge(&lifetime(right));
        assert_eq!(merged.weeks, whole.weeks);
        assert_eq!(merged.first_week, whole.first_week);
        assert_eq!(merged.last_week, whole.last_week);
        assert!((merged.total_emissions_kg - whole.total_emissions_kg).abs() < 1e-9);
        assert!((merged.liquefied_co2_kg - whole.liquefied_co2_kg).abs() < 1e-9);
    }

    #[test]
    fn empty_period_has_undefined_intensity() {
        let empty = PeriodSummary::new();
        assert!(empty.energy_intensity_kwh_per_tonne().is_undefined());
        assert_eq!(empty.status(), NetStatus::Neutral);
    }
}
