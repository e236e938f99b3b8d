use crate::{
    error::DacError,
    ratio::Ratio,
    validation::{validate_cycle, validate_entry},
    week::WeekStart,
};
use chrono::NaiveDate;
use dacforge_schemas::{cycle::CycleRecord, weekly::WeeklyEntry};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-cycle sums for one week plus the manually entered liquefied amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub week: WeekStart,
    pub cycle_count: usize,
    /// Cycles whose auxiliary energy was derived from the plant total.
    pub unmetered_cycles: usize,
    pub ads_co2_kg: f64,
    pub des_co2_kg: f64,
    pub bag_co2_kg: f64,
    /// `None` when no weekly entry exists; never derived from cycle data.
    pub liquefied_co2_kg: Option<f64>,
    pub thermal_energy_kwh: f64,
    /// Includes `liquefaction_energy_kwh`.
    pub auxiliary_energy_kwh: f64,
    pub liquefaction_energy_kwh: f64,
    pub steam_kg: f64,
}

impl WeeklyAggregate {
    pub fn empty(week: WeekStart) -> Self {
        Self {
            week,
            cycle_count: 0,
            unmetered_cycles: 0,
            ads_co2_kg: 0.0,
            des_co2_kg: 0.0,
            bag_co2_kg: 0.0,
            liquefied_co2_kg: None,
            thermal_energy_kwh: 0.0,
            auxiliary_energy_kwh: 0.0,
            liquefaction_energy_kwh: 0.0,
            steam_kg: 0.0,
        }
    }

    pub fn total_energy_kwh(&self) -> f64 {
        self.thermal_energy_kwh + self.auxiliary_energy_kwh
    }

    fn add_cycle(&mut self, record: &CycleRecord) {
        let (auxiliary_kwh, metered) = cycle_auxiliary_kwh(record);
        self.cycle_count += 1;
        if !metered {
            self.unmetered_cycles += 1;
        }
        self.ads_co2_kg += record.ads_co2_kg;
        self.des_co2_kg += record.des_co2_kg;
        self.bag_co2_kg += record.bag_co2_kg;
        self.thermal_energy_kwh += record.thermal_energy_kwh;
        self.auxiliary_energy_kwh += auxiliary_kwh;
        self.steam_kg += record.steam_kg;
    }
}

/// Auxiliary energy for a cycle and whether it was separately metered.
///
/// Metered components are authoritative. Without them the plant total minus
/// thermal energy is used, floored at zero; with neither the cycle contributes
/// no auxiliary energy.
pub fn cycle_auxiliary_kwh(record: &CycleRecord) -> (f64, bool) {
    match (&record.auxiliary, record.total_energy_kwh) {
        (Some(aux), _) => (aux.total_kwh(), true),
        (None, Some(total)) => ((total - record.thermal_energy_kwh).max(0.0), false),
        (None, None) => (0.0, false),
    }
}

/// At most one manual entry per week; a later entry replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct WeeklyEntryBook {
    entries: BTreeMap<WeekStart, WeeklyEntry>,
}

impl WeeklyEntryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry`, returning the entry it replaced for the same week.
    pub fn insert(&mut self, entry: WeeklyEntry) -> Result<Option<WeeklyEntry>, DacError> {
        let week = WeekStart::new(entry.week_start)?;
        validate_entry(&entry)?;
        Ok(self.entries.insert(week, entry))
    }

    pub fn get(&self, week: WeekStart) -> Option<&WeeklyEntry> {
        self.entries.get(&week)
    }

    pub fn weeks(&self) -> impl Iterator<Item = WeekStart> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<WeeklyEntry>> for WeeklyEntryBook {
    type Error = DacError;

    fn try_from(entries: Vec<WeeklyEntry>) -> Result<Self, Self::Error> {
        let mut book = Self::new();
        for entry in entries {
            book.insert(entry)?;
        }
        Ok(book)
    }
}

/// Rolls cycle records into weekly aggregates.
pub struct Aggregator<'a> {
    cycles: &'a [CycleRecord],
    entries: &'a WeeklyEntryBook,
    pair: Option<ModulePair>,
}

impl<'a> Aggregator<'a> {
    pub fn new(cycles: &'a [CycleRecord], entries: &'a WeeklyEntryBook) -> Self {
        Self {
            cycles,
            entries,
            pair: None,
        }
    }

    /// Restricts aggregation to cycles of one module pair.
    pub fn for_pair(mut self, pair: ModulePair) -> Self {
        self.pair = Some(pair);
        self
    }

    fn includes(&self, record: &CycleRecord) -> bool {
        self.pair
            .map_or(true, |pair| ModulePair::classify(&record.machine) == Some(pair))
    }

    /// Sums every cycle starting inside `week`; cycles of other weeks are ignored.
    ///
    /// With a pair filter the plant-level entry (liquefied CO₂ and
    /// liquefaction energy) is allocated by the pair's share of the week's
    /// bag CO₂.
    pub fn aggregate_week(&self, week: WeekStart) -> Result<WeeklyAggregate, DacError> {
        let mut aggregate = WeeklyAggregate::empty(week);
        let mut plant_bag_kg = 0.0;
        for record in self.cycles.iter().filter(|c| week.contains(c.start_time)) {
            validate_cycle(record)?;
            plant_bag_kg += record.bag_co2_kg;
            if self.includes(record) {
                aggregate.add_cycle(record);
            }
        }

        if let Some(entry) = self.entries.get(week) {
            let share = match self.pair {
                None => 1.0,
                Some(_) if plant_bag_kg > 0.0 => aggregate.bag_co2_kg / plant_bag_kg,
                Some(_) => 0.0,
            };
            let liquefaction_kwh = entry.liquefaction_energy_kwh * share;
            aggregate.liquefied_co2_kg = Some(entry.liquefied_co2_kg * share);
            aggregate.liquefaction_energy_kwh = liquefaction_kwh;
            aggregate.auxiliary_energy_kwh += liquefaction_kwh;
        }
        Ok(aggregate)
    }

    /// Aggregates for every week from the one containing `from` to the one containing `to`.
    pub fn aggregate_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeeklyAggregate>, DacError> {
        WeekStart::range_inclusive(from, to)
            .into_iter()
            .map(|week| self.aggregate_week(week))
            .collect()
    }

    /// Weeks that have either cycle data or a manual entry, in order. With a
    /// pair filter only weeks in which the pair ran a cycle count.
    pub fn weeks_with_data(&self) -> BTreeSet<WeekStart> {
        let cycle_weeks = self
            .cycles
            .iter()
            .filter(|c| self.includes(c))
            .map(|c| WeekStart::containing(c.start_time));
        match self.pair {
            Some(_) => cycle_weeks.collect(),
            None => cycle_weeks.chain(self.entries.weeks()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ModulePair {
    #[serde(rename = "1n3")]
    OneAndThree,
    #[serde(rename = "2n4")]
    TwoAndFour,
}

const ONE_AND_THREE_ALIASES: [&str; 6] = ["module 1n3", "module 1", "module 3", "nm1", "nm3", "1n3"];
const TWO_AND_FOUR_ALIASES: [&str; 6] = ["module 2n4", "module 2", "module 4", "nm2", "nm4", "2n4"];

/// Whether `alias` occurs in `name` as a whole token, not inside a longer word or number.
fn mentions_alias(name: &str, alias: &str) -> bool {
    name.match_indices(alias).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + alias.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl ModulePair {
    /// Classifies a machine name by known aliases, then by a lone module digit.
    pub fn classify(machine: &str) -> Option<Self> {
        let name = machine.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        if ONE_AND_THREE_ALIASES.iter().any(|a| mentions_alias(&name, a)) {
            return Some(ModulePair::OneAndThree);
        }
        if TWO_AND_FOUR_ALIASES.iter().any(|a| mentions_alias(&name, a)) {
            return Some(ModulePair::TwoAndFour);
        }

        let mut numbers = name
            .split(|c: char| !c.is_ascii_digit())
            .filter(|run| !run.is_empty());
        match (numbers.next(), numbers.next()) {
            (Some("1" | "3"), None) => Some(ModulePair::OneAndThree),
            (Some("2" | "4"), None) => Some(ModulePair::TwoAndFour),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ModulePair::OneAndThree => "1n3",
            ModulePair::TwoAndFour => "2n4",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModulePair::OneAndThree => "Module 1&3",
            ModulePair::TwoAndFour => "Module 2&4",
        }
    }
}

/// Cycle-only performance of one module pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairSummary {
    pub cycles: usize,
    pub ads_co2_kg: f64,
    pub des_co2_kg: f64,
    pub bag_co2_kg: f64,
    pub thermal_energy_kwh: f64,
    pub total_energy_kwh: f64,
    pub steam_kg: f64,
}

impl PairSummary {
    fn add_cycle(&mut self, record: &CycleRecord) {
        let (auxiliary_kwh, _) = cycle_auxiliary_kwh(record);
        self.cycles += 1;
        self.ads_co2_kg += record.ads_co2_kg;
        self.des_co2_kg += record.des_co2_kg;
        self.bag_co2_kg += record.bag_co2_kg;
        self.thermal_energy_kwh += record.thermal_energy_kwh;
        self.total_energy_kwh += record.thermal_energy_kwh + auxiliary_kwh;
        self.steam_kg += record.steam_kg;
    }

    pub fn ads_to_des_efficiency_pct(&self) -> Ratio {
        Ratio::percent(self.des_co2_kg, self.ads_co2_kg)
    }

    pub fn des_to_bag_efficiency_pct(&self) -> Ratio {
        Ratio::percent(self.bag_co2_kg, self.des_co2_kg)
    }

    pub fn overall_efficiency_pct(&self) -> Ratio {
        Ratio::percent(self.bag_co2_kg, self.ads_co2_kg)
    }

    pub fn total_loss_kg(&self) -> f64 {
        self.ads_co2_kg - self.bag_co2_kg
    }

    pub fn loss_rate_pct(&self) -> Ratio {
        Ratio::percent(self.total_loss_kg(), self.ads_co2_kg)
    }

    pub fn kwh_per_kg_co2(&self) -> Ratio {
        Ratio::of(self.total_energy_kwh, self.bag_co2_kg)
    }

    pub fn avg_ads_per_cycle_kg(&self) -> Ratio {
        Ratio::of(self.ads_co2_kg, self.cycles as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairBreakdown {
    pub one_and_three: PairSummary,
    pub two_and_four: PairSummary,
    pub unknown: PairSummary,
}

impl PairBreakdown {
    pub fn get(&self, pair: Option<ModulePair>) -> &PairSummary {
        match pair {
            Some(ModulePair::OneAndThree) => &self.one_and_three,
            Some(ModulePair::TwoAndFour) => &self.two_and_four,
            None => &self.unknown,
        }
    }

    /// Share of the combined 1&3 + 2&4 bag CO₂ collected by `pair`.
    pub fn co2_contribution_pct(&self, pair: ModulePair) -> Ratio {
        let total = self.one_and_three.bag_co2_kg + self.two_and_four.bag_co2_kg;
        Ratio::percent(self.get(Some(pair)).bag_co2_kg, total)
    }
}

/// Splits cycles starting within `[from, to]` (either bound optional) by module pair.
pub fn pair_breakdown(
    cycles: &[CycleRecord],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<PairBreakdown, DacError> {
    let mut breakdown = PairBreakdown::default();
    for record in cycles {
        let day = record.start_time.date();
        if from.map_or(false, |f| day < f) || to.map_or(false, |t| day > t) {
            continue;
        }
        validate_cycle(record)?;
        let summary = match ModulePair::classify(&record.machine) {
            Some(ModulePair::OneAndThree) => &mut breakdown.one_and_three,
            Some(ModulePair::TwoAndFour) => &mut breakdown.two_and_four,
            None => &mut breakdown.unknown,
        };
        summary.add_cycle(record);
    }
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dacforge_schemas::cycle::AuxiliaryEnergy;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cycle(number: u32, machine: &str, day: NaiveDate, hour: u32) -> CycleRecord {
        CycleRecord {
            cycle_number: number,
            machine: machine.to_string(),
            start_time: day.and_hms_opt(hour, 0, 0).unwrap(),
            ads_co2_kg: 10.0,
            des_co2_kg: 8.0,
            bag_co2_kg: 7.0,
            thermal_energy_kwh: 100.0,
            auxiliary: Some(AuxiliaryEnergy::new().with_component("ct", 20.0)),
            total_energy_kwh: None,
            steam_kg: 5.0,
        }
    }

    #[test]
    fn sums_only_cycles_inside_the_week() {
        let cycles = vec![
            cycle(1, "NM1", date(2024, 3, 4), 0),
            cycle(2, "NM2", date(2024, 3, 10), 23),
            cycle(3, "NM1", date(2024, 3, 11), 0),
            cycle(4, "NM1", date(2024, 3, 3), 23),
        ];
        let book = WeeklyEntryBook::new();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        let aggregate = Aggregator::new(&cycles, &book).aggregate_week(week).unwrap();

        assert_eq!(aggregate.cycle_count, 2);
        assert_eq!(aggregate.ads_co2_kg, 20.0);
        assert_eq!(aggregate.auxiliary_energy_kwh, 40.0);
        assert_eq!(aggregate.total_energy_kwh(), 240.0);
        assert_eq!(aggregate.liquefied_co2_kg, None);
    }

    #[test]
    fn liquefied_comes_from_the_entry_only() {
        let cycles = vec![cycle(1, "NM1", date(2024, 3, 5), 8)];
        let mut book = WeeklyEntryBook::new();
        book.insert(WeeklyEntry::new(date(2024, 3, 4), 6.0).with_liquefaction_energy(15.0))
            .unwrap();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        let aggregate = Aggregator::new(&cycles, &book).aggregate_week(week).unwrap();

        assert_eq!(aggregate.liquefied_co2_kg, Some(6.0));
        assert_eq!(aggregate.liquefaction_energy_kwh, 15.0);
        assert_eq!(aggregate.auxiliary_energy_kwh, 35.0);
    }

    #[test]
    fn later_entry_replaces_earlier() {
        let mut book = WeeklyEntryBook::new();
        assert!(book.insert(WeeklyEntry::new(date(2024, 3, 4), 6.0)).unwrap().is_none());
        let replaced = book.insert(WeeklyEntry::new(date(2024, 3, 4), 9.0)).unwrap();
        assert_eq!(replaced.map(|e| e.liquefied_co2_kg), Some(6.0));
        assert_eq!(book.len(), 1);
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        assert_eq!(book.get(week).map(|e| e.liquefied_co2_kg), Some(9.0));
    }

    #[test]
    fn entry_for_non_monday_is_rejected() {
        let mut book = WeeklyEntryBook::new();
        assert!(book.insert(WeeklyEntry::new(date(2024, 3, 6), 1.0)).is_err());
    }

    #[test]
    fn unmetered_cycle_uses_total_minus_thermal() {
        let mut record = cycle(1, "NM1", date(2024, 3, 5), 8);
        record.auxiliary = None;
        record.total_energy_kwh = Some(130.0);
        assert_eq!(cycle_auxiliary_kwh(&record), (30.0, false));

        record.total_energy_kwh = Some(90.0);
        assert_eq!(cycle_auxiliary_kwh(&record), (0.0, false));

        let book = WeeklyEntryBook::new();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        let aggregate = Aggregator::new(&[record], &book).aggregate_week(week).unwrap();
        assert_eq!(aggregate.unmetered_cycles, 1);
    }

    #[test]
    fn negative_cycle_value_fails_validation() {
        let mut record = cycle(1, "NM1", date(2024, 3, 5), 8);
        record.des_co2_kg = -1.0;
        let book = WeeklyEntryBook::new();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        let err = Aggregator::new(&[record], &book).aggregate_week(week).unwrap_err();
        assert!(matches!(err, DacError::InvalidInput { ref field, .. } if field == "des_co2_kg"));
    }

    #[test]
    fn weeks_with_data_merges_cycles_and_entries() {
        let cycles = vec![cycle(1, "NM1", date(2024, 3, 5), 8)];
        let mut book = WeeklyEntryBook::new();
        book.insert(WeeklyEntry::new(date(2024, 3, 18), 1.0)).unwrap();
        let weeks: Vec<_> = Aggregator::new(&cycles, &book)
            .weeks_with_data()
            .into_iter()
            .map(WeekStart::date)
            .collect();
        assert_eq!(weeks, vec![date(2024, 3, 4), date(2024, 3, 18)]);
    }

    #[test]
    fn pair_filter_limits_the_week() {
        let cycles = vec![
            cycle(1, "NM1", date(2024, 3, 5), 8),
            cycle(2, "NM2", date(2024, 3, 5), 9),
            cycle(3, "NM3", date(2024, 3, 6), 9),
        ];
        let book = WeeklyEntryBook::new();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();
        let aggregate = Aggregator::new(&cycles, &book)
            .for_pair(ModulePair::OneAndThree)
            .aggregate_week(week)
            .unwrap();
        assert_eq!(aggregate.cycle_count, 2);
    }

    #[test]
    fn pair_gets_its_bag_share_of_the_entry() {
        let mut one = cycle(1, "NM1", date(2024, 3, 5), 8);
        let mut two = cycle(2, "NM2", date(2024, 3, 5), 9);
        one.bag_co2_kg = 400.0;
        two.bag_co2_kg = 400.0;
        one.des_co2_kg = 420.0;
        two.des_co2_kg = 420.0;
        one.ads_co2_kg = 450.0;
        two.ads_co2_kg = 450.0;
        let cycles = vec![one, two];
        let mut book = WeeklyEntryBook::new();
        book.insert(WeeklyEntry::new(date(2024, 3, 4), 700.0).with_liquefaction_energy(200.0))
            .unwrap();
        let week = WeekStart::new(date(2024, 3, 4)).unwrap();

        let aggregate = Aggregator::new(&cycles, &book)
            .for_pair(ModulePair::OneAndThree)
            .aggregate_week(week)
            .unwrap();
        assert_eq!(aggregate.bag_co2_kg, 400.0);
        assert_eq!(aggregate.liquefied_co2_kg, Some(350.0));
        assert_eq!(aggregate.liquefaction_energy_kwh, 100.0);
        assert_eq!(aggregate.auxiliary_energy_kwh, 120.0);

        let result = crate::emissions::calculate_week(
            &aggregate,
            &dacforge_schemas::configuration::Configuration::default(),
        )
        .unwrap();
        assert!((result.losses.stage_3_kg - 50.0).abs() < 1e-9);
        assert!(!result.has_flag(crate::emissions::DataQualityFlag::Stage3Carryover));

        let plant = Aggregator::new(&cycles, &book).aggregate_week(week).unwrap();
        assert_eq!(plant.liquefied_co2_kg, Some(700.0));
        assert_eq!(plant.liquefaction_energy_kwh, 200.0);
    }

    #[test]
    fn pair_filter_limits_weeks_with_data() {
        let cycles = vec![
            cycle(1, "NM1", date(2024, 3, 5), 8),
            cycle(2, "NM2", date(2024, 3, 12), 8),
        ];
        let mut book = WeeklyEntryBook::new();
        book.insert(WeeklyEntry::new(date(2024, 3, 18), 1.0)).unwrap();
        let weeks: Vec<_> = Aggregator::new(&cycles, &book)
            .for_pair(ModulePair::TwoAndFour)
            .weeks_with_data()
            .into_iter()
            .map(WeekStart::date)
            .collect();
        assert_eq!(weeks, vec![date(2024, 3, 11)]);
    }

    #[test]
    fn classifies_module_pairs() {
        assert_eq!(ModulePair::classify("NM3"), Some(ModulePair::OneAndThree));
        assert_eq!(ModulePair::classify("Module 4"), Some(ModulePair::TwoAndFour));
        assert_eq!(ModulePair::classify("unit-3"), Some(ModulePair::OneAndThree));
        assert_eq!(ModulePair::classify("rig 12"), None);
        assert_eq!(ModulePair::classify(""), None);
        assert_eq!(ModulePair::classify("Module 1 (north)"), Some(ModulePair::OneAndThree));
        assert_eq!(ModulePair::classify("module 12"), None);
        assert_eq!(ModulePair::classify("nm13"), None);
        assert_eq!(ModulePair::classify("nm24"), None);
    }

    #[test]
    fn pair_breakdown_reports_efficiencies() {
        let cycles = vec![
            cycle(1, "NM1", date(2024, 3, 5), 8),
            cycle(2, "NM2", date(2024, 3, 5), 9),
            cycle(3, "NM4", date(2024, 3, 6), 9),
        ];
        let breakdown = pair_breakdown(&cycles, None, None).unwrap();
        assert_eq!(breakdown.one_and_three.cycles, 1);
        assert_eq!(breakdown.two_and_four.cycles, 2);
        assert_eq!(
            breakdown.one_and_three.overall_efficiency_pct(),
            Ratio::Value(70.0)
        );
        assert!(breakdown.unknown.kwh_per_kg_co2().is_undefined());
        assert_eq!(breakdown.two_and_four.avg_ads_per_cycle_kg(), Ratio::Value(10.0));
        assert!(breakdown.unknown.avg_ads_per_cycle_kg().is_undefined());
        let share = breakdown
            .co2_contribution_pct(ModulePair::TwoAndFour)
            .value()
            .unwrap();
        assert!((share - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn pair_breakdown_honours_date_bounds() {
        let cycles = vec![
            cycle(1, "NM1", date(2024, 3, 5), 8),
            cycle(2, "NM1", date(2024, 3, 9), 8),
        ];
        let breakdown =
            pair_breakdown(&cycles, Some(date(2024, 3, 6)), Some(date(2024, 3, 9))).unwrap();
        assert_eq!(breakdown.one_and_three.cycles, 1);
    }
}
