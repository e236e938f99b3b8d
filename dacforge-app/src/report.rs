//! Plain-text rendering of engine results for the terminal.

use crate::workflow::{PeriodReport, WeekReport};
use anyhow::Result;
use dacforge_core::{
    aggregation::{ModulePair, PairSummary},
    analysis::SensitivityReport,
    emissions::{DataQualityFlag, WeeklyResult},
    ratio::Ratio,
    rollup::PeriodSummary,
    simulation::engine::ScenarioComparison,
};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn ratio(value: Ratio, unit: &str) -> String {
    match value {
        Ratio::Value(v) => format!("{:.2}{}", v, unit),
        Ratio::Undefined => "undefined".to_string(),
    }
}

fn flag_note(flag: DataQualityFlag) -> &'static str {
    match flag {
        DataQualityFlag::Stage3Carryover => {
            "liquefied CO2 exceeds bag CO2 (carryover from a previous week?)"
        }
        DataQualityFlag::UnmeteredAuxiliary => {
            "auxiliary energy estimated from plant total for some cycles"
        }
    }
}

pub fn print_week(report: &WeekReport) {
    let r = &report.result;
    println!("\n--- Week of {} ---", r.week);
    println!("Cycles:                 {}", r.cycle_count);
    println!("ADS / DES / BAG CO2:    {:.1} / {:.1} / {:.1} kg", r.ads_co2_kg, r.des_co2_kg, r.bag_co2_kg);
    println!("Liquefied CO2:          {:.1} kg", r.liquefied_co2_kg);
    println!(
        "Energy:                 {:.1} kWh thermal + {:.1} kWh auxiliary = {:.1} kWh",
        r.thermal_energy_kwh, r.auxiliary_energy_kwh, r.total_energy_kwh
    );

    println!("\nStage losses:");
    println!("  ADS -> DES:           {:.1} kg ({})", r.losses.stage_1_kg, ratio(r.losses.stage_1_pct, "%"));
    println!("  DES -> BAG:           {:.1} kg ({})", r.losses.stage_2_kg, ratio(r.losses.stage_2_pct, "%"));
    println!("  BAG -> Liquefied:     {:.1} kg ({})", r.losses.stage_3_kg, ratio(r.losses.stage_3_pct, "%"));
    println!("  Capture efficiency:   {}", ratio(report.capture_efficiency.map(|v| v * 100.0), "%"));

    println!("\nEmissions:");
    println!("  Thermal:              {:.2} kg", r.operational.thermal_kg);
    println!("  Auxiliary:            {:.2} kg", r.operational.auxiliary_kg);
    println!("  Embodied:             {:.2} kg", r.embodied.total_kg);
    println!("  Total:                {:.2} kg", r.total_emissions_kg);

    println!("\nNet removal:            {:.2} kg  [{}]", r.net_removal_kg, r.status.label());
    println!(
        "  with alternate heat:  {:.2} kg  [{}]",
        report.alternate.net_removal_kg,
        report.alternate.status.label()
    );
    println!(
        "Break-even liquefied:   {:.1} kg (surplus {:.1} kg)",
        report.break_even.min_liquefied_kg, report.break_even.surplus_kg
    );
    println!("Energy intensity:       {}", ratio(report.intensity.total_kwh_per_tonne, " kWh/t"));
    if report.energy_reduction.achievable {
        println!(
            "Max energy to break even: {} (cut {})",
            ratio(report.energy_reduction.max_energy_kwh, " kWh"),
            ratio(report.energy_reduction.reduction_kwh, " kWh")
        );
    } else {
        println!("Break-even is not reachable by energy cuts alone: embodied charge exceeds capture.");
    }
    for flag in &r.flags {
        println!("Note: {}", flag_note(*flag));
    }
}

fn print_summary_line(label: &str, summary: &PeriodSummary) {
    println!(
        "{:<12} {:>5} {:>12.1} {:>12.1} {:>12.1} {:>12.1}  {}",
        label,
        summary.weeks,
        summary.liquefied_co2_kg,
        summary.total_energy_kwh,
        summary.total_emissions_kg,
        summary.net_removal_kg,
        summary.status().label()
    );
}

fn print_week_line(result: &WeeklyResult) {
    println!(
        "{:<12} {:>5} {:>12.1} {:>12.1} {:>12.1} {:>12.1}  {}",
        result.week.date().to_string(),
        result.cycle_count,
        result.liquefied_co2_kg,
        result.total_energy_kwh,
        result.total_emissions_kg,
        result.net_removal_kg,
        result.status.label()
    );
}

fn print_pair(pair: &str, summary: &PairSummary) {
    println!(
        "{:<14} {:>6} {:>10.1} {:>10} {:>10} {:>10} {:>10}",
        pair,
        summary.cycles,
        summary.ads_co2_kg,
        ratio(summary.avg_ads_per_cycle_kg(), ""),
        ratio(summary.overall_efficiency_pct(), "%"),
        ratio(summary.loss_rate_pct(), "%"),
        ratio(summary.kwh_per_kg_co2(), ""),
    );
}

pub fn print_period(report: &PeriodReport) {
    let header = format!(
        "{:<12} {:>5} {:>12} {:>12} {:>12} {:>12}  {}",
        "Period", "n", "Liquefied", "Energy kWh", "Emissions", "Net kg", "Status"
    );

    println!("\n--- Weekly Results ---");
    println!("{}", header);
    for week in &report.weeks {
        print_week_line(week);
    }

    println!("\n--- Monthly ---");
    println!("{}", header);
    for month in &report.monthly {
        print_summary_line(&month.month, &month.summary);
    }

    println!("\n--- Totals ---");
    println!("{}", header);
    print_summary_line("YTD", &report.year_to_date);
    print_summary_line("Lifetime", &report.lifetime);
    println!(
        "Net-positive weeks: {} of {}",
        report.net_positive_weeks,
        report.weeks.len()
    );

    println!("\n--- Module Pairs ---");
    println!(
        "{:<14} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Pair", "Cycles", "ADS kg", "ADS/cycle", "Overall", "Loss", "kWh/kg"
    );
    print_pair(ModulePair::OneAndThree.display_name(), &report.pairs.one_and_three);
    print_pair(ModulePair::TwoAndFour.display_name(), &report.pairs.two_and_four);
    if report.pairs.unknown.cycles > 0 {
        print_pair("Unassigned", &report.pairs.unknown);
    }
}

pub fn print_simulation(comparison: &ScenarioComparison) {
    println!(
        "\n--- Monte Carlo: {} iterations, seed {} ---",
        comparison.iterations, comparison.seed
    );
    let p = &comparison.parameters;
    println!(
        "Base: {} weeks, {:.1} cycles/week, {:.1} kg ADS/cycle, capture efficiency {:.3} ± {:.3}",
        p.history_weeks,
        p.expected_cycles,
        p.capture_per_cycle_kg,
        p.capture_efficiency.mean,
        p.capture_efficiency.std_dev
    );
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "Scenario", "Mean", "Std", "P5", "P50", "P95", "P(>0)"
    );
    for result in &comparison.results {
        println!(
            "{:<12} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>7.1}%",
            result.scenario,
            result.mean_kg,
            result.std_dev_kg,
            result.p5_kg,
            result.p50_kg,
            result.p95_kg,
            result.prob_net_positive * 100.0
        );
    }
}

pub fn print_sensitivity(report: &SensitivityReport) {
    println!(
        "\n--- Sensitivity (±10%), base net removal {:.2} kg ---",
        report.base_net_removal_kg
    );
    println!(
        "{:<24} {:>12} {:>12} {:>12} {:>11}",
        "Parameter", "Base", "Net @ -10%", "Net @ +10%", "Elasticity"
    );
    for entry in report.tornado_order() {
        println!(
            "{:<24} {:>12.3} {:>12.1} {:>12.1} {:>11}",
            entry.parameter.label(),
            entry.base_value,
            entry.net_low_kg,
            entry.net_high_kg,
            ratio(entry.elasticity, "")
        );
    }
}
