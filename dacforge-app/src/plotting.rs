//! Charts of weekly results and simulation outcomes.

use anyhow::Result;
use dacforge_core::{emissions::WeeklyResult, simulation::engine::ScenarioComparison};
use plotters::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// `(min, max)` widened to include zero and padded by 10 %.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((max - min) * 0.1).max(1.0);
    (min - pad, max + pad)
}

/// Bar chart of weekly net removal with total emissions overlaid.
pub fn plot_weekly_net(path: &Path, results: &[WeeklyResult]) -> Result<()> {
    if results.is_empty() {
        warn!("no weekly results to plot");
        return Ok(());
    }
    let root = BitMapBackend::new(path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = padded_range(
        results
            .iter()
            .flat_map(|r| [r.net_removal_kg, r.total_emissions_kg, r.liquefied_co2_kg]),
    );
    let x_max = results.len() as f64 - 0.5;
    let labels: Vec<String> = results
        .iter()
        .map(|r| r.week.date().format("%Y-%m-%d").to_string())
        .collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Weekly Net CO2 Removal", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Week starting")
        .y_desc("kg CO2")
        .x_labels(results.len().min(12))
        .x_label_formatter(&|x: &f64| {
            labels
                .get(x.round().max(0.0) as usize)
                .cloned()
                .unwrap_or_default()
        })
        .draw()?;

    chart
        .draw_series(results.iter().enumerate().map(|(i, r)| {
            let x = i as f64;
            let color = if r.net_removal_kg > 0.0 { GREEN } else { RED };
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, r.net_removal_kg)], color.filled())
        }))?
        .label("Net removal")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], GREEN.filled()));

    chart
        .draw_series(LineSeries::new(
            results.iter().enumerate().map(|(i, r)| (i as f64, r.total_emissions_kg)),
            BLUE.stroke_width(2),
        ))?
        .label("Total emissions")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));

    chart
        .draw_series(LineSeries::new(
            results.iter().enumerate().map(|(i, r)| (i as f64, r.liquefied_co2_kg)),
            BLACK.stroke_width(2),
        ))?
        .label("Liquefied CO2")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    info!(path = %path.display(), "saved weekly chart");
    Ok(())
}

/// P5–P95 range per scenario, with the median marked.
pub fn plot_scenarios(path: &Path, comparison: &ScenarioComparison) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = padded_range(
        comparison
            .results
            .iter()
            .flat_map(|r| [r.p5_kg, r.p95_kg]),
    );
    let names: Vec<String> = comparison.results.iter().map(|r| r.scenario.clone()).collect();
    let x_max = names.len() as f64 - 0.5;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Net Removal Distribution ({} runs)", comparison.iterations),
            ("sans-serif", 32).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(names.len())
        .x_label_formatter(&|x: &f64| {
            names
                .get(x.round().max(0.0) as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("kg CO2 per week")
        .draw()?;

    chart.draw_series(LineSeries::new(
        vec![(-0.5, 0.0), (x_max, 0.0)],
        BLACK.mix(0.5).stroke_width(1),
    ))?;

    chart
        .draw_series(comparison.results.iter().enumerate().map(|(i, r)| {
            let x = i as f64;
            Rectangle::new([(x - 0.2, r.p5_kg), (x + 0.2, r.p95_kg)], BLUE.mix(0.3).filled())
        }))?
        .label("P5-P95")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], BLUE.mix(0.3).filled()));

    chart
        .draw_series(
            comparison
                .results
                .iter()
                .enumerate()
                .map(|(i, r)| Circle::new((i as f64, r.p50_kg), 6, RED.filled())),
        )?
        .label("Median")
        .legend(|(x, y)| Circle::new((x + 8, y), 5, RED.filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    info!(path = %path.display(), "saved scenario chart");
    Ok(())
}
