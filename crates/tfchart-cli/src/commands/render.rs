//! Render command - render a chart into an output directory

use console::style;
use std::path::Path;
use tfchart_core::{Chart, Values, parse_set_values};
use tfchart_engine::{Engine, RenderOutcome};
use tfchart_repo::ChartSource;

use crate::error::{CliError, Result};

pub async fn run(
    chart_ref: &str,
    values_file: &Path,
    set_values: &[String],
    output_dir: &Path,
    lenient: bool,
    cache_dir: &Path,
) -> Result<()> {
    let source = ChartSource::parse(chart_ref);
    let chart_dir = source.resolve(cache_dir).await?;
    tracing::debug!(source = %source, path = %chart_dir.display(), "chart resolved");

    let mut values = Values::from_file(values_file)?;
    if !set_values.is_empty() {
        values.merge(&parse_set_values(set_values)?);
        tracing::debug!(count = set_values.len(), "applied --set overrides");
    }

    let chart = Chart::load(&chart_dir)?.with_values(values);
    let engine = Engine::builder()
        .strict(!lenient && chart.metadata.engine.strict)
        .build();

    tracing::info!(
        chart = %chart.metadata.name,
        version = %chart.metadata.version,
        templates = chart.templates.len(),
        strict = engine.is_strict(),
        output = %output_dir.display(),
        "rendering chart"
    );

    let report = engine
        .render_chart(&chart, output_dir)
        .map_err(|e| {
            tracing::error!(
                chart = %chart.metadata.name,
                phase = %e.phase(),
                template = e.template().unwrap_or("-"),
                kind = e
                    .template_error()
                    .map(|t| t.kind().to_code_string())
                    .unwrap_or("-"),
                "render failed"
            );
            CliError::from(e)
        })?;

    for (template, outcome) in &report.outcomes {
        tracing::info!(
            template = %template,
            action = outcome.action(),
            path = %outcome.path().display(),
            "template processed"
        );

        let label = format!("{:<8}", outcome.action());
        let label = match outcome {
            RenderOutcome::Written(_) => style(label).green(),
            RenderOutcome::Removed(_) => style(label).yellow(),
            RenderOutcome::Skipped(_) => style(label).dim(),
        };
        println!("  {} {}", label, outcome.path().display());
    }

    println!();
    println!(
        "{} Rendered {} ({})",
        style("✓").green().bold(),
        style(&report.chart).cyan(),
        report.summary()
    );

    Ok(())
}
