//! Lint command - check a chart without rendering it

use console::style;
use std::path::Path;
use tfchart_core::{Chart, Values, lint_chart};
use tfchart_engine::Engine;

use crate::error::{CliError, Result};

pub fn run(path: &Path, values_file: Option<&Path>) -> Result<()> {
    println!(
        "{} Linting chart at {}",
        style("→").blue(),
        path.display()
    );

    let mut errors = 0;
    let mut warnings = 0;

    let chart = match Chart::load(path) {
        Ok(c) => {
            println!(
                "  {} Chart.yaml is valid ({} v{})",
                style("✓").green(),
                c.metadata.name,
                c.metadata.version
            );
            c
        }
        Err(e) => {
            println!("  {} Chart.yaml: {}", style("✗").red(), e);
            return Err(CliError::lint_failed(1, 0));
        }
    };

    let chart = match values_file {
        Some(file) => match Values::from_file(file) {
            Ok(values) => {
                println!("  {} {} is valid", style("✓").green(), file.display());
                chart.with_values(values)
            }
            Err(e) => {
                println!("  {} {}", style("✗").red(), e);
                errors += 1;
                chart
            }
        },
        None => chart,
    };

    if chart.templates.is_empty() {
        println!("  {} templates/ has no .tf files", style("✗").red());
        errors += 1;
    } else {
        println!(
            "  {} templates/ contains {} template(s)",
            style("✓").green(),
            chart.templates.len()
        );
    }

    if !chart.values.is_empty()
        && let Err(e) = chart.validate()
    {
        println!("  {} {}", style("✗").red(), e);
        errors += 1;
    }

    println!();
    println!("{} Checking template syntax...", style("→").blue());

    let engine = Engine::new(chart.metadata.engine.strict);
    for template in &chart.templates {
        match engine.check_syntax(template) {
            Ok(()) => println!("  {} {}", style("✓").green(), template.name),
            Err(e) => {
                println!("  {} {}", style("✗").red(), template.name);
                println!("{:?}", miette::Report::new(CliError::from(e)));
                errors += 1;
            }
        }
    }

    let issues = lint_chart(&chart);
    if !issues.is_empty() {
        println!();
        for issue in &issues {
            println!("  {} {}", style("⚠").yellow(), issue.message);
            if let Some(suggestion) = &issue.suggestion {
                println!("      {}", style(suggestion).dim());
            }
        }
        warnings += issues.len();
    }

    println!();
    if errors > 0 {
        println!(
            "{} Linting failed with {} error(s) and {} warning(s)",
            style("✗").red().bold(),
            errors,
            warnings
        );
        return Err(CliError::lint_failed(errors, warnings));
    }

    if warnings > 0 {
        println!(
            "{} Linting passed with {} warning(s)",
            style("⚠").yellow().bold(),
            warnings
        );
    } else {
        println!("{} Linting passed!", style("✓").green().bold());
    }

    Ok(())
}
