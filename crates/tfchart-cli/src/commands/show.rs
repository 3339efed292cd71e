//! Show command - display chart information

use console::style;
use std::path::Path;
use tfchart_core::Chart;

use crate::error::Result;

pub fn run(path: &Path) -> Result<()> {
    let chart = Chart::load(path)?;
    let meta = &chart.metadata;

    println!("{}", style(&meta.name).cyan().bold());
    println!("{}", style("=".repeat(meta.name.len())).dim());
    println!();

    println!("{}: {}", style("Version").bold(), meta.version);

    if !meta.chart_type.is_empty() {
        println!("{}: {}", style("Type").bold(), meta.chart_type);
    }

    if let Some(desc) = &meta.description {
        println!("{}: {}", style("Description").bold(), desc);
    }

    if let Some(author) = &meta.author {
        println!("{}: {}", style("Author").bold(), author);
    }

    if let Some(home) = &meta.home {
        println!("{}: {}", style("Home").bold(), home);
    }

    println!(
        "{}: {}",
        style("Strict").bold(),
        if meta.engine.strict { "yes" } else { "no" }
    );

    if !meta.keywords.is_empty() {
        println!();
        println!("{}: {}", style("Keywords").bold(), meta.keywords.join(", "));
    }

    if !meta.maintainers.is_empty() {
        println!();
        println!("{}:", style("Maintainers").bold());
        for maintainer in &meta.maintainers {
            match &maintainer.email {
                Some(email) => println!("  - {} <{}>", maintainer.name, email),
                None => println!("  - {}", maintainer.name),
            }
        }
    }

    println!();
    println!("{}:", style("Templates").bold());
    for template in &chart.templates {
        println!(
            "  - {} {}",
            template.name,
            style(format!("(enabled by `{}`)", template.enablement_key())).dim()
        );
    }

    Ok(())
}
