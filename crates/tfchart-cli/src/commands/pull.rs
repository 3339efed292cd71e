//! Pull command - download a chart from an OCI registry

use console::style;
use std::path::Path;
use tfchart_repo::{ChartSource, OciPuller};

use crate::error::{CliError, Result};

pub async fn run(reference: &str, dest: &Path) -> Result<()> {
    if !ChartSource::parse(reference).is_remote() {
        return Err(CliError::validation_with_help(
            format!("`{}` is not an OCI reference", reference),
            "use oci://registry/repository/chart:tag",
        ));
    }

    println!("{} Pulling {}...", style("→").blue(), reference);
    let chart_dir = OciPuller::from_env().pull(reference, dest).await?;

    println!(
        "{} Pulled to {}",
        style("✓").green().bold(),
        chart_dir.display()
    );
    Ok(())
}
