//! tfchart Engine - Jinja2 templating for Terraform charts
//!
//! This crate provides a MiniJinja-based template engine with:
//! - Presence-based template enablement driven by the values document
//! - Terraform-friendly filters (`tohcl`, `quote`, `b64encode`, ...)
//! - Output directory synchronization (write enabled, remove disabled)
//! - Human-readable error messages with suggestions

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod suggestions;

use std::path::Path;

use tfchart_core::{Chart, Values};

pub use engine::{Engine, EngineBuilder, RenderOutcome, RenderReport};
pub use error::{EngineError, RenderPhase, Result, TemplateError, TemplateErrorKind};
pub use suggestions::{AVAILABLE_FILTERS, AVAILABLE_FUNCTIONS};

/// Render a chart directory into `output_dir` with values from a file
///
/// Loads the values, loads the chart, validates it and renders every
/// template, honouring the chart's `engine.strict` setting.
pub fn render(
    values_path: impl AsRef<Path>,
    chart_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
) -> Result<RenderReport> {
    let values = Values::from_file(values_path)?;
    let chart = Chart::load(chart_path)?.with_values(values);

    Engine::builder()
        .strict(chart.metadata.engine.strict)
        .build()
        .render_chart(&chart, output_dir.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_chart(root: &Path, chart_yaml: &str, templates: &[(&str, &str)]) {
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::write(root.join("Chart.yaml"), chart_yaml).unwrap();
        for (name, body) in templates {
            fs::write(root.join("templates").join(name), body).unwrap();
        }
    }

    #[test]
    fn test_render_end_to_end() {
        let dir = TempDir::new().unwrap();
        let chart_dir = dir.path().join("aws-vpc");
        write_chart(
            &chart_dir,
            "name: aws-vpc\nversion: 1.0.0\ntype: aws\n",
            &[
                (
                    "network.tf",
                    "resource \"aws_vpc\" \"main\" {\n  cidr_block = {{ network.cidr | tohcl }}\n  tags       = {{ tags | tohcl }}\n}\n",
                ),
                ("compute.tf", "# compute"),
            ],
        );
        let values_path = dir.path().join("values.yaml");
        fs::write(
            &values_path,
            "network:\n  cidr: 10.0.0.0/16\ntags:\n  Env: prod\n",
        )
        .unwrap();
        let out = dir.path().join("output");

        let report = render(&values_path, &chart_dir, &out).unwrap();

        assert_eq!(report.chart, "aws-vpc");
        assert_eq!(report.summary(), "1 written, 0 removed, 1 skipped");
        insta::assert_snapshot!(fs::read_to_string(out.join("network.tf")).unwrap(), @r#"
        resource "aws_vpc" "main" {
          cidr_block = "10.0.0.0/16"
          tags       = { Env = "prod" }
        }
        "#);
    }

    #[test]
    fn test_render_honours_chart_strictness() {
        let dir = TempDir::new().unwrap();
        let values_path = dir.path().join("values.yaml");
        fs::write(&values_path, "network: {}\n").unwrap();
        let out = dir.path().join("output");

        write_chart(
            &dir.path().join("strict"),
            "name: strict\nversion: 1.0.0\n",
            &[("network.tf", "cidr = \"{{ network.cidr }}\"")],
        );
        let err = render(&values_path, dir.path().join("strict"), &out).unwrap_err();
        assert_eq!(err.phase(), RenderPhase::TemplateExecution);

        write_chart(
            &dir.path().join("lenient"),
            "name: lenient\nversion: 1.0.0\nengine:\n  strict: false\n",
            &[("network.tf", "cidr = \"{{ network.cidr }}\"")],
        );
        render(&values_path, dir.path().join("lenient"), &out).unwrap();
        assert_eq!(fs::read_to_string(out.join("network.tf")).unwrap(), "cidr = \"\"");
    }

    #[test]
    fn test_render_missing_values_file() {
        let dir = TempDir::new().unwrap();
        let err = render(dir.path().join("nope.yaml"), dir.path(), dir.path()).unwrap_err();
        assert_eq!(err.phase(), RenderPhase::Io);
    }

    #[test]
    fn test_render_invalid_values_file() {
        let dir = TempDir::new().unwrap();
        let values_path = dir.path().join("values.yaml");
        fs::write(&values_path, "network: [").unwrap();

        let err = render(&values_path, dir.path(), dir.path()).unwrap_err();
        assert_eq!(err.phase(), RenderPhase::Parse);
        assert!(err.to_string().contains("values.yaml"));
    }
}
