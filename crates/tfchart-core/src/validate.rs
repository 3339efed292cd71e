//! Structural validation of loaded charts

use semver::Version;

use crate::chart::Chart;
use crate::error::{CoreError, Result};

/// Reject charts that cannot be rendered
///
/// Checks run in a fixed order so the reported reason is deterministic:
/// presence, name, version, templates, values.
pub fn validate_chart(chart: Option<&Chart>) -> Result<()> {
    let Some(chart) = chart else {
        return Err(CoreError::validation("chart is missing"));
    };

    if chart.metadata.name.trim().is_empty() {
        return Err(CoreError::validation("chart name is required"));
    }
    if chart.metadata.version.trim().is_empty() {
        return Err(CoreError::validation("chart version is required"));
    }
    if chart.templates.is_empty() {
        return Err(CoreError::validation("no templates found in chart"));
    }
    if chart.values.is_empty() {
        return Err(CoreError::validation("values document is empty"));
    }

    Ok(())
}

/// A non-fatal finding reported by `lint_chart`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub message: String,
    pub suggestion: Option<String>,
}

impl LintIssue {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Collect warnings that do not block rendering
pub fn lint_chart(chart: &Chart) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let meta = &chart.metadata;

    if meta.chart_type.trim().is_empty() {
        issues.push(
            LintIssue::new("chart type is not set")
                .with_suggestion("add `type: aws` (or gcp, azure, ...) to Chart.yaml"),
        );
    }

    if !meta.version.is_empty() && Version::parse(&meta.version).is_err() {
        issues.push(
            LintIssue::new(format!("version `{}` is not valid SemVer", meta.version))
                .with_suggestion("use MAJOR.MINOR.PATCH, e.g. 1.0.0"),
        );
    }

    if meta.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
        issues.push(LintIssue::new("chart has no description"));
    }

    if !chart.values.is_empty() {
        for template in &chart.templates {
            let key = template.enablement_key();
            if !chart.values.contains_key(key) {
                issues.push(
                    LintIssue::new(format!(
                        "template `{}` is disabled: no `{}` key in values",
                        template.name, key
                    ))
                    .with_suggestion(format!("add `{}: {{}}` to enable it", key)),
                );
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartMetadata, TemplateUnit};
    use crate::values::Values;

    fn valid_chart() -> Chart {
        let metadata = ChartMetadata {
            name: "aws-vpc".to_string(),
            version: "1.0.0".to_string(),
            chart_type: "aws".to_string(),
            description: Some("VPC".to_string()),
            ..Default::default()
        };
        Chart::new(metadata, vec![TemplateUnit::new("network.tf", "")])
            .with_values(Values::from_yaml("network: {}").unwrap())
    }

    fn reason(chart: Option<&Chart>) -> String {
        match validate_chart(chart) {
            Err(CoreError::Validation { reason }) => reason,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_chart() {
        assert!(validate_chart(Some(&valid_chart())).is_ok());
        assert!(valid_chart().validate().is_ok());
    }

    #[test]
    fn test_missing_chart() {
        assert_eq!(reason(None), "chart is missing");
    }

    #[test]
    fn test_missing_name() {
        let mut chart = valid_chart();
        chart.metadata.name = "  ".to_string();
        assert_eq!(reason(Some(&chart)), "chart name is required");
    }

    #[test]
    fn test_missing_version() {
        let mut chart = valid_chart();
        chart.metadata.version.clear();
        assert_eq!(reason(Some(&chart)), "chart version is required");
    }

    #[test]
    fn test_no_templates() {
        let mut chart = valid_chart();
        chart.templates.clear();
        assert_eq!(reason(Some(&chart)), "no templates found in chart");
    }

    #[test]
    fn test_empty_values() {
        let chart = valid_chart().with_values(Values::new());
        assert_eq!(reason(Some(&chart)), "values document is empty");
    }

    #[test]
    fn test_check_order() {
        let chart = Chart::new(ChartMetadata::default(), vec![]);
        assert_eq!(reason(Some(&chart)), "chart name is required");
    }

    #[test]
    fn test_lint_clean_chart() {
        assert!(lint_chart(&valid_chart()).is_empty());
    }

    #[test]
    fn test_lint_reports_warnings() {
        let mut chart = valid_chart();
        chart.metadata.chart_type.clear();
        chart.metadata.version = "v1".to_string();
        chart.metadata.description = None;
        chart.templates.push(TemplateUnit::new("storage.tf", ""));

        let messages: Vec<String> = lint_chart(&chart).into_iter().map(|i| i.message).collect();

        assert_eq!(
            messages,
            vec![
                "chart type is not set".to_string(),
                "version `v1` is not valid SemVer".to_string(),
                "chart has no description".to_string(),
                "template `storage.tf` is disabled: no `storage` key in values".to_string(),
            ]
        );
    }
}
