//! CLI error types with exit code handling
//!
//! Every failure from the library crates is folded into [`CliError`], which
//! knows its exit code and renders through miette.

use miette::Diagnostic;
use thiserror::Error;
use tfchart_core::CoreError;
use tfchart_core::chart::METADATA_FILE;
use tfchart_engine::{EngineError, TemplateError};
use tfchart_repo::RepoError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Values document or chart structure rejected
    #[error("Validation failed: {message}")]
    #[diagnostic(code(tfchart::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template syntax or rendering failed
    #[error("Template error in {template}")]
    #[diagnostic(code(tfchart::cli::template))]
    Template {
        template: String,
        #[source]
        #[diagnostic_source]
        error: TemplateError,
    },

    /// Chart missing or Chart.yaml unreadable
    #[error("Chart error: {message}")]
    #[diagnostic(code(tfchart::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart could not be fetched from a registry
    #[error("Chart acquisition failed: {message}")]
    #[diagnostic(code(tfchart::cli::repo))]
    Repo { message: String },

    /// Linting failed with errors
    #[error("Linting failed with {errors} error(s) and {warnings} warning(s)")]
    #[diagnostic(code(tfchart::cli::lint))]
    LintFailed { errors: usize, warnings: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(tfchart::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(tfchart::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Repo { .. } | CliError::LintFailed { .. } | CliError::Internal { .. } => {
                exit_codes::ERROR
            }
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn lint_failed(errors: usize, warnings: usize) -> Self {
        Self::LintFailed { errors, warnings }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Core(core) => core.into(),
            EngineError::TemplateSyntax { template, error }
            | EngineError::TemplateExecution { template, error } => CliError::Template {
                template,
                error: *error,
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ChartNotFound { path } => CliError::Chart {
                message: format!("no chart directory at {}", path),
                help: Some("pass a chart directory, a .tgz archive or an oci:// reference".into()),
            },
            CoreError::Parse { ref file, .. } if file.ends_with(METADATA_FILE) => CliError::Chart {
                message: err.to_string(),
                help: None,
            },
            CoreError::Parse { .. } | CoreError::ValuesMerge { .. } => CliError::Validation {
                message: err.to_string(),
                help: None,
            },
            CoreError::Validation { reason } => CliError::Validation {
                message: reason,
                help: None,
            },
            CoreError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::SourceNotFound { .. } => CliError::Chart {
                message: err.to_string(),
                help: None,
            },
            RepoError::Io { .. } | RepoError::Extract { .. } => CliError::Io {
                message: err.to_string(),
            },
            RepoError::InvalidOciReference { .. }
            | RepoError::OciError { .. }
            | RepoError::EmptyManifest { .. } => CliError::Repo {
                message: err.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tfchart_engine::Engine;
    use tfchart_core::{TemplateUnit, Values};

    #[test]
    fn test_core_errors_map_to_exit_codes() {
        let chart: CliError = CoreError::ChartNotFound { path: "x".into() }.into();
        assert_eq!(chart.exit_code(), exit_codes::CHART_ERROR);

        let validation: CliError = CoreError::validation("values document is empty").into();
        assert_eq!(validation.exit_code(), exit_codes::VALIDATION_ERROR);

        let values: CliError = CoreError::parse("values.yaml", "bad indent").into();
        assert_eq!(values.exit_code(), exit_codes::VALIDATION_ERROR);

        let metadata: CliError = CoreError::parse("charts/vpc/Chart.yaml", "bad indent").into();
        assert_eq!(metadata.exit_code(), exit_codes::CHART_ERROR);

        let io: CliError = CoreError::io("out", std::io::Error::other("denied")).into();
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_template_error_keeps_diagnostic() {
        let values = Values::from_yaml("network: {}").unwrap();
        let template = TemplateUnit::new("network.tf", "cidr = {{ network.cidr }}");
        let dir = tempfile::tempdir().unwrap();

        let err: CliError = Engine::new(true)
            .render_template(&template, &values, dir.path())
            .unwrap_err()
            .into();

        assert_eq!(err.exit_code(), exit_codes::TEMPLATE_ERROR);
        assert_eq!(err.to_string(), "Template error in network.tf");
        assert!(err.diagnostic_source().is_some());
    }

    #[test]
    fn test_repo_errors_map_to_exit_codes() {
        let missing: CliError = RepoError::SourceNotFound { path: "c".into() }.into();
        assert_eq!(missing.exit_code(), exit_codes::CHART_ERROR);

        let oci: CliError = RepoError::OciError { message: "401".into() }.into();
        assert_eq!(oci.exit_code(), exit_codes::ERROR);
    }
}
