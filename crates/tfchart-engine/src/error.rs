//! Engine error types with source-annotated diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tfchart_core::CoreError;

use crate::suggestions::{
    extract_quoted_name, suggest_iteration_fix, suggest_undefined_variable,
    suggest_unknown_filter, suggest_unknown_function,
};

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Template syntax error in {template}: {error}")]
    TemplateSyntax {
        template: String,
        #[source]
        error: Box<TemplateError>,
    },

    #[error("Template execution failed in {template}: {error}")]
    TemplateExecution {
        template: String,
        #[source]
        error: Box<TemplateError>,
    },
}

/// The stage of a render that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Io,
    Parse,
    Validation,
    TemplateSyntax,
    TemplateExecution,
}

impl RenderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::TemplateSyntax => "template_syntax",
            Self::TemplateExecution => "template_execution",
        }
    }
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn phase(&self) -> RenderPhase {
        match self {
            Self::Core(CoreError::Io { .. } | CoreError::ChartNotFound { .. }) => RenderPhase::Io,
            Self::Core(CoreError::Parse { .. } | CoreError::ValuesMerge { .. }) => {
                RenderPhase::Parse
            }
            Self::Core(CoreError::Validation { .. }) => RenderPhase::Validation,
            Self::TemplateSyntax { .. } => RenderPhase::TemplateSyntax,
            Self::TemplateExecution { .. } => RenderPhase::TemplateExecution,
        }
    }

    /// Name of the template that failed, if the failure is tied to one
    pub fn template(&self) -> Option<&str> {
        match self {
            Self::TemplateSyntax { template, .. } | Self::TemplateExecution { template, .. } => {
                Some(template)
            }
            Self::Core(_) => None,
        }
    }

    /// The annotated template diagnostic, if any
    pub fn template_error(&self) -> Option<&TemplateError> {
        match self {
            Self::TemplateSyntax { error, .. } | Self::TemplateExecution { error, .. } => {
                Some(error)
            }
            Self::Core(_) => None,
        }
    }
}

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TypeError,
    InvalidOperation,
    Other,
}

impl TemplateErrorKind {
    /// Convert to a code string for diagnostics
    pub fn to_code_string(&self) -> &'static str {
        match self {
            Self::UndefinedVariable => "undefined_variable",
            Self::UnknownFilter => "unknown_filter",
            Self::UnknownFunction => "unknown_function",
            Self::SyntaxError => "syntax",
            Self::TypeError => "type",
            Self::InvalidOperation => "invalid_operation",
            Self::Other => "render",
        }
    }
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(tfchart::template::render))]
pub struct TemplateError {
    pub message: String,

    pub kind: TemplateErrorKind,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Build a diagnostic from a MiniJinja error
    ///
    /// `values` is the document the template ran against; it feeds the
    /// fuzzy matcher for undefined variables.
    pub fn from_minijinja(
        err: &minijinja::Error,
        template_name: &str,
        template_source: &str,
        values: Option<&JsonValue>,
    ) -> Self {
        let kind = categorize(err);
        let detailed = format!("{:#}", err);
        let message = describe(err, kind, &detailed);
        let span = err
            .line()
            .and_then(|line| calculate_span(template_source, line));
        let suggestion = generate_suggestion(err, kind, &detailed, values);

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }

    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

fn categorize(err: &minijinja::Error) -> TemplateErrorKind {
    match err.kind() {
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
        minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
        minijinja::ErrorKind::NonPrimitive | minijinja::ErrorKind::NonKey => {
            TemplateErrorKind::TypeError
        }
        _ => {
            let msg = err.to_string().to_lowercase();
            if msg.contains("undefined") {
                TemplateErrorKind::UndefinedVariable
            } else if msg.contains("not iterable") || msg.contains("cannot") {
                TemplateErrorKind::TypeError
            } else {
                TemplateErrorKind::Other
            }
        }
    }
}

fn describe(err: &minijinja::Error, kind: TemplateErrorKind, detailed: &str) -> String {
    let msg = err.detail().map(str::to_string).unwrap_or_else(|| err.to_string());

    match kind {
        TemplateErrorKind::UndefinedVariable => match extract_expression(detailed) {
            Some(expr) => format!("undefined variable `{}`", expr),
            None => msg.replace("undefined value", "undefined variable"),
        },
        TemplateErrorKind::UnknownFilter => match extract_filter(detailed) {
            Some(filter) => format!("unknown filter `{}`", filter),
            None => msg,
        },
        _ => msg
            .replace("invalid operation: ", "")
            .replace("syntax error: ", ""),
    }
}

/// Extract the expression on the line MiniJinja marks with `>`
///
/// ```text
///    8 >   cidr = "{{ network.cidrr }}"
///      i             ^^^^^^^^^^^^^ undefined value
/// ```
fn extract_expression(display: &str) -> Option<String> {
    marked_expression(display).and_then(|expr| {
        let head = expr.split('|').next().unwrap_or(expr).trim();
        (!head.is_empty()).then(|| head.to_string())
    })
}

fn extract_filter(display: &str) -> Option<String> {
    marked_expression(display).and_then(|expr| {
        let (_, filter) = expr.rsplit_once('|')?;
        let name = filter
            .trim()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()?;
        (!name.is_empty()).then(|| name.to_string())
    })
}

fn marked_expression(display: &str) -> Option<&str> {
    let line = display.lines().find(|line| {
        let trimmed = line.trim_start();
        trimmed.contains(" > ") || trimmed.starts_with("> ")
    })?;
    let start = line.find("{{")?;
    let end = line[start..].find("}}")?;
    Some(line[start + 2..start + end].trim())
}

/// Calculate the source span covering a whole line
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

fn generate_suggestion(
    err: &minijinja::Error,
    kind: TemplateErrorKind,
    detailed: &str,
    values: Option<&JsonValue>,
) -> Option<String> {
    let msg = err.to_string();

    match kind {
        TemplateErrorKind::UndefinedVariable => {
            let Some(var_name) = extract_expression(detailed) else {
                return Some(
                    "Variable is not defined. Check spelling or use the `default` filter."
                        .to_string(),
                );
            };

            values
                .and_then(|v| suggest_undefined_variable(&var_name, v))
                .or_else(|| {
                    Some(format!(
                        "Variable `{}` is not defined. Check spelling or use `| default(\"fallback\")`.",
                        var_name
                    ))
                })
        }

        TemplateErrorKind::UnknownFilter => extract_filter(detailed)
            .or_else(|| extract_quoted_name(&msg))
            .map(|name| suggest_unknown_filter(&name)),

        TemplateErrorKind::UnknownFunction => {
            extract_quoted_name(&msg).map(|name| suggest_unknown_function(&name))
        }

        TemplateErrorKind::SyntaxError => Some(
            "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements, `{# #}` for comments"
                .to_string(),
        ),

        TemplateErrorKind::TypeError | TemplateErrorKind::InvalidOperation => {
            let lower = msg.to_lowercase();
            if lower.contains("not iterable") {
                Some(suggest_iteration_fix("object"))
            } else if lower.contains("not callable") {
                Some(
                    "Use `{{ value }}` for variables, `{{ func() }}` for function calls."
                        .to_string(),
                )
            } else {
                None
            }
        }

        _ => None,
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_mapping() {
        let err = EngineError::from(CoreError::validation("no templates found in chart"));
        assert_eq!(err.phase(), RenderPhase::Validation);
        assert!(err.template().is_none());

        let err = EngineError::from(CoreError::parse("values.yaml", "bad"));
        assert_eq!(err.phase(), RenderPhase::Parse);

        let err = EngineError::from(CoreError::ChartNotFound {
            path: "x".to_string(),
        });
        assert_eq!(err.phase(), RenderPhase::Io);
    }

    #[test]
    fn test_template_accessor() {
        let source = "cidr_block = {{ network.cidr ";
        let mut env = minijinja::Environment::new();
        let raw = env.add_template("network.tf", source).unwrap_err();
        let error = TemplateError::from_minijinja(&raw, "network.tf", source, None);
        let message = error.message.clone();

        let err = EngineError::TemplateSyntax {
            template: "network.tf".to_string(),
            error: Box::new(error),
        };
        assert_eq!(err.phase(), RenderPhase::TemplateSyntax);
        assert_eq!(err.template(), Some("network.tf"));
        assert_eq!(
            err.template_error().unwrap().kind(),
            TemplateErrorKind::SyntaxError
        );
        assert_eq!(
            err.to_string(),
            format!("Template syntax error in network.tf: {}", message)
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RenderPhase::TemplateExecution.to_string(), "template_execution");
    }

    #[test]
    fn test_kind_code_string() {
        assert_eq!(
            TemplateErrorKind::UndefinedVariable.to_code_string(),
            "undefined_variable"
        );
        assert_eq!(TemplateErrorKind::SyntaxError.to_code_string(), "syntax");
    }

    #[test]
    fn test_extract_expression() {
        let display = r#"
   3 >   cidr = "{{ network.cidrr }}"
     i             ^^^^^^^^^^^^^ undefined value
"#;
        assert_eq!(extract_expression(display), Some("network.cidrr".to_string()));
    }

    #[test]
    fn test_extract_filter() {
        let display = r#"
   2 >   tags = {{ tags | tohlc }}
     i                    ^^^^^ unknown filter
"#;
        assert_eq!(extract_filter(display), Some("tohlc".to_string()));
    }

    #[test]
    fn test_calculate_span() {
        let span = calculate_span("a\nbcd\ne", 2).unwrap();
        assert_eq!(span.offset(), 2);
        assert_eq!(span.len(), 3);
        assert!(calculate_span("a", 5).is_none());
    }

    #[test]
    fn test_from_minijinja_undefined_suggests_key() {
        let mut env = minijinja::Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        let source = "cidr = \"{{ network.cidrr }}\"";
        env.add_template("network.tf", source).unwrap();

        let values = serde_json::json!({"network": {"cidr": "10.0.0.0/16"}});
        let err = env
            .get_template("network.tf")
            .unwrap()
            .render(&values)
            .unwrap_err();

        let error = TemplateError::from_minijinja(&err, "network.tf", source, Some(&values));
        assert_eq!(error.kind(), TemplateErrorKind::UndefinedVariable);
        assert!(error.span.is_some());
        assert_eq!(
            error.suggestion.as_deref(),
            Some("Did you mean `network.cidr`?")
        );
    }
}
