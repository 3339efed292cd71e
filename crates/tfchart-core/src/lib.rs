//! tfchart Core - Core types for rendering Terraform charts
//!
//! This crate provides the foundational types used throughout tfchart:
//! - `Values`: The values document driving a render, with deep merge support
//! - `Chart`: Chart metadata plus the `.tf` templates it ships
//! - `validate_chart`: Structural checks run before anything is rendered
//! - `output`: Idempotent filesystem primitives used to sync the output directory

pub mod chart;
pub mod error;
pub mod output;
pub mod validate;
pub mod values;

pub use chart::{Chart, ChartMetadata, EngineConfig, Maintainer, TemplateUnit, TEMPLATE_EXTENSION};
pub use error::{CoreError, Result};
pub use validate::{lint_chart, validate_chart, LintIssue};
pub use values::{parse_set_values, Values};
