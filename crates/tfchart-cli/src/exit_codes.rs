//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - values document or chart structure rejected
pub const VALIDATION_ERROR: i32 = 2;

/// Template error - syntax or rendering failure
pub const TEMPLATE_ERROR: i32 = 3;

/// Chart error - missing chart or invalid Chart.yaml
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
