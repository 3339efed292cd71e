//! CLI commands

pub mod lint;
pub mod pull;
pub mod render;
pub mod serve;
pub mod show;
