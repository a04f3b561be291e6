//! CLI subcommands.

pub mod common;
pub mod config;
pub mod fill;
pub mod stats;
pub mod zoom;
