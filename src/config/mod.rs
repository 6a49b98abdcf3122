//! Dosing Configuration Module
//!
//! Provides per-furnace configuration loaded from TOML files: tracked
//! elements, alloy bounds, melt weight limits and the step strategy.
//!
//! ## Loading Order
//!
//! 1. `--config` CLI flag (hard error if the file is bad)
//! 2. `DOSING_CONFIG` environment variable (path to TOML file)
//! 3. `dosing_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded config is handed to `DosingPipeline::new` and shared behind an
//! `Arc`; there is no global instance.

mod dosing_config;
pub mod defaults;
pub mod validation;

pub use dosing_config::*;
