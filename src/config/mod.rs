//! Configuration module for the booking services.
//!
//! Handles loading and validating configuration from TOML files.

mod settings;

pub use settings::*;
