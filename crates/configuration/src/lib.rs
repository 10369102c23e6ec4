//! # Configuration
//!
//! This crate owns the typed settings for a simulation run. Settings are
//! read from a TOML file via the `config` crate and validated before any
//! other component sees them, so a broker constructed from a `Settings`
//! value never has to re-check basic sanity (negative funds, malformed fee
//! percentages).
//!
//! ## Public API
//!
//! - `Settings`: the root configuration structure.
//! - `Simulation`: the broker/portfolio parameters for one run.
//! - `ConfigError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod settings;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ConfigError;
pub use settings::{Settings, Simulation};
