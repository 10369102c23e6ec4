use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ConfigError;

/// The root configuration structure for a simulation run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub simulation: Simulation,
}

/// Contains the broker and portfolio parameters for a single run.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    /// The single currency in which consolidated valuations are reported.
    pub base_currency: String,
    /// Cash credited to the broker's master account at start, in base currency.
    pub initial_funds: Decimal,
    /// Broker commission as a fraction of consideration (e.g. 0.001 for 10 bps).
    #[serde(default)]
    pub commission_pct: Decimal,
    /// Exchange tax/levy as a fraction of consideration.
    #[serde(default)]
    pub tax_pct: Decimal,
}

impl Settings {
    /// Loads and validates settings from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.base_currency.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "base_currency must not be empty".to_string(),
            ));
        }
        if self.simulation.initial_funds < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "initial_funds must be non-negative, got {}",
                self.simulation.initial_funds
            )));
        }
        if self.simulation.commission_pct < Decimal::ZERO || self.simulation.tax_pct < Decimal::ZERO
        {
            return Err(ConfigError::Invalid(
                "fee percentages must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
