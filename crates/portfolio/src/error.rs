use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Cannot transact asset '{given}' against the position ledger for '{held}'")]
    AssetMismatch { held: String, given: String },

    #[error("Supplied update time '{supplied}' is earlier than the current time '{current}'")]
    BackwardTimestamp {
        supplied: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("Market price '{price}' of asset '{asset}' must be positive")]
    NonPositivePrice { asset: String, price: Decimal },

    #[error("Fx rate '{rate}' of asset '{asset}' must be positive")]
    NonPositiveFxRate { asset: String, rate: Decimal },

    #[error("Cannot credit or debit negative amount '{amount}'")]
    NegativeAmount { amount: Decimal },

    #[error(
        "Withdrawal of {requested} {currency} exceeds the current cash balance of {available}"
    )]
    InsufficientFunds {
        currency: String,
        requested: Decimal,
        available: Decimal,
    },
}
