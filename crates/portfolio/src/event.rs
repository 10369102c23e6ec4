use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed set of events a portfolio records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortfolioEventKind {
    Subscription,
    Withdrawal,
    AssetTransaction,
    FxTransaction,
}

/// One immutable entry in a portfolio's append-only history.
///
/// Amounts are recorded rounded to two decimal places; `balance` is the
/// post-event balance of `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEvent {
    pub dt: DateTime<Utc>,
    pub kind: PortfolioEventKind,
    pub description: String,
    pub currency: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

impl PortfolioEvent {
    pub fn subscription(
        dt: DateTime<Utc>,
        currency: impl Into<String>,
        credit: Decimal,
        balance: Decimal,
    ) -> Self {
        Self {
            dt,
            kind: PortfolioEventKind::Subscription,
            description: "SUBSCRIPTION".to_string(),
            currency: currency.into(),
            debit: Decimal::ZERO,
            credit: credit.round_dp(2),
            balance: balance.round_dp(2),
        }
    }

    pub fn withdrawal(
        dt: DateTime<Utc>,
        currency: impl Into<String>,
        debit: Decimal,
        balance: Decimal,
    ) -> Self {
        Self {
            dt,
            kind: PortfolioEventKind::Withdrawal,
            description: "WITHDRAWAL".to_string(),
            currency: currency.into(),
            debit: debit.round_dp(2),
            credit: Decimal::ZERO,
            balance: balance.round_dp(2),
        }
    }
}
