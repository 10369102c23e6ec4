use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{Direction, TradeKind};

/// An instruction submitted to the broker, executed on its next update.
///
/// `currency` overrides the settlement currency: for a stock order the
/// default is the asset's home currency from the universe, for an FX order
/// the portfolio's base currency. `auto_fx` asks the broker to fund a
/// shortfall in the settlement currency from base cash on a buy, and to
/// sweep sale proceeds back into base cash on a sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub kind: TradeKind,
    pub created_dt: DateTime<Utc>,
    pub asset: String,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: Decimal,
    pub commission: Decimal,
    pub currency: Option<String>,
    pub auto_fx: bool,
    pub order_id: String,
}

impl Order {
    /// A stock order settled in the asset's home currency unless overridden.
    pub fn stock(dt: DateTime<Utc>, asset: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(TradeKind::Stock, dt, asset, quantity)
    }

    /// An FX order converting `quantity` of `asset` (a currency) against the
    /// base currency unless overridden.
    pub fn fx(dt: DateTime<Utc>, asset: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(TradeKind::Fx, dt, asset, quantity)
    }

    fn new(kind: TradeKind, dt: DateTime<Utc>, asset: impl Into<String>, quantity: Decimal) -> Self {
        Self {
            kind,
            created_dt: dt,
            asset: asset.into(),
            quantity,
            commission: Decimal::ZERO,
            currency: None,
            auto_fx: false,
            order_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// Settle this order in an explicit currency.
    pub fn in_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Enable automatic currency conversion for settlement shortfalls and
    /// sale proceeds.
    pub fn with_auto_fx(mut self) -> Self {
        self.auto_fx = true;
        self
    }

    /// Replace the generated order id, primarily for reproducible tests.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    pub fn direction(&self) -> Direction {
        Direction::of_signed(self.quantity)
    }
}
