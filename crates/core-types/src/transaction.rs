use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{Direction, TradeKind};

/// An immutable record of one fill.
///
/// A stock transaction carries the asset's trade `price` in its settlement
/// `currency` and the `fx_rate` translating that currency into the
/// portfolio's base currency. An FX transaction reuses the same shape: the
/// `asset` is the currency being bought or sold, `price` is its base-currency
/// rate and `currency`/`fx_rate` describe the opposite leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TradeKind,
    pub asset: String,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: Decimal,
    pub dt: DateTime<Utc>,
    pub price: Decimal,
    pub currency: String,
    pub fx_rate: Decimal,
    pub order_id: String,
    pub commission: Decimal,
}

impl Transaction {
    /// A fill of an equity asset settled in `currency`.
    #[allow(clippy::too_many_arguments)]
    pub fn stock(
        asset: impl Into<String>,
        quantity: Decimal,
        dt: DateTime<Utc>,
        price: Decimal,
        currency: impl Into<String>,
        fx_rate: Decimal,
        order_id: impl Into<String>,
        commission: Decimal,
    ) -> Self {
        Self {
            kind: TradeKind::Stock,
            asset: asset.into(),
            quantity,
            dt,
            price,
            currency: currency.into(),
            fx_rate,
            order_id: order_id.into(),
            commission,
        }
    }

    /// A currency conversion: buy `quantity` of `asset` (a currency) against
    /// `currency`, at the respective base-currency rates.
    #[allow(clippy::too_many_arguments)]
    pub fn fx(
        asset: impl Into<String>,
        quantity: Decimal,
        dt: DateTime<Utc>,
        price: Decimal,
        currency: impl Into<String>,
        fx_rate: Decimal,
        order_id: impl Into<String>,
        commission: Decimal,
    ) -> Self {
        Self {
            kind: TradeKind::Fx,
            asset: asset.into(),
            quantity,
            dt,
            price,
            currency: currency.into(),
            fx_rate,
            order_id: order_id.into(),
            commission,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::of_signed(self.quantity)
    }

    /// Consideration in the settlement currency, excluding commission.
    pub fn cost_without_commission(&self) -> Decimal {
        self.quantity * self.price
    }

    /// Consideration in the settlement currency, including commission.
    pub fn cost_with_commission(&self) -> Decimal {
        self.cost_without_commission() + self.commission
    }
}

/// One pure cash leg: the unit the currency ledger consumes.
///
/// Cash movements are accounting artifacts, never submitted by a caller.
/// Subscriptions, withdrawals and stock-settlement offsets are single legs
/// with zero commission; an FX transaction decomposes into two legs each
/// carrying half the conversion commission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashMovement {
    /// The currency whose balance moves.
    pub currency: String,
    /// Signed amount in units of `currency`.
    pub quantity: Decimal,
    pub dt: DateTime<Utc>,
    /// Base-currency rate at which this leg was struck.
    pub fx_rate: Decimal,
    pub order_id: String,
    pub commission: Decimal,
}

impl CashMovement {
    pub fn new(
        currency: impl Into<String>,
        quantity: Decimal,
        dt: DateTime<Utc>,
        fx_rate: Decimal,
        order_id: impl Into<String>,
        commission: Decimal,
    ) -> Self {
        Self {
            currency: currency.into(),
            quantity,
            dt,
            fx_rate,
            order_id: order_id.into(),
            commission,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::of_signed(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn dt() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 16, 15, 0, 0).unwrap()
    }

    #[test]
    fn stock_transaction_costs() {
        let txn = Transaction::stock(
            "EQ:MSFT",
            dec!(100),
            dt(),
            dec!(193.74),
            "USD",
            dec!(1.0),
            "123",
            dec!(1.0),
        );
        assert_eq!(txn.kind, TradeKind::Stock);
        assert_eq!(txn.direction(), Direction::Long);
        assert_eq!(txn.cost_without_commission(), dec!(19374.00));
        assert_eq!(txn.cost_with_commission(), dec!(19375.00));
    }

    #[test]
    fn sell_transaction_has_negative_cost() {
        let txn = Transaction::stock(
            "EQ:MSFT",
            dec!(-100),
            dt(),
            dec!(193.74),
            "USD",
            dec!(1.0),
            "123",
            dec!(0),
        );
        assert_eq!(txn.direction(), Direction::Short);
        assert_eq!(txn.cost_with_commission(), dec!(-19374.00));
    }

    #[test]
    fn fx_transaction_kind_and_direction() {
        let txn = Transaction::fx(
            "EUR",
            dec!(75000),
            dt(),
            dec!(1.24),
            "USD",
            dec!(1.0),
            "abc",
            dec!(0),
        );
        assert_eq!(txn.kind, TradeKind::Fx);
        assert_eq!(txn.direction(), Direction::Long);
        assert_eq!(txn.cost_without_commission(), dec!(93000.00));
    }
}
