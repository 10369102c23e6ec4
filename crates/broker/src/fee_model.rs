use rust_decimal::Decimal;

/// Commission schedule applied to each executed order.
///
/// `quantity` is the (signed) amount being traded and `consideration` the
/// rounded cost of the trade in its settlement currency; implementations
/// return the total commission in that same currency.
pub trait FeeModel: Send + Sync {
    fn commission(&self, asset: &str, quantity: Decimal, consideration: Decimal) -> Decimal;
}

/// The frictionless default: every trade is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroFeeModel;

impl FeeModel for ZeroFeeModel {
    fn commission(&self, _asset: &str, _quantity: Decimal, _consideration: Decimal) -> Decimal {
        Decimal::ZERO
    }
}

/// A flat percentage-of-consideration schedule with an optional tax/levy
/// component, charged on the absolute consideration so that sells are
/// costed like buys.
#[derive(Debug, Clone, Copy)]
pub struct PercentFeeModel {
    commission_pct: Decimal,
    tax_pct: Decimal,
}

impl PercentFeeModel {
    pub fn new(commission_pct: Decimal, tax_pct: Decimal) -> Self {
        Self {
            commission_pct,
            tax_pct,
        }
    }
}

impl FeeModel for PercentFeeModel {
    fn commission(&self, _asset: &str, _quantity: Decimal, consideration: Decimal) -> Decimal {
        (self.commission_pct + self.tax_pct) * consideration.abs()
    }
}
