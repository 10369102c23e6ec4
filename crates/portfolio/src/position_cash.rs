use chrono::{DateTime, Utc};
use core_types::{CashMovement, Direction};
use rust_decimal::Decimal;

use crate::error::PortfolioError;

/// The cost-basis ledger for a single currency balance.
///
/// Mirrors [`Position`](crate::position::Position) with the base-currency
/// fx rate taking the role of the price: the local value of one unit of a
/// currency is itself, so local market value is just the net balance and
/// local P&L is always zero (interest on balances is not modeled). What the
/// ledger does track is the volume-weighted acquisition rate, which makes
/// the base-currency translation gain or loss on the balance observable.
#[derive(Debug, Clone, PartialEq)]
pub struct CashPosition {
    pub currency: String,
    pub current_fx_rate: Decimal,
    pub current_dt: DateTime<Utc>,
    pub buy_quantity: Decimal,
    pub sell_quantity: Decimal,
    pub avg_rate_bought: Decimal,
    pub avg_rate_sold: Decimal,
    pub buy_commission: Decimal,
    pub sell_commission: Decimal,
}

impl CashPosition {
    /// Opens a ledger from the first cash leg referencing the currency.
    pub fn open_from_movement(leg: &CashMovement) -> Self {
        let (buy_quantity, sell_quantity, avg_rate_bought, avg_rate_sold, buy_comm, sell_comm) =
            if leg.quantity > Decimal::ZERO {
                (
                    leg.quantity,
                    Decimal::ZERO,
                    leg.fx_rate,
                    Decimal::ZERO,
                    leg.commission,
                    Decimal::ZERO,
                )
            } else {
                (
                    Decimal::ZERO,
                    -leg.quantity,
                    Decimal::ZERO,
                    leg.fx_rate,
                    Decimal::ZERO,
                    leg.commission,
                )
            };

        Self {
            currency: leg.currency.clone(),
            current_fx_rate: leg.fx_rate,
            current_dt: leg.dt,
            buy_quantity,
            sell_quantity,
            avg_rate_bought,
            avg_rate_sold,
            buy_commission: buy_comm,
            sell_commission: sell_comm,
        }
    }

    fn check_set_dt(&mut self, dt: Option<DateTime<Utc>>) -> Result<(), PortfolioError> {
        if let Some(dt) = dt {
            if dt < self.current_dt {
                return Err(PortfolioError::BackwardTimestamp {
                    supplied: dt,
                    current: self.current_dt,
                });
            }
            self.current_dt = dt;
        }
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        Direction::of_net(self.net_quantity())
    }

    pub fn net_quantity(&self) -> Decimal {
        self.buy_quantity - self.sell_quantity
    }

    /// The local value of a currency balance is the balance itself.
    pub fn market_value_local(&self) -> Decimal {
        self.net_quantity()
    }

    pub fn market_value_base(&self) -> Decimal {
        self.current_fx_rate * self.net_quantity()
    }

    pub fn exposure_local(&self) -> Decimal {
        self.net_quantity()
    }

    pub fn exposure_base(&self) -> Decimal {
        self.market_value_base()
    }

    /// Commission-inclusive volume-weighted acquisition rate of the balance.
    pub fn avg_rate(&self) -> Decimal {
        let net = self.net_quantity();
        if net.is_zero() {
            Decimal::ZERO
        } else if net > Decimal::ZERO {
            (self.avg_rate_bought * self.buy_quantity + self.buy_commission) / self.buy_quantity
        } else {
            (self.avg_rate_sold * self.sell_quantity - self.sell_commission) / self.sell_quantity
        }
    }

    /// Interest is not modeled, so a balance never realizes local P&L.
    pub fn realised_pnl_local(&self) -> Decimal {
        Decimal::ZERO
    }

    pub fn unrealised_pnl_local(&self) -> Decimal {
        Decimal::ZERO
    }

    pub fn total_pnl_local(&self) -> Decimal {
        self.realised_pnl_local() + self.unrealised_pnl_local()
    }

    /// Translation gain or loss on the balance relative to its acquisition
    /// rate.
    pub fn unrealised_pnl_base(&self) -> Decimal {
        (self.current_fx_rate - self.avg_rate()) * self.net_quantity()
    }

    /// Marks the balance to a new base-currency rate.
    pub fn update_current_fx(
        &mut self,
        fx_rate: Decimal,
        dt: Option<DateTime<Utc>>,
    ) -> Result<(), PortfolioError> {
        self.check_set_dt(dt)?;
        if fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: self.currency.clone(),
                rate: fx_rate,
            });
        }
        self.current_fx_rate = fx_rate;
        Ok(())
    }

    fn transact_buy(&mut self, quantity: Decimal, fx_rate: Decimal, commission: Decimal) {
        self.avg_rate_bought = (self.avg_rate_bought * self.buy_quantity + quantity * fx_rate)
            / (self.buy_quantity + quantity);
        self.buy_quantity += quantity;
        self.buy_commission += commission;
    }

    fn transact_sell(&mut self, quantity: Decimal, fx_rate: Decimal, commission: Decimal) {
        self.avg_rate_sold = (self.avg_rate_sold * self.sell_quantity + quantity * fx_rate)
            / (self.sell_quantity + quantity);
        self.sell_quantity += quantity;
        self.sell_commission += commission;
    }

    /// Applies a cash leg to the ledger and advances the rate mark and clock.
    pub fn transact(&mut self, leg: &CashMovement) -> Result<(), PortfolioError> {
        if self.currency != leg.currency {
            return Err(PortfolioError::AssetMismatch {
                held: self.currency.clone(),
                given: leg.currency.clone(),
            });
        }

        if leg.quantity.floor().is_zero() {
            return Ok(());
        }

        if leg.quantity > Decimal::ZERO {
            self.transact_buy(leg.quantity, leg.fx_rate, leg.commission);
        } else {
            self.transact_sell(-leg.quantity, leg.fx_rate, leg.commission);
        }

        self.update_current_fx(leg.fx_rate, Some(leg.dt))?;
        self.current_dt = leg.dt;
        Ok(())
    }
}
