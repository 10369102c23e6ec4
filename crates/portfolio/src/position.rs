use chrono::{DateTime, Utc};
use core_types::{Direction, Transaction};
use rust_decimal::Decimal;

use crate::error::PortfolioError;

/// The cost-basis ledger for a single equity asset.
///
/// Buys and sells accumulate on separate sides, each with its own
/// volume-weighted average price and commission total. Every derived value
/// (market value, average price, realized and unrealized P&L) is a pure
/// function of those accumulators plus the latest mark, so the ledger never
/// needs a separate branch for direction flips: the dominant side simply
/// changes when `net_quantity` changes sign.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub asset: String,
    /// Settlement currency of the asset's trades.
    pub currency: String,
    pub current_price: Decimal,
    /// Base-currency rate of the settlement currency at the latest mark.
    pub current_fx: Decimal,
    pub current_dt: DateTime<Utc>,
    pub buy_quantity: Decimal,
    pub sell_quantity: Decimal,
    pub avg_price_bought: Decimal,
    pub avg_price_sold: Decimal,
    pub buy_commission: Decimal,
    pub sell_commission: Decimal,
}

impl Position {
    /// Opens a ledger from the first fill, seeding the bought or sold side
    /// according to the fill's sign. The untouched side starts at zero.
    pub fn open_from_transaction(txn: &Transaction) -> Self {
        let (buy_quantity, sell_quantity, avg_price_bought, avg_price_sold, buy_comm, sell_comm) =
            if txn.quantity > Decimal::ZERO {
                (
                    txn.quantity,
                    Decimal::ZERO,
                    txn.price,
                    Decimal::ZERO,
                    txn.commission,
                    Decimal::ZERO,
                )
            } else {
                (
                    Decimal::ZERO,
                    -txn.quantity,
                    Decimal::ZERO,
                    txn.price,
                    Decimal::ZERO,
                    txn.commission,
                )
            };

        Self {
            asset: txn.asset.clone(),
            currency: txn.currency.clone(),
            current_price: txn.price,
            current_fx: txn.fx_rate,
            current_dt: txn.dt,
            buy_quantity,
            sell_quantity,
            avg_price_bought,
            avg_price_sold,
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

    pub fn market_value_local(&self) -> Decimal {
        self.current_price * self.net_quantity()
    }

    pub fn market_value_base(&self) -> Decimal {
        self.market_value_local() * self.current_fx
    }

    /// Commission-inclusive average price of the dominant side, in the
    /// settlement currency. Zero when flat.
    pub fn avg_price(&self) -> Decimal {
        let net = self.net_quantity();
        if net.is_zero() {
            Decimal::ZERO
        } else if net > Decimal::ZERO {
            (self.avg_price_bought * self.buy_quantity + self.buy_commission) / self.buy_quantity
        } else {
            (self.avg_price_sold * self.sell_quantity - self.sell_commission) / self.sell_quantity
        }
    }

    pub fn total_bought_local(&self) -> Decimal {
        self.avg_price_bought * self.buy_quantity
    }

    pub fn total_sold_local(&self) -> Decimal {
        self.avg_price_sold * self.sell_quantity
    }

    pub fn net_total_local(&self) -> Decimal {
        self.total_sold_local() - self.total_bought_local()
    }

    pub fn commission_local(&self) -> Decimal {
        self.buy_commission + self.sell_commission
    }

    pub fn net_incl_commission_local(&self) -> Decimal {
        self.net_total_local() - self.commission_local()
    }

    /// Realized P&L in the settlement currency.
    ///
    /// The side that closes the position is charged its commission in full;
    /// the side that opened it is charged pro-rata to the fraction closed.
    pub fn realised_pnl_local(&self) -> Decimal {
        match self.direction() {
            Direction::Long => {
                if self.sell_quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    (self.avg_price_sold - self.avg_price_bought) * self.sell_quantity
                        - (self.sell_quantity / self.buy_quantity) * self.buy_commission
                        - self.sell_commission
                }
            }
            Direction::Short => {
                if self.buy_quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    (self.avg_price_sold - self.avg_price_bought) * self.buy_quantity
                        - (self.buy_quantity / self.sell_quantity) * self.sell_commission
                        - self.buy_commission
                }
            }
            Direction::Flat => self.net_incl_commission_local(),
        }
    }

    pub fn unrealised_pnl_local(&self) -> Decimal {
        (self.current_price - self.avg_price()) * self.net_quantity()
    }

    pub fn unrealised_pnl_base(&self) -> Decimal {
        self.unrealised_pnl_local() * self.current_fx
    }

    pub fn total_pnl_local(&self) -> Decimal {
        self.realised_pnl_local() + self.unrealised_pnl_local()
    }

    /// Marks the position to a new trade price without generating a fill.
    pub fn update_current_price(
        &mut self,
        market_price: Decimal,
        dt: Option<DateTime<Utc>>,
    ) -> Result<(), PortfolioError> {
        self.check_set_dt(dt)?;
        if market_price <= Decimal::ZERO {
            return Err(PortfolioError::NonPositivePrice {
                asset: self.asset.clone(),
                price: market_price,
            });
        }
        self.current_price = market_price;
        Ok(())
    }

    /// Marks the settlement currency to a new base-currency rate.
    pub fn update_current_fx(
        &mut self,
        fx_rate: Decimal,
        dt: Option<DateTime<Utc>>,
    ) -> Result<(), PortfolioError> {
        self.check_set_dt(dt)?;
        if fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: self.asset.clone(),
                rate: fx_rate,
            });
        }
        self.current_fx = fx_rate;
        Ok(())
    }

    fn transact_buy(&mut self, quantity: Decimal, price: Decimal, commission: Decimal) {
        self.avg_price_bought = (self.avg_price_bought * self.buy_quantity + quantity * price)
            / (self.buy_quantity + quantity);
        self.buy_quantity += quantity;
        self.buy_commission += commission;
    }

    fn transact_sell(&mut self, quantity: Decimal, price: Decimal, commission: Decimal) {
        self.avg_price_sold = (self.avg_price_sold * self.sell_quantity + quantity * price)
            / (self.sell_quantity + quantity);
        self.sell_quantity += quantity;
        self.sell_commission += commission;
    }

    /// Applies a fill to the ledger and advances the marks to the fill's
    /// price, rate and timestamp.
    pub fn transact(&mut self, txn: &Transaction) -> Result<(), PortfolioError> {
        if self.asset != txn.asset {
            return Err(PortfolioError::AssetMismatch {
                held: self.asset.clone(),
                given: txn.asset.clone(),
            });
        }

        // Sub-unit fills are accounting noise, not trades.
        if txn.quantity.floor().is_zero() {
            return Ok(());
        }

        if txn.quantity > Decimal::ZERO {
            self.transact_buy(txn.quantity, txn.price, txn.commission);
        } else {
            self.transact_sell(-txn.quantity, txn.price, txn.commission);
        }

        self.update_current_price(txn.price, Some(txn.dt))?;
        self.update_current_fx(txn.fx_rate, Some(txn.dt))?;
        self.current_dt = txn.dt;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 16, h, 0, 0).unwrap()
    }

    fn stock_txn(
        quantity: Decimal,
        h: u32,
        price: Decimal,
        fx_rate: Decimal,
        commission: Decimal,
    ) -> Transaction {
        Transaction::stock("EQ:SPY", quantity, hour(h), price, "EUR", fx_rate, "100", commission)
    }

    #[test]
    fn basic_long_position() {
        let txn = stock_txn(dec!(100), 15, dec!(193.74), dec!(1.0), dec!(1.0));
        let mut position = Position::open_from_transaction(&txn);

        assert_eq!(position.asset, "EQ:SPY");
        assert_eq!(position.current_price, dec!(193.74));
        assert_eq!(position.current_dt, hour(15));

        position.update_current_price(dec!(192.80), Some(hour(16))).unwrap();

        assert_eq!(position.buy_quantity, dec!(100));
        assert_eq!(position.sell_quantity, dec!(0));
        assert_eq!(position.avg_price_bought, dec!(193.74));
        assert_eq!(position.commission_local(), dec!(1.0));

        assert_eq!(position.direction(), Direction::Long);
        assert_eq!(position.market_value_local(), dec!(19280.0));
        assert_eq!(position.market_value_base(), dec!(19280.0));
        assert_eq!(position.avg_price(), dec!(193.75));
        assert_eq!(position.net_quantity(), dec!(100));
        assert_eq!(position.total_bought_local(), dec!(19374.0));
        assert_eq!(position.net_total_local(), dec!(-19374.0));
        assert_eq!(position.net_incl_commission_local(), dec!(-19375.0));
        assert_eq!(position.unrealised_pnl_local(), dec!(-95.00));
        assert_eq!(position.realised_pnl_local(), dec!(0));
    }

    #[test]
    fn basic_long_position_off_base_currency() {
        let txn = stock_txn(dec!(100), 15, dec!(193.74), dec!(0.75), dec!(1.0));
        let mut position = Position::open_from_transaction(&txn);
        position.update_current_price(dec!(192.80), Some(hour(16))).unwrap();

        assert_eq!(position.market_value_local(), dec!(19280.0));
        assert_eq!(position.market_value_base(), dec!(14460.0));
        assert_eq!(position.unrealised_pnl_local(), dec!(-95.00));
        assert_eq!(position.unrealised_pnl_base(), dec!(-71.25));
    }

    #[test]
    fn two_buys_volume_weight_the_average() {
        let first = stock_txn(dec!(100), 15, dec!(193.74), dec!(1.0), dec!(1.0));
        let mut position = Position::open_from_transaction(&first);

        let second = stock_txn(dec!(60), 16, dec!(193.79), dec!(1.0), dec!(1.0));
        position.transact(&second).unwrap();

        assert_eq!(position.buy_quantity, dec!(160));
        assert_eq!(position.avg_price_bought, dec!(193.75875));
        assert_eq!(position.commission_local(), dec!(2.0));
        assert_eq!(position.avg_price(), dec!(193.77125));
        assert_eq!(position.market_value_local(), dec!(31006.40));
        assert_eq!(position.total_bought_local(), dec!(31001.40));
        assert_eq!(position.unrealised_pnl_local(), dec!(3.0));
        assert_eq!(position.realised_pnl_local(), dec!(0));
    }

    #[test]
    fn long_open_then_full_close() {
        let open = stock_txn(dec!(100), 15, dec!(2615.27), dec!(1.0), dec!(1.0));
        let mut position = Position::open_from_transaction(&open);

        let close = stock_txn(dec!(-100), 16, dec!(2622.0), dec!(1.0), dec!(6.81));
        position.transact(&close).unwrap();

        assert_eq!(position.buy_quantity, dec!(100));
        assert_eq!(position.sell_quantity, dec!(100));
        assert_eq!(position.avg_price_bought, dec!(2615.27));
        assert_eq!(position.avg_price_sold, dec!(2622.0));
        assert_eq!(position.commission_local(), dec!(7.81));

        assert_eq!(position.direction(), Direction::Flat);
        assert_eq!(position.market_value_local(), dec!(0));
        assert_eq!(position.avg_price(), dec!(0));
        assert_eq!(position.net_quantity(), dec!(0));
        assert_eq!(position.net_total_local(), dec!(673.0));
        assert_eq!(position.net_incl_commission_local(), dec!(665.19));
        assert_eq!(position.unrealised_pnl_local(), dec!(0));
        assert_eq!(position.realised_pnl_local(), dec!(665.19));
    }

    #[test]
    fn close_at_entry_price_realises_only_the_commission() {
        let open = stock_txn(dec!(100), 15, dec!(567.00), dec!(1.0), dec!(15.78));
        let mut position = Position::open_from_transaction(&open);

        let close = stock_txn(dec!(-100), 16, dec!(567.00), dec!(1.0), dec!(0));
        position.transact(&close).unwrap();

        assert_eq!(position.net_quantity(), dec!(0));
        assert_eq!(position.realised_pnl_local(), dec!(-15.78));
    }

    #[test]
    fn partial_close_charges_opening_commission_pro_rata() {
        let open = stock_txn(dec!(100), 15, dec!(307.05), dec!(1.0), dec!(1.0));
        let mut position = Position::open_from_transaction(&open);

        let partial = stock_txn(dec!(-60), 16, dec!(314.91), dec!(1.0), dec!(1.42));
        position.transact(&partial).unwrap();

        assert_eq!(position.buy_quantity, dec!(100));
        assert_eq!(position.sell_quantity, dec!(60));
        assert_eq!(position.direction(), Direction::Long);
        assert_eq!(position.net_quantity(), dec!(40));
        assert_eq!(position.avg_price(), dec!(307.06));
        assert_eq!(position.market_value_local(), dec!(12596.40));
        assert_eq!(position.total_sold_local(), dec!(18894.60));
        assert_eq!(position.net_incl_commission_local(), dec!(-11812.82));
        // (314.91 - 307.05) * 60 - (60/100) * 1.00 - 1.42
        assert_eq!(position.realised_pnl_local(), dec!(469.58));
        assert_eq!(position.unrealised_pnl_local(), dec!(314.0));
    }

    #[test]
    fn partial_close_with_fx_marks() {
        let open = stock_txn(dec!(100), 15, dec!(307.05), dec!(1.10), dec!(1.0));
        let mut position = Position::open_from_transaction(&open);
        assert_eq!(position.market_value_base(), dec!(33775.50));

        let partial = stock_txn(dec!(-60), 16, dec!(314.91), dec!(1.05), dec!(1.42));
        position.transact(&partial).unwrap();

        assert_eq!(position.market_value_base(), dec!(13226.220));
        assert_eq!(position.unrealised_pnl_local(), dec!(314.0));
        assert_eq!(position.unrealised_pnl_base(), dec!(329.70));
        assert_eq!(position.realised_pnl_local(), dec!(469.58));
    }

    #[test]
    fn four_trades_net_long() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(453),
            15,
            dec!(312.96),
            dec!(1.0),
            dec!(1.95),
        ));
        position
            .transact(&stock_txn(dec!(-397), 16, dec!(315.599924), dec!(1.0), dec!(4.8)))
            .unwrap();
        position
            .transact(&stock_txn(dec!(624), 17, dec!(312.96), dec!(1.0), dec!(2.68)))
            .unwrap();
        position
            .transact(&stock_txn(dec!(-519), 18, dec!(315.78), dec!(1.0), dec!(6.28)))
            .unwrap();

        assert_eq!(position.buy_quantity, dec!(1077));
        assert_eq!(position.sell_quantity, dec!(916));
        assert_eq!(position.avg_price_bought, dec!(312.96));
        assert_eq!(position.avg_price_sold.round_dp(6), dec!(315.701954));
        assert_eq!(position.commission_local(), dec!(15.71));

        assert_eq!(position.direction(), Direction::Long);
        assert_eq!(position.net_quantity(), dec!(161));
        assert_eq!(position.market_value_local(), dec!(50840.58));
        assert_eq!(position.avg_price().round_dp(6), dec!(312.964299));
        assert_eq!(position.total_bought_local(), dec!(337057.92));
        assert_eq!(position.total_sold_local().round_dp(2), dec!(289182.99));
        assert_eq!(position.net_incl_commission_local().round_dp(2), dec!(-47890.64));
        assert_eq!(position.unrealised_pnl_local().round_dp(2), dec!(453.33));
        assert_eq!(position.realised_pnl_local().round_dp(2), dec!(2496.61));
    }

    // A sequence that flips long -> short -> long -> short -> flat. The
    // per-side accumulators never reset, so realized P&L between the flips
    // follows the dominant-side formula rather than per-lot matching; the
    // final flat figure is the full net-of-commission cash result.
    #[test]
    fn flip_sequence_follows_dominant_side_formula() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(353),
            14,
            dec!(312.96),
            dec!(0.65),
            dec!(1.95),
        ));

        position
            .transact(&stock_txn(dec!(-397), 16, dec!(313.4), dec!(0.75), dec!(4.8)))
            .unwrap();
        assert_eq!(position.direction(), Direction::Short);
        assert_eq!(position.net_quantity(), dec!(-44));
        assert_eq!(position.avg_price().round_dp(6), dec!(313.387909));
        // (313.4 - 312.96) * 353 - (353/397) * 4.8 - 1.95
        assert_eq!(position.realised_pnl_local().round_dp(6), dec!(149.101990));

        position
            .transact(&stock_txn(dec!(624), 18, dec!(314.68), dec!(0.55), dec!(2.68)))
            .unwrap();
        assert_eq!(position.direction(), Direction::Long);
        assert_eq!(position.net_quantity(), dec!(580));
        assert_eq!(position.avg_price_bought.round_dp(6), dec!(314.058547));
        assert_eq!(position.realised_pnl_local().round_dp(2), dec!(-268.12));

        position
            .transact(&stock_txn(dec!(-750), 20, dec!(317.68), dec!(0.57), dec!(2.20)))
            .unwrap();
        assert_eq!(position.direction(), Direction::Short);
        assert_eq!(position.net_quantity(), dec!(-170));
        assert_eq!(position.avg_price_sold.round_dp(6), dec!(316.198605));
        assert_eq!(position.realised_pnl_local().round_dp(2), dec!(2080.24));

        position
            .transact(&stock_txn(dec!(170), 22, dec!(321.6), dec!(0.7), dec!(1.79)))
            .unwrap();
        assert_eq!(position.direction(), Direction::Flat);
        assert_eq!(position.net_quantity(), dec!(0));
        assert_eq!(position.commission_local(), dec!(13.42));
        assert_eq!(position.total_bought_local().round_dp(2), dec!(361507.20));
        assert_eq!(position.total_sold_local().round_dp(2), dec!(362679.80));
        assert_eq!(position.realised_pnl_local().round_dp(2), dec!(1159.18));
        assert_eq!(position.unrealised_pnl_local(), dec!(0));
    }

    #[test]
    fn marks_only_move_unrealised_pnl() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(353),
            14,
            dec!(312.96),
            dec!(0.65),
            dec!(1.95),
        ));

        position.update_current_price(dec!(311.23), Some(hour(15))).unwrap();
        position.update_current_fx(dec!(0.71), Some(hour(15))).unwrap();

        assert_eq!(position.buy_quantity, dec!(353));
        assert_eq!(position.avg_price_bought, dec!(312.96));
        assert_eq!(position.market_value_local(), dec!(109864.19));
        assert_eq!(position.market_value_base().round_dp(4), dec!(78003.5749));
        assert_eq!(position.unrealised_pnl_local().round_dp(2), dec!(-612.64));
        assert_eq!(position.unrealised_pnl_base().round_dp(3), dec!(-434.974));
        assert_eq!(position.realised_pnl_local(), dec!(0));
    }

    #[test]
    fn repeated_identical_mark_is_idempotent() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(100),
            15,
            dec!(193.74),
            dec!(1.0),
            dec!(1.0),
        ));
        position.update_current_price(dec!(192.80), Some(hour(16))).unwrap();
        let before = position.clone();
        position.update_current_price(dec!(192.80), Some(hour(16))).unwrap();
        assert_eq!(position, before);
    }

    #[test]
    fn rejects_non_positive_marks() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(100),
            15,
            dec!(193.74),
            dec!(1.0),
            dec!(1.0),
        ));
        assert!(matches!(
            position.update_current_price(dec!(0), Some(hour(16))),
            Err(PortfolioError::NonPositivePrice { .. })
        ));
        assert!(matches!(
            position.update_current_fx(dec!(-0.5), Some(hour(16))),
            Err(PortfolioError::NonPositiveFxRate { .. })
        ));
    }

    #[test]
    fn rejects_backward_timestamps() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(100),
            15,
            dec!(193.74),
            dec!(1.0),
            dec!(1.0),
        ));
        assert!(matches!(
            position.update_current_price(dec!(200.0), Some(hour(14))),
            Err(PortfolioError::BackwardTimestamp { .. })
        ));
    }

    #[test]
    fn rejects_mismatched_asset() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(100),
            15,
            dec!(193.74),
            dec!(1.0),
            dec!(1.0),
        ));
        let other = Transaction::stock(
            "EQ:AMZN",
            dec!(50),
            hour(16),
            dec!(2615.27),
            "USD",
            dec!(1.0),
            "101",
            dec!(0),
        );
        assert!(matches!(
            position.transact(&other),
            Err(PortfolioError::AssetMismatch { .. })
        ));
    }

    #[test]
    fn sub_unit_quantity_is_a_no_op() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(100),
            15,
            dec!(193.74),
            dec!(1.0),
            dec!(1.0),
        ));
        let before = position.clone();
        position
            .transact(&stock_txn(dec!(0.4), 16, dec!(999.0), dec!(1.0), dec!(5.0)))
            .unwrap();
        assert_eq!(position, before);
    }

    #[test]
    fn net_quantity_matches_side_totals_for_any_sequence() {
        let mut position = Position::open_from_transaction(&stock_txn(
            dec!(10),
            14,
            dec!(100.0),
            dec!(1.0),
            dec!(0),
        ));
        let fills = [dec!(5), dec!(-8), dec!(-12), dec!(20), dec!(-15)];
        for (i, qty) in fills.iter().enumerate() {
            position
                .transact(&stock_txn(*qty, 15 + i as u32, dec!(100.0), dec!(1.0), dec!(0)))
                .unwrap();
            assert_eq!(
                position.net_quantity(),
                position.buy_quantity - position.sell_quantity
            );
            assert_eq!(position.direction(), Direction::of_net(position.net_quantity()));
        }
        assert_eq!(position.net_quantity(), dec!(0));
    }
}
