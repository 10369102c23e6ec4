use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use core_types::{CashMovement, Direction, TradeKind, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PortfolioError;
use crate::event::{PortfolioEvent, PortfolioEventKind};
use crate::handler::{CashPositionHandler, PositionHandler};

/// A point-in-time view of one holding, equity or cash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub quantity: Decimal,
    pub market_value_local: Decimal,
    pub market_value_base: Decimal,
    pub unrealised_pnl: Decimal,
    pub realised_pnl: Decimal,
    pub total_pnl: Decimal,
}

/// The accounting aggregate: equity positions, currency balances and an
/// append-only event history under one strictly monotonic clock.
///
/// A portfolio never talks to market data or fee models; it is handed
/// fully-priced transactions and decomposes them into ledger entries. Cash
/// conservation is structural: every stock fill is paired with its
/// offsetting cash leg, and every FX fill becomes two opposite cash legs.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub start_dt: DateTime<Utc>,
    pub current_dt: DateTime<Utc>,
    pub base_currency: String,
    pub portfolio_id: String,
    pub name: Option<String>,
    pos_handler: PositionHandler,
    cash_handler: CashPositionHandler,
    history: Vec<PortfolioEvent>,
}

impl Portfolio {
    pub fn new(
        start_dt: DateTime<Utc>,
        starting_cash: Decimal,
        base_currency: impl Into<String>,
        portfolio_id: impl Into<String>,
        name: Option<String>,
    ) -> Self {
        let base_currency = base_currency.into();
        let portfolio_id = portfolio_id.into();
        let mut portfolio = Self {
            start_dt,
            current_dt: start_dt,
            base_currency,
            portfolio_id,
            name,
            pos_handler: PositionHandler::new(),
            cash_handler: CashPositionHandler::new(),
            history: Vec::new(),
        };
        info!(
            portfolio_id = %portfolio.portfolio_id,
            %start_dt,
            "portfolio instance initialised"
        );

        if starting_cash > Decimal::ZERO {
            let leg = CashMovement::new(
                portfolio.base_currency.clone(),
                starting_cash,
                start_dt,
                Decimal::ONE,
                Uuid::new_v4().simple().to_string(),
                Decimal::ZERO,
            );
            // A freshly-built leg with a positive amount cannot fail.
            let _ = portfolio.cash_handler.transact(&leg);
            portfolio.history.push(PortfolioEvent::subscription(
                start_dt,
                portfolio.base_currency.clone(),
                starting_cash,
                starting_cash,
            ));
            info!(
                portfolio_id = %portfolio.portfolio_id,
                currency = %portfolio.base_currency,
                credit = %starting_cash,
                "initial funds subscribed to portfolio"
            );
        }
        portfolio
    }

    fn check_advance_dt(&mut self, dt: DateTime<Utc>) -> Result<(), PortfolioError> {
        if dt < self.current_dt {
            return Err(PortfolioError::BackwardTimestamp {
                supplied: dt,
                current: self.current_dt,
            });
        }
        self.current_dt = dt;
        Ok(())
    }

    /// Credits `amount` of `currency` (base currency when `None`).
    pub fn subscribe_funds(
        &mut self,
        dt: DateTime<Utc>,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), PortfolioError> {
        self.check_advance_dt(dt)?;
        if amount < Decimal::ZERO {
            return Err(PortfolioError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();

        let leg = CashMovement::new(
            currency.clone(),
            amount,
            dt,
            Decimal::ONE,
            Uuid::new_v4().simple().to_string(),
            Decimal::ZERO,
        );
        self.cash_handler.transact(&leg)?;

        let balance = self.cash_handler.balance(&currency);
        self.history
            .push(PortfolioEvent::subscription(dt, currency.clone(), amount, balance));
        info!(
            portfolio_id = %self.portfolio_id,
            %currency,
            credit = %amount.round_dp(2),
            balance = %balance.round_dp(2),
            "funds subscribed to portfolio"
        );
        Ok(())
    }

    /// Debits `amount` of `currency`; fails when the balance cannot cover it.
    pub fn withdraw_funds(
        &mut self,
        dt: DateTime<Utc>,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), PortfolioError> {
        self.check_advance_dt(dt)?;
        if amount < Decimal::ZERO {
            return Err(PortfolioError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();

        let available = self.cash_handler.balance(&currency);
        if amount > available {
            return Err(PortfolioError::InsufficientFunds {
                currency,
                requested: amount,
                available,
            });
        }

        let leg = CashMovement::new(
            currency.clone(),
            -amount,
            dt,
            Decimal::ONE,
            Uuid::new_v4().simple().to_string(),
            Decimal::ZERO,
        );
        self.cash_handler.transact(&leg)?;

        let balance = self.cash_handler.balance(&currency);
        self.history
            .push(PortfolioEvent::withdrawal(dt, currency.clone(), amount, balance));
        info!(
            portfolio_id = %self.portfolio_id,
            %currency,
            debit = %amount.round_dp(2),
            balance = %balance.round_dp(2),
            "funds withdrawn from portfolio"
        );
        Ok(())
    }

    /// Settles one priced transaction against the ledgers and records the
    /// corresponding event.
    pub fn transact_asset(&mut self, txn: &Transaction) -> Result<(), PortfolioError> {
        self.check_advance_dt(txn.dt)?;
        match txn.kind {
            TradeKind::Stock => self.transact_stock(txn),
            TradeKind::Fx => self.transact_fx(txn),
        }
    }

    fn transact_stock(&mut self, txn: &Transaction) -> Result<(), PortfolioError> {
        let total_cost = txn.cost_with_commission();
        let available = self.cash_handler.balance(&txn.currency);
        if total_cost > available {
            warn!(
                portfolio_id = %self.portfolio_id,
                asset = %txn.asset,
                currency = %txn.currency,
                cost = %total_cost.round_dp(2),
                %available,
                "transaction cost exceeds remaining cash; proceeding with a negative balance"
            );
        }

        self.pos_handler.transact(txn)?;

        // The offsetting cash leg settles the full consideration plus
        // commission, struck at the transaction's own fx rate.
        let offset = CashMovement::new(
            txn.currency.clone(),
            -total_cost,
            txn.dt,
            txn.fx_rate,
            txn.order_id.clone(),
            Decimal::ZERO,
        );
        self.cash_handler.transact(&offset)?;

        let balance = self.cash_handler.balance(&txn.currency);
        let direction = txn.direction();
        let description = format!(
            "{} {} {} {:.2} {}",
            direction,
            txn.quantity,
            txn.asset.to_uppercase(),
            txn.price,
            txn.dt.format("%d/%m/%Y")
        );
        let event = match direction {
            Direction::Short => PortfolioEvent {
                dt: txn.dt,
                kind: PortfolioEventKind::AssetTransaction,
                description,
                currency: txn.currency.clone(),
                debit: Decimal::ZERO,
                credit: (-total_cost).round_dp(2),
                balance: balance.round_dp(2),
            },
            _ => PortfolioEvent {
                dt: txn.dt,
                kind: PortfolioEventKind::AssetTransaction,
                description,
                currency: txn.currency.clone(),
                debit: total_cost.round_dp(2),
                credit: Decimal::ZERO,
                balance: balance.round_dp(2),
            },
        };
        info!(
            portfolio_id = %self.portfolio_id,
            asset = %txn.asset,
            %direction,
            total_cost = %total_cost.round_dp(2),
            balance = %balance.round_dp(2),
            "asset transacted in portfolio"
        );
        self.history.push(event);
        Ok(())
    }

    fn transact_fx(&mut self, txn: &Transaction) -> Result<(), PortfolioError> {
        if txn.price <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: txn.asset.clone(),
                rate: txn.price,
            });
        }
        if txn.fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: txn.currency.clone(),
                rate: txn.fx_rate,
            });
        }
        let half_commission = txn.commission / Decimal::TWO;

        // Two opposite cash legs: the converted amount is exact, the
        // conversion commission is split across the legs' cost bases.
        let first_leg = CashMovement::new(
            txn.asset.clone(),
            txn.quantity,
            txn.dt,
            txn.price,
            txn.order_id.clone(),
            half_commission,
        );
        let converted = txn.quantity * txn.price / txn.fx_rate;
        let second_leg = CashMovement::new(
            txn.currency.clone(),
            -converted,
            txn.dt,
            txn.fx_rate,
            txn.order_id.clone(),
            half_commission,
        );
        self.cash_handler.transact(&first_leg)?;
        self.cash_handler.transact(&second_leg)?;

        let balance = self.cash_handler.balance(&txn.currency);
        let direction = txn.direction();
        let description = format!(
            "{} {} {} {:.4} {}",
            direction,
            txn.quantity,
            txn.asset.to_uppercase(),
            txn.price,
            txn.dt.format("%d/%m/%Y")
        );
        let event = match direction {
            Direction::Short => PortfolioEvent {
                dt: txn.dt,
                kind: PortfolioEventKind::FxTransaction,
                description,
                currency: txn.currency.clone(),
                debit: Decimal::ZERO,
                credit: (-converted).round_dp(2),
                balance: balance.round_dp(2),
            },
            _ => PortfolioEvent {
                dt: txn.dt,
                kind: PortfolioEventKind::FxTransaction,
                description,
                currency: txn.currency.clone(),
                debit: converted.round_dp(2),
                credit: Decimal::ZERO,
                balance: balance.round_dp(2),
            },
        };
        info!(
            portfolio_id = %self.portfolio_id,
            from = %txn.currency,
            to = %txn.asset,
            quantity = %txn.quantity,
            converted = %converted.round_dp(2),
            "fx transacted in portfolio"
        );
        self.history.push(event);
        Ok(())
    }

    // -- Aggregate valuation --------------------------------------------------

    pub fn total_market_value_base(&self) -> Decimal {
        self.pos_handler.total_market_value_base()
    }

    pub fn total_market_value_local(&self, currency: &str) -> Decimal {
        self.pos_handler.total_market_value_local(currency)
    }

    pub fn total_cash_value_base(&self) -> Decimal {
        self.cash_handler.total_market_value_base()
    }

    pub fn total_cash_value_local(&self, currency: &str) -> Decimal {
        self.cash_handler.total_market_value_local(currency)
    }

    pub fn total_equity_base(&self) -> Decimal {
        self.total_market_value_base() + self.total_cash_value_base()
    }

    pub fn total_equity_local(&self, currency: &str) -> Decimal {
        self.total_market_value_local(currency) + self.total_cash_value_local(currency)
    }

    pub fn total_unrealised_pnl_base(&self) -> Decimal {
        self.pos_handler.total_unrealised_pnl_base() + self.cash_handler.total_unrealised_pnl_base()
    }

    pub fn total_unrealised_pnl_local(&self, currency: &str) -> Decimal {
        self.pos_handler.total_unrealised_pnl_local(currency)
            + self.cash_handler.total_unrealised_pnl_local(currency)
    }

    pub fn total_realised_pnl_local(&self, currency: &str) -> Decimal {
        self.pos_handler.total_realised_pnl_local(currency)
            + self.cash_handler.total_realised_pnl_local(currency)
    }

    pub fn total_pnl_local(&self, currency: &str) -> Decimal {
        self.pos_handler.total_pnl_local(currency) + self.cash_handler.total_pnl_local(currency)
    }

    // -- Mark-to-market -------------------------------------------------------

    /// Updates an open equity position's trade price; no-op when the asset
    /// is not held.
    pub fn update_market_value_of_asset(
        &mut self,
        asset: &str,
        current_price: Decimal,
        current_dt: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        if self.pos_handler.get(asset).is_none() {
            return Ok(());
        }
        if current_price <= Decimal::ZERO {
            return Err(PortfolioError::NonPositivePrice {
                asset: asset.to_string(),
                price: current_price,
            });
        }
        if current_dt < self.current_dt {
            return Err(PortfolioError::BackwardTimestamp {
                supplied: current_dt,
                current: self.current_dt,
            });
        }
        // Guarded above, so the position is present.
        if let Some(position) = self.pos_handler.get_mut(asset) {
            position.update_current_price(current_price, Some(current_dt))?;
        }
        Ok(())
    }

    /// Updates an open equity position's settlement-currency rate; no-op
    /// when the asset is not held.
    pub fn update_fx_rate_of_asset(
        &mut self,
        asset: &str,
        fx_rate: Decimal,
        current_dt: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        if self.pos_handler.get(asset).is_none() {
            return Ok(());
        }
        if fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: asset.to_string(),
                rate: fx_rate,
            });
        }
        if current_dt < self.current_dt {
            return Err(PortfolioError::BackwardTimestamp {
                supplied: current_dt,
                current: self.current_dt,
            });
        }
        if let Some(position) = self.pos_handler.get_mut(asset) {
            position.update_current_fx(fx_rate, Some(current_dt))?;
        }
        Ok(())
    }

    /// Updates a currency balance's base-currency rate; no-op when no
    /// balance is held in `currency`.
    pub fn update_fx_rate(
        &mut self,
        currency: &str,
        fx_rate: Decimal,
        current_dt: DateTime<Utc>,
    ) -> Result<(), PortfolioError> {
        if self.cash_handler.get(currency).is_none() {
            return Ok(());
        }
        if fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::NonPositiveFxRate {
                asset: currency.to_string(),
                rate: fx_rate,
            });
        }
        if current_dt < self.current_dt {
            return Err(PortfolioError::BackwardTimestamp {
                supplied: current_dt,
                current: self.current_dt,
            });
        }
        if let Some(position) = self.cash_handler.get_mut(currency) {
            position.update_current_fx(fx_rate, Some(current_dt))?;
        }
        Ok(())
    }

    // -- Lookups --------------------------------------------------------------

    /// Net quantity held of `asset`, searching equities then currency
    /// balances; zero rather than an error when absent.
    pub fn get_position(&self, asset: &str) -> Decimal {
        if let Some(position) = self.pos_handler.get(asset) {
            return position.net_quantity();
        }
        self.cash_handler.balance(asset)
    }

    /// Currencies with an open cash ledger, in key order.
    pub fn cash_currencies(&self) -> Vec<String> {
        self.cash_handler.iter().map(|(c, _)| c.clone()).collect()
    }

    /// Open equity assets with their settlement currencies, in key order.
    pub fn open_assets(&self) -> Vec<(String, String)> {
        self.pos_handler
            .iter()
            .map(|(asset, position)| (asset.clone(), position.currency.clone()))
            .collect()
    }

    pub fn holdings(&self) -> BTreeMap<String, Holding> {
        self.pos_handler
            .iter()
            .map(|(asset, p)| {
                (
                    asset.clone(),
                    Holding {
                        quantity: p.net_quantity(),
                        market_value_local: p.market_value_local(),
                        market_value_base: p.market_value_base(),
                        unrealised_pnl: p.unrealised_pnl_local(),
                        realised_pnl: p.realised_pnl_local(),
                        total_pnl: p.total_pnl_local(),
                    },
                )
            })
            .collect()
    }

    pub fn cash_holdings(&self) -> BTreeMap<String, Holding> {
        self.cash_handler
            .iter()
            .map(|(currency, p)| {
                (
                    currency.clone(),
                    Holding {
                        quantity: p.net_quantity(),
                        market_value_local: p.market_value_local(),
                        market_value_base: p.market_value_base(),
                        unrealised_pnl: p.unrealised_pnl_local(),
                        realised_pnl: p.realised_pnl_local(),
                        total_pnl: p.total_pnl_local(),
                    },
                )
            })
            .collect()
    }

    pub fn history(&self) -> &[PortfolioEvent] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 10, d, 8, 0, 0).unwrap()
    }

    fn portfolio(starting_cash: Decimal) -> Portfolio {
        Portfolio::new(day(5), starting_cash, "USD", "1234", None)
    }

    #[test]
    fn initial_settings() {
        let port = portfolio(dec!(0));
        assert_eq!(port.start_dt, day(5));
        assert_eq!(port.current_dt, day(5));
        assert_eq!(port.base_currency, "USD");
        assert_eq!(port.total_market_value_base(), dec!(0));
        assert_eq!(port.total_cash_value_base(), dec!(0));
        assert_eq!(port.total_equity_base(), dec!(0));
        assert!(port.history().is_empty());

        let funded = Portfolio::new(
            day(5),
            dec!(1234567.56),
            "USD",
            "5678",
            Some("Second Test Portfolio".to_string()),
        );
        assert_eq!(funded.total_cash_value_base(), dec!(1234567.56));
        assert_eq!(funded.total_equity_base(), dec!(1234567.56));
        assert_eq!(funded.history().len(), 1);
        assert_eq!(funded.history()[0].kind, PortfolioEventKind::Subscription);
    }

    #[test]
    fn subscribe_funds_validates_and_records() {
        let mut port = portfolio(dec!(2000.0));

        assert!(matches!(
            port.subscribe_funds(day(4), dec!(1000.0), None),
            Err(PortfolioError::BackwardTimestamp { .. })
        ));
        assert!(matches!(
            port.subscribe_funds(day(5), dec!(-1000.0), None),
            Err(PortfolioError::NegativeAmount { .. })
        ));

        port.subscribe_funds(day(6), dec!(1000.0), None).unwrap();
        assert_eq!(port.total_cash_value_base(), dec!(3000.0));
        assert_eq!(port.total_equity_base(), dec!(3000.0));
        assert_eq!(port.current_dt, day(6));

        let events = port.history();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].credit, dec!(1000.00));
        assert_eq!(events[1].balance, dec!(3000.00));
    }

    #[test]
    fn subscriptions_track_per_currency_balances() {
        let mut port = portfolio(dec!(2000.0));
        port.subscribe_funds(day(6), dec!(1000.0), None).unwrap();
        port.subscribe_funds(day(6), dec!(10000.0), Some("HKD")).unwrap();

        assert_eq!(port.total_cash_value_local("USD"), dec!(3000.0));
        assert_eq!(port.total_cash_value_local("HKD"), dec!(10000.0));
        // The event balance is the balance of the subscribed currency.
        let events = port.history();
        assert_eq!(events[2].currency, "HKD");
        assert_eq!(events[2].balance, dec!(10000.00));
    }

    #[test]
    fn withdraw_funds_validates_and_records() {
        let mut port = portfolio(dec!(0));

        assert!(matches!(
            port.withdraw_funds(day(4), dec!(1000.0), None),
            Err(PortfolioError::BackwardTimestamp { .. })
        ));
        assert!(matches!(
            port.withdraw_funds(day(5), dec!(-1000.0), None),
            Err(PortfolioError::NegativeAmount { .. })
        ));

        port.subscribe_funds(day(6), dec!(1000.0), None).unwrap();
        assert!(matches!(
            port.withdraw_funds(day(6), dec!(2000.0), None),
            Err(PortfolioError::InsufficientFunds { .. })
        ));

        port.withdraw_funds(day(7), dec!(468.0), None).unwrap();
        assert_eq!(port.total_cash_value_base(), dec!(532.0));
        assert_eq!(port.current_dt, day(7));

        let events = port.history();
        assert_eq!(events.last().unwrap().kind, PortfolioEventKind::Withdrawal);
        assert_eq!(events.last().unwrap().debit, dec!(468.00));
        assert_eq!(events.last().unwrap().balance, dec!(532.00));
    }

    #[test]
    fn transact_asset_settles_cash_and_records_event() {
        let mut port = portfolio(dec!(0));

        let early = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(4),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(0),
        );
        assert!(matches!(
            port.transact_asset(&early),
            Err(PortfolioError::BackwardTimestamp { .. })
        ));

        port.subscribe_funds(day(6), dec!(1000.0), None).unwrap();
        port.subscribe_funds(day(7), dec!(99000.0), None).unwrap();
        assert_eq!(port.total_cash_value_base(), dec!(100000.0));

        let txn = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(7),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(15.78),
        );
        port.transact_asset(&txn).unwrap();

        assert_eq!(port.total_cash_value_base(), dec!(43284.22));
        assert_eq!(port.total_market_value_base(), dec!(56700.00));
        assert_eq!(port.total_equity_base(), dec!(99984.22));

        let event = port.history().last().unwrap();
        assert_eq!(event.kind, PortfolioEventKind::AssetTransaction);
        assert_eq!(event.description, "LONG 100 EQ:AAA 567.00 07/10/2017");
        assert_eq!(event.debit, dec!(56715.78));
        assert_eq!(event.credit, dec!(0));
        assert_eq!(event.balance, dec!(43284.22));
        assert_eq!(port.current_dt, day(7));
    }

    #[test]
    fn transact_assets_in_two_settlement_currencies() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(100000.0), None).unwrap();
        port.subscribe_funds(day(5), dec!(75000.0), Some("EUR")).unwrap();

        let usd_txn = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(6),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(15.78),
        );
        port.transact_asset(&usd_txn).unwrap();

        let eur_txn = Transaction::stock(
            "EQ:MSE",
            dec!(50),
            day(6),
            dec!(462.3),
            "EUR",
            dec!(1.0),
            "2",
            dec!(7.64),
        );
        port.transact_asset(&eur_txn).unwrap();

        assert_eq!(port.total_cash_value_local("USD"), dec!(43284.22));
        assert_eq!(port.total_cash_value_local("EUR"), dec!(51877.36));
        assert_eq!(port.total_cash_value_base(), dec!(95161.58));
        assert_eq!(port.total_market_value_base(), dec!(79815.00));
        assert_eq!(port.get_position("USD"), dec!(43284.22));
        assert_eq!(port.get_position("EUR"), dec!(51877.36));

        let events = port.history();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].description, "LONG 50 EQ:MSE 462.30 06/10/2017");
        assert_eq!(events[3].debit, dec!(23122.64));
        assert_eq!(events[3].balance, dec!(51877.36));
    }

    #[test]
    fn short_sale_records_a_credit_event() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(100000.0), None).unwrap();

        let txn = Transaction::stock(
            "EQ:AAA",
            dec!(-100),
            day(6),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(0),
        );
        port.transact_asset(&txn).unwrap();

        assert_eq!(port.get_position("EQ:AAA"), dec!(-100));
        assert_eq!(port.total_cash_value_base(), dec!(156700.0));
        let event = port.history().last().unwrap();
        assert_eq!(event.debit, dec!(0));
        assert_eq!(event.credit, dec!(56700.00));
    }

    #[test]
    fn underfunded_trade_proceeds_with_negative_balance() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(1000.0), None).unwrap();

        let txn = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(6),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(0),
        );
        port.transact_asset(&txn).unwrap();

        assert_eq!(port.total_cash_value_local("USD"), dec!(-55700.0));
        assert_eq!(port.get_position("EQ:AAA"), dec!(100));
    }

    #[test]
    fn fx_transaction_moves_both_balances() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(100000.0), None).unwrap();

        // Convert 75,000 EUR at 1.24 funded from USD.
        let txn = Transaction::fx(
            "EUR",
            dec!(75000),
            day(6),
            dec!(1.24),
            "USD",
            dec!(1.0),
            "fx-1",
            dec!(0),
        );
        port.transact_asset(&txn).unwrap();

        assert_eq!(port.total_cash_value_local("EUR"), dec!(75000));
        assert_eq!(port.total_cash_value_local("USD"), dec!(7000.0));
        // The conversion itself leaves base equity unchanged.
        assert_eq!(port.total_equity_base(), dec!(100000.00));

        let event = port.history().last().unwrap();
        assert_eq!(event.kind, PortfolioEventKind::FxTransaction);
        assert_eq!(event.currency, "USD");
        assert_eq!(event.debit, dec!(93000.00));
        assert_eq!(event.balance, dec!(7000.00));
    }

    #[test]
    fn fx_commission_splits_across_both_legs() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(100000.0), None).unwrap();

        let txn = Transaction::fx(
            "EUR",
            dec!(10000),
            day(6),
            dec!(1.25),
            "USD",
            dec!(1.0),
            "fx-1",
            dec!(10.0),
        );
        port.transact_asset(&txn).unwrap();

        // Balances move by the converted amounts only; the commission lands
        // in the two legs' cost bases.
        assert_eq!(port.total_cash_value_local("EUR"), dec!(10000));
        assert_eq!(port.total_cash_value_local("USD"), dec!(87500.0));

        // The EUR leg's commission-inclusive acquisition rate is
        // (1.25 * 10000 + 5) / 10000 = 1.2505, so re-marking EUR at 1.30
        // shows the translation gain net of the conversion cost.
        port.update_fx_rate("EUR", dec!(1.30), day(7)).unwrap();
        assert_eq!(port.total_unrealised_pnl_base(), dec!(495.00));
    }

    #[test]
    fn marks_are_validated_and_forwarded() {
        let mut port = portfolio(dec!(0));
        // Unknown asset is a silent no-op.
        port.update_market_value_of_asset("EQ:AAA", dec!(54.34), day(6)).unwrap();

        port.subscribe_funds(day(6), dec!(100000.0), None).unwrap();
        let txn = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(6),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(15.78),
        );
        port.transact_asset(&txn).unwrap();

        assert!(matches!(
            port.update_market_value_of_asset("EQ:AAA", dec!(-54.34), day(6)),
            Err(PortfolioError::NonPositivePrice { .. })
        ));
        assert!(matches!(
            port.update_market_value_of_asset("EQ:AAA", dec!(50.23), day(4)),
            Err(PortfolioError::BackwardTimestamp { .. })
        ));

        port.update_market_value_of_asset("EQ:AAA", dec!(580.0), day(7)).unwrap();
        assert_eq!(port.total_market_value_base(), dec!(58000.0));
    }

    #[test]
    fn fx_rate_updates_translate_cash_balances() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(75000.0), Some("EUR")).unwrap();

        // No EUR equity position, so the asset-rate update is a no-op.
        port.update_fx_rate_of_asset("EQ:MSE", dec!(1.2), day(6)).unwrap();

        port.update_fx_rate("EUR", dec!(1.2), day(6)).unwrap();
        assert_eq!(port.total_cash_value_base(), dec!(90000.0));
        assert_eq!(port.total_unrealised_pnl_base(), dec!(15000.0));
    }

    #[test]
    fn get_position_defaults_to_zero() {
        let port = portfolio(dec!(0));
        assert_eq!(port.get_position("EQ:ZZZ"), dec!(0));
        assert_eq!(port.get_position("JPY"), dec!(0));
    }

    #[test]
    fn holdings_snapshot_reflects_marks() {
        let mut port = portfolio(dec!(0));
        port.subscribe_funds(day(5), dec!(100000.0), None).unwrap();
        let txn1 = Transaction::stock(
            "EQ:AAA",
            dec!(100),
            day(6),
            dec!(567.0),
            "USD",
            dec!(1.0),
            "1",
            dec!(15.78),
        );
        let txn2 = Transaction::stock(
            "EQ:BBB",
            dec!(100),
            day(7),
            dec!(123.0),
            "USD",
            dec!(1.0),
            "2",
            dec!(7.64),
        );
        port.transact_asset(&txn1).unwrap();
        port.transact_asset(&txn2).unwrap();
        port.update_market_value_of_asset("EQ:BBB", dec!(134.0), day(8)).unwrap();

        let holdings = port.holdings();
        assert_eq!(holdings["EQ:AAA"].quantity, dec!(100));
        assert_eq!(holdings["EQ:AAA"].market_value_local, dec!(56700.0));
        assert_eq!(holdings["EQ:AAA"].unrealised_pnl, dec!(-15.78));
        assert_eq!(holdings["EQ:BBB"].market_value_local, dec!(13400.0));
        assert_eq!(holdings["EQ:BBB"].unrealised_pnl, dec!(1092.36));
    }
}
