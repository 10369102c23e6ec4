use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use configuration::Settings;
use core_types::{Direction, Order, TradeKind, Transaction};
use portfolio::{Holding, Portfolio, PortfolioEvent};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::BrokerError;
use crate::fee_model::{FeeModel, PercentFeeModel, ZeroFeeModel};
use crate::market::{ExchangeCalendar, PriceSource};
use crate::universe::Universe;

/// The simulated brokerage: master cash accounts, portfolios and deferred
/// order execution against external quotes.
///
/// Orders never execute on submission. They queue per portfolio and are
/// drained on the next `update` while the exchange is open, sorted so that
/// sells settle before buys at the same timestamp. An under-funded trade is
/// a logged warning, never a failure: a simulation must not halt because a
/// strategy over-levered itself. Explicit cash movements, by contrast, fail
/// hard when the balance cannot cover them.
pub struct SimulatedBroker {
    pub start_dt: DateTime<Utc>,
    pub current_dt: DateTime<Utc>,
    pub account_id: Option<String>,
    pub base_currency: String,
    pub initial_funds: Decimal,
    universe: Box<dyn Universe>,
    calendar: Box<dyn ExchangeCalendar>,
    prices: Box<dyn PriceSource>,
    fee_model: Box<dyn FeeModel>,
    cash_balances: BTreeMap<String, Decimal>,
    portfolios: BTreeMap<String, Portfolio>,
    open_orders: BTreeMap<String, VecDeque<Order>>,
}

impl SimulatedBroker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start_dt: DateTime<Utc>,
        universe: Box<dyn Universe>,
        calendar: Box<dyn ExchangeCalendar>,
        prices: Box<dyn PriceSource>,
        account_id: Option<String>,
        base_currency: &str,
        initial_funds: Decimal,
        fee_model: Box<dyn FeeModel>,
    ) -> Result<Self, BrokerError> {
        let cash_assets = universe.cash_assets(start_dt);
        if !cash_assets.iter().any(|c| c == base_currency) {
            return Err(BrokerError::UnsupportedCurrency(base_currency.to_string()));
        }
        if initial_funds < Decimal::ZERO {
            return Err(BrokerError::NegativeAmount {
                amount: initial_funds,
            });
        }

        let mut cash_balances: BTreeMap<String, Decimal> = cash_assets
            .into_iter()
            .map(|currency| (currency, Decimal::ZERO))
            .collect();
        if initial_funds > Decimal::ZERO {
            cash_balances.insert(base_currency.to_string(), initial_funds);
        }

        info!(
            account_id = ?account_id,
            %base_currency,
            %initial_funds,
            "initialising simulated broker"
        );
        Ok(Self {
            start_dt,
            current_dt: start_dt,
            account_id,
            base_currency: base_currency.to_string(),
            initial_funds,
            universe,
            calendar,
            prices,
            fee_model,
            cash_balances,
            portfolios: BTreeMap::new(),
            open_orders: BTreeMap::new(),
        })
    }

    /// Builds a broker from validated settings, choosing the fee model the
    /// settings imply.
    pub fn from_settings(
        settings: &Settings,
        start_dt: DateTime<Utc>,
        universe: Box<dyn Universe>,
        calendar: Box<dyn ExchangeCalendar>,
        prices: Box<dyn PriceSource>,
    ) -> Result<Self, BrokerError> {
        let simulation = &settings.simulation;
        let fee_model: Box<dyn FeeModel> =
            if simulation.commission_pct.is_zero() && simulation.tax_pct.is_zero() {
                Box::new(ZeroFeeModel)
            } else {
                Box::new(PercentFeeModel::new(
                    simulation.commission_pct,
                    simulation.tax_pct,
                ))
            };
        Self::new(
            start_dt,
            universe,
            calendar,
            prices,
            None,
            &simulation.base_currency,
            simulation.initial_funds,
            fee_model,
        )
    }

    fn check_currency(&self, currency: &str) -> Result<(), BrokerError> {
        if !self
            .universe
            .cash_assets(self.current_dt)
            .iter()
            .any(|c| c == currency)
        {
            return Err(BrokerError::UnsupportedCurrency(currency.to_string()));
        }
        Ok(())
    }

    fn portfolio_ref(&self, portfolio_id: &str) -> Result<&Portfolio, BrokerError> {
        self.portfolios
            .get(portfolio_id)
            .ok_or_else(|| BrokerError::UnknownPortfolio(portfolio_id.to_string()))
    }

    fn portfolio_mut(&mut self, portfolio_id: &str) -> Result<&mut Portfolio, BrokerError> {
        self.portfolios
            .get_mut(portfolio_id)
            .ok_or_else(|| BrokerError::UnknownPortfolio(portfolio_id.to_string()))
    }

    // -- Master account cash --------------------------------------------------

    /// Credits unallocated master cash (base currency when `None`).
    pub fn subscribe_funds_to_account(
        &mut self,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), BrokerError> {
        if amount < Decimal::ZERO {
            return Err(BrokerError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();
        self.check_currency(&currency)?;

        if let Some(balance) = self.cash_balances.get_mut(&currency) {
            *balance += amount;
        }
        info!(
            account_id = ?self.account_id,
            %currency,
            credit = %amount.round_dp(2),
            "funds subscribed to broker account"
        );
        Ok(())
    }

    /// Debits unallocated master cash; fails when the balance cannot cover it.
    pub fn withdraw_funds_from_account(
        &mut self,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), BrokerError> {
        if amount < Decimal::ZERO {
            return Err(BrokerError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();
        self.check_currency(&currency)?;

        let available = self
            .cash_balances
            .get(&currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if amount > available {
            return Err(BrokerError::InsufficientFunds {
                context: "Account withdrawal",
                currency,
                requested: amount,
                available,
            });
        }
        if let Some(balance) = self.cash_balances.get_mut(&currency) {
            *balance -= amount;
        }
        info!(
            account_id = ?self.account_id,
            %currency,
            debit = %amount.round_dp(2),
            "funds withdrawn from broker account"
        );
        Ok(())
    }

    /// Unallocated master balance in one currency.
    pub fn account_cash_balance(&self, currency: &str) -> Result<Decimal, BrokerError> {
        self.cash_balances
            .get(currency)
            .copied()
            .ok_or_else(|| BrokerError::UnsupportedCurrency(currency.to_string()))
    }

    /// All unallocated master balances, keyed by currency.
    pub fn account_cash_balances(&self) -> &BTreeMap<String, Decimal> {
        &self.cash_balances
    }

    // -- Portfolio management -------------------------------------------------

    pub fn create_portfolio(
        &mut self,
        portfolio_id: &str,
        name: Option<&str>,
    ) -> Result<(), BrokerError> {
        if self.portfolios.contains_key(portfolio_id) {
            return Err(BrokerError::DuplicatePortfolio(portfolio_id.to_string()));
        }
        let portfolio = Portfolio::new(
            self.current_dt,
            Decimal::ZERO,
            self.base_currency.clone(),
            portfolio_id,
            name.map(str::to_string),
        );
        self.portfolios.insert(portfolio_id.to_string(), portfolio);
        self.open_orders
            .insert(portfolio_id.to_string(), VecDeque::new());
        info!(
            account_id = ?self.account_id,
            %portfolio_id,
            "portfolio created at broker"
        );
        Ok(())
    }

    pub fn list_portfolio_ids(&self) -> Vec<String> {
        self.portfolios.keys().cloned().collect()
    }

    /// Moves master cash into a portfolio; the master balance must cover it.
    pub fn subscribe_funds_to_portfolio(
        &mut self,
        portfolio_id: &str,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), BrokerError> {
        if amount < Decimal::ZERO {
            return Err(BrokerError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();
        self.check_currency(&currency)?;
        self.portfolio_ref(portfolio_id)?;

        let available = self
            .cash_balances
            .get(&currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if amount > available {
            return Err(BrokerError::InsufficientFunds {
                context: "Portfolio subscription",
                currency,
                requested: amount,
                available,
            });
        }

        let current_dt = self.current_dt;
        self.portfolio_mut(portfolio_id)?
            .subscribe_funds(current_dt, amount, Some(&currency))?;
        if let Some(balance) = self.cash_balances.get_mut(&currency) {
            *balance -= amount;
        }
        info!(
            %portfolio_id,
            %currency,
            credit = %amount.round_dp(2),
            "funds subscribed to portfolio"
        );
        Ok(())
    }

    /// Moves portfolio cash back to the master account; the portfolio
    /// balance must cover it.
    pub fn withdraw_funds_from_portfolio(
        &mut self,
        portfolio_id: &str,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(), BrokerError> {
        if amount < Decimal::ZERO {
            return Err(BrokerError::NegativeAmount { amount });
        }
        let currency = currency.unwrap_or(&self.base_currency).to_string();
        self.check_currency(&currency)?;

        let available = self
            .portfolio_ref(portfolio_id)?
            .total_cash_value_local(&currency);
        if amount > available {
            return Err(BrokerError::InsufficientFunds {
                context: "Portfolio withdrawal",
                currency,
                requested: amount,
                available,
            });
        }

        let current_dt = self.current_dt;
        self.portfolio_mut(portfolio_id)?
            .withdraw_funds(current_dt, amount, Some(&currency))?;
        if let Some(balance) = self.cash_balances.get_mut(&currency) {
            *balance += amount;
        }
        info!(
            %portfolio_id,
            %currency,
            debit = %amount.round_dp(2),
            "funds withdrawn from portfolio"
        );
        Ok(())
    }

    // -- Read queries ---------------------------------------------------------

    /// Cash held by a portfolio in one currency.
    pub fn portfolio_cash_balance(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self
            .portfolio_ref(portfolio_id)?
            .total_cash_value_local(currency))
    }

    /// Net quantity of an asset (equity or currency) held by a portfolio.
    pub fn position_quantity(
        &self,
        portfolio_id: &str,
        asset: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.get_position(asset))
    }

    pub fn portfolio_total_cash_value(&self, portfolio_id: &str) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.total_cash_value_base())
    }

    pub fn portfolio_total_market_value(&self, portfolio_id: &str) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.total_market_value_base())
    }

    pub fn portfolio_total_equity(&self, portfolio_id: &str) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.total_equity_base())
    }

    pub fn portfolio_market_value_local(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self
            .portfolio_ref(portfolio_id)?
            .total_market_value_local(currency))
    }

    pub fn portfolio_equity_local(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self
            .portfolio_ref(portfolio_id)?
            .total_equity_local(currency))
    }

    pub fn portfolio_unrealised_pnl(&self, portfolio_id: &str) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.total_unrealised_pnl_base())
    }

    pub fn portfolio_unrealised_pnl_local(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self
            .portfolio_ref(portfolio_id)?
            .total_unrealised_pnl_local(currency))
    }

    pub fn portfolio_realised_pnl_local(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self
            .portfolio_ref(portfolio_id)?
            .total_realised_pnl_local(currency))
    }

    pub fn portfolio_total_pnl_local(
        &self,
        portfolio_id: &str,
        currency: &str,
    ) -> Result<Decimal, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.total_pnl_local(currency))
    }

    pub fn portfolio_holdings(
        &self,
        portfolio_id: &str,
    ) -> Result<BTreeMap<String, Holding>, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.holdings())
    }

    pub fn portfolio_cash_holdings(
        &self,
        portfolio_id: &str,
    ) -> Result<BTreeMap<String, Holding>, BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.cash_holdings())
    }

    pub fn portfolio_events(&self, portfolio_id: &str) -> Result<&[PortfolioEvent], BrokerError> {
        Ok(self.portfolio_ref(portfolio_id)?.history())
    }

    /// Sum of portfolio cash values across all portfolios, in base currency.
    pub fn account_total_cash_value(&self) -> Decimal {
        self.portfolios
            .values()
            .map(|p| p.total_cash_value_base())
            .sum()
    }

    pub fn account_total_market_value(&self) -> Decimal {
        self.portfolios
            .values()
            .map(|p| p.total_market_value_base())
            .sum()
    }

    pub fn account_total_equity(&self) -> Decimal {
        self.portfolios.values().map(|p| p.total_equity_base()).sum()
    }

    // -- Order flow -----------------------------------------------------------

    /// Queues an order for execution on the next update.
    pub fn submit_order(&mut self, portfolio_id: &str, order: Order) -> Result<(), BrokerError> {
        if !self.portfolios.contains_key(portfolio_id) {
            return Err(BrokerError::UnknownPortfolio(portfolio_id.to_string()));
        }
        info!(
            %portfolio_id,
            order_id = %order.order_id,
            asset = %order.asset,
            quantity = %order.quantity,
            "order submitted"
        );
        self.open_orders
            .entry(portfolio_id.to_string())
            .or_default()
            .push_back(order);
        Ok(())
    }

    /// Advances the simulation clock: marks every open position to the
    /// latest quotes, then drains and executes queued orders while the
    /// exchange is open, sells first.
    pub fn update(&mut self, dt: DateTime<Utc>) -> Result<(), BrokerError> {
        self.current_dt = dt;

        let portfolio_ids: Vec<String> = self.portfolios.keys().cloned().collect();
        for portfolio_id in &portfolio_ids {
            self.mark_portfolio(portfolio_id, dt)?;
        }

        if self.calendar.is_open_at(dt) {
            let mut batch: Vec<(String, Order)> = Vec::new();
            for (portfolio_id, queue) in self.open_orders.iter_mut() {
                while let Some(order) = queue.pop_front() {
                    batch.push((portfolio_id.clone(), order));
                }
            }
            // Stable sort: sells settle before the buys that may need the cash.
            batch.sort_by_key(|(_, order)| order.direction());
            debug!(orders = batch.len(), "executing queued orders");
            for (portfolio_id, order) in batch {
                self.execute_order(dt, &portfolio_id, &order)?;
            }
        }
        Ok(())
    }

    /// Marks a portfolio's equity prices, equity fx rates and non-base cash
    /// rates to the latest mid quotes. A missing quote keeps the old mark.
    fn mark_portfolio(&mut self, portfolio_id: &str, dt: DateTime<Utc>) -> Result<(), BrokerError> {
        let (open_assets, cash_currencies) = match self.portfolios.get(portfolio_id) {
            Some(portfolio) => (portfolio.open_assets(), portfolio.cash_currencies()),
            None => return Ok(()),
        };

        for (asset, currency) in open_assets {
            match self.prices.latest_mid(dt, &asset) {
                Some(mid) => {
                    if let Some(portfolio) = self.portfolios.get_mut(portfolio_id) {
                        portfolio.update_market_value_of_asset(&asset, mid, dt)?;
                    }
                }
                None => debug!(%asset, "no mid quote; keeping previous mark"),
            }
            if currency != self.base_currency {
                if let Some(rate) = self.prices.latest_mid(dt, &currency) {
                    if let Some(portfolio) = self.portfolios.get_mut(portfolio_id) {
                        portfolio.update_fx_rate_of_asset(&asset, rate, dt)?;
                    }
                }
            }
        }

        for currency in cash_currencies {
            if currency == self.base_currency {
                continue;
            }
            match self.prices.latest_mid(dt, &currency) {
                Some(rate) => {
                    if let Some(portfolio) = self.portfolios.get_mut(portfolio_id) {
                        portfolio.update_fx_rate(&currency, rate, dt)?;
                    }
                }
                None => debug!(%currency, "no fx quote; keeping previous mark"),
            }
        }
        Ok(())
    }

    /// Bid for sells, ask for buys; a missing pair is a hard failure.
    fn execution_mark(
        &self,
        dt: DateTime<Utc>,
        asset: &str,
        side: Direction,
        order_id: &str,
    ) -> Result<Decimal, BrokerError> {
        let (bid, ask) =
            self.prices
                .latest_bid_ask(dt, asset)
                .ok_or_else(|| BrokerError::MissingQuote {
                    asset: asset.to_string(),
                    order_id: order_id.to_string(),
                })?;
        let mark = if side.is_short() { bid } else { ask };
        if mark <= Decimal::ZERO {
            return Err(BrokerError::InvalidQuote {
                asset: asset.to_string(),
                price: mark,
                order_id: order_id.to_string(),
            });
        }
        Ok(mark)
    }

    fn execute_order(
        &mut self,
        dt: DateTime<Utc>,
        portfolio_id: &str,
        order: &Order,
    ) -> Result<(), BrokerError> {
        match order.kind {
            TradeKind::Fx => self.execute_fx_order(dt, portfolio_id, order),
            TradeKind::Stock => self.execute_stock_order(dt, portfolio_id, order),
        }
    }

    fn execute_fx_order(
        &mut self,
        dt: DateTime<Utc>,
        portfolio_id: &str,
        order: &Order,
    ) -> Result<(), BrokerError> {
        let base = self.base_currency.clone();
        let first_currency = order.asset.clone();
        let second_currency = order.currency.clone().unwrap_or_else(|| base.clone());
        let direction = order.direction();

        // Each leg is quoted on the side it actually trades: the bought leg
        // at the ask, the sold leg at the bid.
        let rate_first = if first_currency != base {
            self.execution_mark(dt, &first_currency, direction, &order.order_id)?
        } else {
            Decimal::ONE
        };
        let second_side = if direction.is_long() {
            Direction::Short
        } else {
            Direction::Long
        };
        let rate_second = if second_currency != base {
            self.execution_mark(dt, &second_currency, second_side, &order.order_id)?
        } else {
            Decimal::ONE
        };

        let consideration = ((rate_first * order.quantity) / rate_second).round();
        let commission = self
            .fee_model
            .commission(&first_currency, order.quantity, consideration);
        let est_total_cost = consideration + commission;

        // The currency being spent: the second leg on a buy of the first,
        // the first leg on a sell. Shortfalls warn and proceed.
        if direction.is_long() {
            let available = self
                .portfolio_ref(portfolio_id)?
                .total_cash_value_local(&second_currency);
            if est_total_cost > available {
                warn!(
                    %portfolio_id,
                    currency = %second_currency,
                    cost = %est_total_cost.round_dp(2),
                    available = %available.round_dp(2),
                    "estimated fx cost exceeds available cash; proceeding with a negative balance"
                );
            }
        } else {
            let available = self
                .portfolio_ref(portfolio_id)?
                .total_cash_value_local(&first_currency);
            if -order.quantity > available {
                warn!(
                    %portfolio_id,
                    currency = %first_currency,
                    quantity = %(-order.quantity),
                    available = %available.round_dp(2),
                    "fx sale exceeds available cash; proceeding with a negative balance"
                );
            }
        }

        let txn = Transaction::fx(
            first_currency.clone(),
            order.quantity,
            dt,
            rate_first,
            second_currency,
            rate_second,
            order.order_id.clone(),
            commission,
        );
        self.portfolio_mut(portfolio_id)?.transact_asset(&txn)?;
        info!(
            %portfolio_id,
            currency = %first_currency,
            quantity = %order.quantity,
            rate = %rate_first,
            consideration = %consideration,
            commission = %commission.round_dp(2),
            "executed fx order"
        );
        Ok(())
    }

    fn execute_stock_order(
        &mut self,
        dt: DateTime<Utc>,
        portfolio_id: &str,
        order: &Order,
    ) -> Result<(), BrokerError> {
        let base = self.base_currency.clone();
        let currency = match &order.currency {
            Some(currency) => currency.clone(),
            None => self
                .universe
                .home_currency(&order.asset)
                .ok_or_else(|| BrokerError::UnknownAsset(order.asset.clone()))?,
        };
        let direction = order.direction();

        let price = self.execution_mark(dt, &order.asset, direction, &order.order_id)?;
        let fx_rate = if currency != base {
            self.execution_mark(dt, &currency, direction, &order.order_id)?
        } else {
            Decimal::ONE
        };

        let consideration = (price * order.quantity).round();
        let commission = self
            .fee_model
            .commission(&order.asset, order.quantity, consideration);
        let est_total_cost = consideration + commission;

        if direction.is_long() {
            let available = self
                .portfolio_ref(portfolio_id)?
                .total_cash_value_local(&currency);

            // An under-funded buy is topped up from base cash when auto-fx
            // is on, otherwise it simply goes ahead into a negative balance.
            let mut top_up: Option<Transaction> = None;
            if est_total_cost > available {
                if order.auto_fx && currency != base {
                    let shortfall = est_total_cost - available;
                    let consideration_fx = (fx_rate * shortfall).round();
                    let commission_fx =
                        self.fee_model
                            .commission(&currency, shortfall, consideration_fx);
                    let base_cost = consideration_fx + commission_fx;
                    let base_available = self
                        .portfolio_ref(portfolio_id)?
                        .total_cash_value_local(&base);
                    if base_cost > base_available {
                        warn!(
                            %portfolio_id,
                            cost = %base_cost.round_dp(2),
                            available = %base_available.round_dp(2),
                            "estimated auto-fx cost exceeds available base cash; proceeding with a negative balance"
                        );
                    }
                    top_up = Some(Transaction::fx(
                        currency.clone(),
                        shortfall,
                        dt,
                        fx_rate,
                        base.clone(),
                        Decimal::ONE,
                        format!("{}_auto_fx", order.order_id),
                        commission_fx,
                    ));
                } else {
                    warn!(
                        %portfolio_id,
                        asset = %order.asset,
                        cost = %est_total_cost.round_dp(2),
                        available = %available.round_dp(2),
                        "estimated cost exceeds available cash; proceeding with a negative balance"
                    );
                }
            }

            let txn = Transaction::stock(
                order.asset.clone(),
                order.quantity,
                dt,
                price,
                currency.clone(),
                fx_rate,
                order.order_id.clone(),
                commission,
            );
            let portfolio = self.portfolio_mut(portfolio_id)?;
            if let Some(fx_txn) = &top_up {
                portfolio.transact_asset(fx_txn)?;
                info!(
                    %portfolio_id,
                    currency = %fx_txn.asset,
                    quantity = %fx_txn.quantity,
                    rate = %fx_txn.price,
                    "executed auto-fx top-up"
                );
            }
            portfolio.transact_asset(&txn)?;
            info!(
                %portfolio_id,
                asset = %order.asset,
                quantity = %order.quantity,
                %price,
                commission = %commission.round_dp(2),
                "executed order"
            );
        } else {
            // Clamp the sale to the net holding so an oversell closes the
            // position flat instead of flipping it short.
            let held = self.portfolio_ref(portfolio_id)?.get_position(&order.asset);
            let sellable = held.max(Decimal::ZERO);
            let quantity = -(-order.quantity).min(sellable);

            let txn = Transaction::stock(
                order.asset.clone(),
                quantity,
                dt,
                price,
                currency.clone(),
                fx_rate,
                order.order_id.clone(),
                commission,
            );
            self.portfolio_mut(portfolio_id)?.transact_asset(&txn)?;
            info!(
                %portfolio_id,
                asset = %order.asset,
                %quantity,
                %price,
                commission = %commission.round_dp(2),
                "executed order"
            );

            if order.auto_fx && currency != base {
                // Sweep the sale proceeds back into base cash. The fee
                // argument order here differs from the buy-side top-up on
                // purpose; the two paths are kept independent.
                let proceeds = -(price * quantity).round();
                let consideration_sweep = (fx_rate * proceeds).round();
                let commission_sweep = self.fee_model.commission(
                    &currency,
                    consideration_sweep,
                    consideration_sweep,
                );
                let sweep = Transaction::fx(
                    currency.clone(),
                    -proceeds,
                    dt,
                    fx_rate,
                    base.clone(),
                    Decimal::ONE,
                    format!("{}_auto_fx", order.order_id),
                    commission_sweep,
                );
                self.portfolio_mut(portfolio_id)?.transact_asset(&sweep)?;
                info!(
                    %portfolio_id,
                    currency = %currency,
                    proceeds = %proceeds,
                    rate = %fx_rate,
                    "executed auto-fx sweep"
                );
            }
        }
        Ok(())
    }
}
