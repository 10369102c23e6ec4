use std::collections::BTreeMap;

use core_types::{CashMovement, Transaction};
use rust_decimal::Decimal;

use crate::error::PortfolioError;
use crate::position::Position;
use crate::position_cash::CashPosition;

/// Ordered map of open equity positions, keyed by asset.
///
/// The map and its eviction rule are one operation: `transact` creates or
/// updates the entry, then removes it the instant `net_quantity` is exactly
/// zero, so no entry with a zero net quantity can ever be observed.
#[derive(Debug, Clone, Default)]
pub struct PositionHandler {
    positions: BTreeMap<String, Position>,
}

impl PositionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a fill to its position, opening or evicting as needed.
    pub fn transact(&mut self, txn: &Transaction) -> Result<(), PortfolioError> {
        match self.positions.get_mut(&txn.asset) {
            Some(position) => position.transact(txn)?,
            None => {
                self.positions
                    .insert(txn.asset.clone(), Position::open_from_transaction(txn));
            }
        }

        if self
            .positions
            .get(&txn.asset)
            .is_some_and(|p| p.net_quantity().is_zero())
        {
            self.positions.remove(&txn.asset);
        }
        Ok(())
    }

    pub fn get(&self, asset: &str) -> Option<&Position> {
        self.positions.get(asset)
    }

    pub fn get_mut(&mut self, asset: &str) -> Option<&mut Position> {
        self.positions.get_mut(asset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Position)> {
        self.positions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn total_market_value_base(&self) -> Decimal {
        self.positions.values().map(|p| p.market_value_base()).sum()
    }

    pub fn total_market_value_local(&self, currency: &str) -> Decimal {
        self.positions
            .values()
            .filter(|p| p.currency == currency)
            .map(|p| p.market_value_local())
            .sum()
    }

    pub fn total_unrealised_pnl_base(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealised_pnl_base()).sum()
    }

    pub fn total_unrealised_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .values()
            .filter(|p| p.currency == currency)
            .map(|p| p.unrealised_pnl_local())
            .sum()
    }

    pub fn total_realised_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .values()
            .filter(|p| p.currency == currency)
            .map(|p| p.realised_pnl_local())
            .sum()
    }

    pub fn total_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .values()
            .filter(|p| p.currency == currency)
            .map(|p| p.total_pnl_local())
            .sum()
    }
}

/// Ordered map of currency balances, keyed by ISO currency code. Same
/// create-or-update-then-evict contract as [`PositionHandler`].
#[derive(Debug, Clone, Default)]
pub struct CashPositionHandler {
    positions: BTreeMap<String, CashPosition>,
}

impl CashPositionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transact(&mut self, leg: &CashMovement) -> Result<(), PortfolioError> {
        match self.positions.get_mut(&leg.currency) {
            Some(position) => position.transact(leg)?,
            None => {
                self.positions
                    .insert(leg.currency.clone(), CashPosition::open_from_movement(leg));
            }
        }

        if self
            .positions
            .get(&leg.currency)
            .is_some_and(|p| p.net_quantity().is_zero())
        {
            self.positions.remove(&leg.currency);
        }
        Ok(())
    }

    pub fn get(&self, currency: &str) -> Option<&CashPosition> {
        self.positions.get(currency)
    }

    pub fn get_mut(&mut self, currency: &str) -> Option<&mut CashPosition> {
        self.positions.get_mut(currency)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CashPosition)> {
        self.positions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Net balance held in `currency`, zero when no ledger is open.
    pub fn balance(&self, currency: &str) -> Decimal {
        self.positions
            .get(currency)
            .map(|p| p.net_quantity())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_market_value_base(&self) -> Decimal {
        self.positions.values().map(|p| p.market_value_base()).sum()
    }

    pub fn total_market_value_local(&self, currency: &str) -> Decimal {
        self.positions
            .get(currency)
            .map(|p| p.market_value_local())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_unrealised_pnl_base(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealised_pnl_base()).sum()
    }

    pub fn total_unrealised_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .get(currency)
            .map(|p| p.unrealised_pnl_local())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_realised_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .get(currency)
            .map(|p| p.realised_pnl_local())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_pnl_local(&self, currency: &str) -> Decimal {
        self.positions
            .get(currency)
            .map(|p| p.total_pnl_local())
            .unwrap_or(Decimal::ZERO)
    }
}
