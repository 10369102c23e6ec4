use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The closed set of economic trade kinds the core understands.
///
/// A `Stock` trade exchanges an equity asset for cash in its settlement
/// currency; an `Fx` trade exchanges one currency for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Stock,
    Fx,
}

/// The signed direction of an order, transaction or open position.
///
/// The variant order matters: `Short < Flat < Long`, so an ascending sort of
/// a mixed batch places sells ahead of buys, freeing cash that the buys in
/// the same batch may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Short,
    Flat,
    Long,
}

impl Direction {
    /// Direction of a signed quantity using the ledger's sign convention:
    /// a zero quantity counts as a buy.
    pub fn of_signed(quantity: Decimal) -> Self {
        if quantity < Decimal::ZERO {
            Direction::Short
        } else {
            Direction::Long
        }
    }

    /// Direction of a net holding, where an exactly-zero holding is flat.
    pub fn of_net(net_quantity: Decimal) -> Self {
        if net_quantity.is_zero() {
            Direction::Flat
        } else {
            Self::of_signed(net_quantity)
        }
    }

    /// The conventional -1 / 0 / +1 representation.
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Short => -1,
            Direction::Flat => 0,
            Direction::Long => 1,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Direction::Short)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Short => write!(f, "SHORT"),
            Direction::Flat => write!(f, "FLAT"),
            Direction::Long => write!(f, "LONG"),
        }
    }
}
