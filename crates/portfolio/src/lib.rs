//! # Portfolio
//!
//! This crate provides the accounting heart of the simulation: per-asset and
//! per-currency cost-basis ledgers, the handlers that own them, and the
//! `Portfolio` aggregate that converts priced transactions into ledger
//! entries and an append-only event history.
//!
//! ## Architectural Principles
//!
//! - **Pure accounting:** nothing in this crate fetches prices, computes
//!   fees or schedules execution. A `Portfolio` is handed fully-priced
//!   `Transaction` values and is solely responsible for recording their
//!   monetary consequences correctly.
//! - **Conservation by construction:** every stock fill is settled by an
//!   offsetting cash leg and every FX fill by a pair of opposite cash legs,
//!   so cash cannot appear or vanish outside an explicit subscription or
//!   withdrawal.
//! - **Monotonic time:** each entity carries its own clock and rejects any
//!   operation dated before it, guaranteeing chronological replay.
//!
//! ## Public API
//!
//! - `Position` / `CashPosition`: the two cost-basis ledgers.
//! - `PositionHandler` / `CashPositionHandler`: ordered create-on-demand,
//!   evict-on-zero maps of ledgers.
//! - `Portfolio`: subscriptions, withdrawals, transaction settlement and
//!   aggregate valuation queries.
//! - `PortfolioEvent`: one immutable history entry.
//! - `PortfolioError`: the specific error types returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod event;
pub mod handler;
pub mod portfolio;
pub mod position;
pub mod position_cash;

// Re-export the key components to provide a clean, public-facing API.
pub use error::PortfolioError;
pub use event::{PortfolioEvent, PortfolioEventKind};
pub use handler::{CashPositionHandler, PositionHandler};
pub use portfolio::{Holding, Portfolio};
pub use position::Position;
pub use position_cash::CashPosition;
