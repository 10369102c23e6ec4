//! # Broker
//!
//! This crate provides the simulated brokerage that sits between a trading
//! strategy and its portfolios: master cash accounts, portfolio funding,
//! order queues and the execution logic that turns submitted orders into
//! settled transactions at external quotes, including automatic currency
//! conversion for off-base settlement.
//!
//! ## Architectural Principles
//!
//! - **Deferred execution:** `submit_order` only queues. All economic
//!   effects happen inside `update(dt)`, which first marks open positions
//!   to the latest quotes and then drains the queues sells-first.
//! - **Collaborators behind traits:** prices, trading hours, asset metadata
//!   and fees come in via the `PriceSource`, `ExchangeCalendar`, `Universe`
//!   and `FeeModel` traits, so the broker itself has no data dependencies.
//! - **Soft trade shortfalls:** an under-funded trade warns and proceeds
//!   with a negative balance; only explicit subscriptions and withdrawals
//!   fail hard on insufficient cash.
//!
//! ## Public API
//!
//! - `SimulatedBroker`: the brokerage entity.
//! - `FeeModel` / `ZeroFeeModel` / `PercentFeeModel`: commission schedules.
//! - `PriceSource` / `ExchangeCalendar` / `Universe`: collaborator contracts.
//! - `StaticUniverse`, `AlwaysOpenCalendar`: simple concrete collaborators.
//! - `BrokerError`: the specific error types returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod fee_model;
pub mod market;
pub mod simulated;
pub mod universe;

// Re-export the key components to provide a clean, public-facing API.
pub use error::BrokerError;
pub use fee_model::{FeeModel, PercentFeeModel, ZeroFeeModel};
pub use market::{AlwaysOpenCalendar, ExchangeCalendar, PriceSource};
pub use simulated::SimulatedBroker;
pub use universe::{StaticUniverse, Universe};
