//! # Core Types
//!
//! This crate defines the shared leaf data model for the accounting and
//! trade-execution core: the closed set of trade kinds, the
//! signed trade direction, the immutable `Transaction` fill record, the pure
//! `CashMovement` ledger leg and the `Order` submitted to the broker.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** no other workspace crate is a dependency. Everything above
//!   (`portfolio`, `broker`) speaks in these types.
//! - **Closed tagged unions:** the kind of a trade is an enum, never a string
//!   tag. Dispatch on it is a `match`, so a new kind is a compile error at
//!   every call site until handled.
//! - **Immutable records:** a `Transaction` or `CashMovement` is constructed
//!   once and never mutated; all mutable state lives in the ledgers.

// Declare the modules that constitute this crate.
pub mod enums;
pub mod order;
pub mod transaction;

// Re-export the core types to provide a clean public API.
pub use enums::{Direction, TradeKind};
pub use order::Order;
pub use transaction::{CashMovement, Transaction};
