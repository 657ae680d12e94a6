//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate is the heart of Stockbook. It contains the stock deduction
//! and billing logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Stockbook Data Flow                      │
//! │                                                             │
//! │  Desktop frontend (stock forms, billing forms)              │
//! │        │ IPC                                                │
//! │        ▼                                                    │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │            ★ stockbook-core (THIS CRATE) ★          │    │
//! │  │                                                     │    │
//! │  │  ┌────────┐ ┌───────┐ ┌────────────┐ ┌──────────┐   │    │
//! │  │  │ types  │ │ money │ │ allocation │ │   bill   │   │    │
//! │  │  │ Lot    │ │ Money │ │ plan       │ │ DraftBill│   │    │
//! │  │  │ Bill   │ │ cents │ │ deductions │ │ builder  │   │    │
//! │  │  └────────┘ └───────┘ └────────────┘ └──────────┘   │    │
//! │  │                                                     │    │
//! │  │  NO I/O • NO DATABASE • PURE FUNCTIONS              │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │        │                                                    │
//! │        ▼                                                    │
//! │  stockbook-db (SQLite storage, atomic bill commits)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockLot, Bill, BillItem, requests)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocation`] - Greedy lot selection for a deduction request
//! - [`bill`] - Bill building: validation + snapshot-threaded allocation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, including lot ordering
//! 2. **No I/O**: database access lives in stockbook-db, never here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: typed errors, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod bill;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{DeductionPolicy, LotDeduction};
pub use bill::{DraftBill, DraftLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum requested lines in a single bill.
///
/// Prevents runaway bill submissions from the frontend. One requested line
/// may still expand into several stored items when it spans multiple lots.
pub const MAX_BILL_LINES: usize = 100;

/// Maximum length of a bill number.
pub const MAX_BILL_NUMBER_LEN: usize = 50;

/// Maximum length of a classification key field (product, type, place, unit).
pub const MAX_KEY_FIELD_LEN: usize = 100;
