//! # stockbook-db: Database Layer for Stockbook
//!
//! SQLite persistence for stock lots, bills, and bill items, plus the
//! billing service the desktop frontend talks to.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Stockbook Data Flow                      │
//! │                                                             │
//! │  Desktop frontend (IPC)                                     │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │               stockbook-db (THIS CRATE)             │    │
//! │  │                                                     │    │
//! │  │  ┌──────────┐  ┌──────────────┐  ┌──────────────┐   │    │
//! │  │  │ Database │  │ Repositories │  │BillingService│   │    │
//! │  │  │ (pool)   │◄─│ lot, bill    │◄─│ (contract +  │   │    │
//! │  │  │ WAL,     │  │              │  │ atomic bill  │   │    │
//! │  │  │ migrate  │  │              │  │ commit)      │   │    │
//! │  │  └──────────┘  └──────────────┘  └──────────────┘   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  SQLite database file (one per installation)                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (lot, bill)
//! - [`service`] - The billing service: intake, bill submission, reads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stockbook.db")).await?;
//! let service = db.billing();
//!
//! let lot = service.record_intake(new_lot).await?;
//! let bill = service.submit_bill(request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};
pub use service::{ApiError, BillingService, ErrorCode, ServiceError};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::lot::LotRepository;
