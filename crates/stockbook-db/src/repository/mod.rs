//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! Each repository wraps the shared `SqlitePool` behind a typed API so SQL
//! stays in one place per record set.
//!
//! ## Available Repositories
//!
//! - [`lot::LotRepository`] - Stock lot CRUD, candidate queries, deductions
//! - [`bill::BillRepository`] - Bill reads and the atomic bill commit

pub mod bill;
pub mod lot;
