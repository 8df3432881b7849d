//! Persistence port for customer records and its SQLite implementation.
//!
//! # Responsibility
//! - Define the lookup/save contract the sync engine depends on.
//! - Isolate SQLite query details from matching and merge logic.
//!
//! # Invariants
//! - Repository writes enforce `Customer::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod customer_repo;
