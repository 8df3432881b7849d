//! Customer sync use-cases.
//!
//! # Responsibility
//! - Resolve an external record to its canonical stored customer.
//! - Merge incoming fields and persist canonical and duplicate records.
//!
//! # Invariants
//! - Matching only reads; every conflict is raised before the first write.
//! - Service layer remains storage-agnostic.

pub mod customer_match;
pub mod customer_sync;
