//! Customer domain model shared by matching, merge and persistence.
//!
//! # Responsibility
//! - Define the stored customer record and the incoming external view.
//! - Keep value types (`Address`, `ShoppingList`) free of behavior.
//!
//! # Invariants
//! - A stored record is either `New` or `Stored(id)`; the id is owned by the
//!   persistence layer.
//! - A `Person` record never carries a company number.

pub mod address;
pub mod customer;
pub mod external;
pub mod shopping_list;
