//! Shopping list relation record.
//!
//! # Invariants
//! - `id` is stable; the same list may be attached to a customer more than
//!   once and every attachment is kept.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one shopping list.
pub type ShoppingListId = Uuid;

/// Ordered product list owned by the external feed and linked to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: ShoppingListId,
    pub products: Vec<String>,
}

impl ShoppingList {
    /// Creates a list with a generated id.
    pub fn new<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_id(Uuid::new_v4(), products)
    }

    /// Creates a list under a caller-provided id, as received from the feed.
    pub fn with_id<I, S>(id: ShoppingListId, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            products: products.into_iter().map(Into::into).collect(),
        }
    }
}
