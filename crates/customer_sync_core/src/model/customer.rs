//! Stored customer record.
//!
//! # Responsibility
//! - Define the system's own view of a customer and its lifecycle state.
//! - Provide the small set of mutations the sync engine performs.
//!
//! # Invariants
//! - `RecordState::Stored` means the row exists; any change must be written
//!   through an update, never a second create.
//! - `master_external_id` equals `external_id` on canonical records and is
//!   absent on demoted duplicates.
//! - `CustomerType::Person` never carries a `company_number`.

use crate::model::address::Address;
use crate::model::shopping_list::ShoppingList;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Internal identifier assigned by the persistence layer on create.
pub type CustomerId = Uuid;

/// Customer classification. Immutable once set on a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerType {
    Person,
    Company,
}

impl Display for CustomerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Company => write!(f, "company"),
        }
    }
}

/// Create-vs-update discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Built in memory, not yet written.
    New,
    /// Exists in storage under this id.
    Stored(CustomerId),
}

/// Validation failures for customer invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerValidationError {
    PersonWithCompanyNumber { company_number: String },
    MissingCustomerType,
}

impl Display for CustomerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonWithCompanyNumber { company_number } => write!(
                f,
                "person customer must not carry company number `{company_number}`"
            ),
            Self::MissingCustomerType => write!(f, "customer type must be set before persistence"),
        }
    }
}

impl Error for CustomerValidationError {}

/// The system's mutable view of one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub state: RecordState,
    pub external_id: Option<String>,
    pub master_external_id: Option<String>,
    /// `None` only between construction and first population.
    pub customer_type: Option<CustomerType>,
    pub company_number: Option<String>,
    pub name: Option<String>,
    pub address: Option<Address>,
    pub preferred_store: Option<String>,
    /// Ordered; the engine only ever appends.
    pub shopping_lists: Vec<ShoppingList>,
}

impl Customer {
    /// Creates an empty, not-yet-persisted record.
    pub fn new() -> Self {
        Self {
            state: RecordState::New,
            external_id: None,
            master_external_id: None,
            customer_type: None,
            company_number: None,
            name: None,
            address: None,
            preferred_store: None,
            shopping_lists: Vec::new(),
        }
    }

    /// Creates a fresh canonical record for an external identity.
    pub fn new_canonical(external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        let mut customer = Self::new();
        customer.master_external_id = Some(external_id.clone());
        customer.external_id = Some(external_id);
        customer
    }

    pub fn internal_id(&self) -> Option<CustomerId> {
        match self.state {
            RecordState::Stored(id) => Some(id),
            RecordState::New => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.state, RecordState::Stored(_))
    }

    /// Whether this record is the canonical holder of `external_id`.
    pub fn is_canonical(&self) -> bool {
        self.master_external_id.is_some() && self.master_external_id == self.external_id
    }

    /// Takes over `external_id` as both own and master identity.
    pub fn claim_identity(&mut self, external_id: &str) {
        self.external_id = Some(external_id.to_string());
        self.master_external_id = Some(external_id.to_string());
    }

    /// Demotes this record to duplicate status.
    pub fn demote(&mut self) {
        self.master_external_id = None;
    }

    pub fn add_shopping_list(&mut self, list: ShoppingList) {
        self.shopping_lists.push(list);
    }

    /// Checks invariants required before persistence.
    pub fn validate(&self) -> Result<(), CustomerValidationError> {
        match (self.customer_type, self.company_number.as_deref()) {
            (None, _) => Err(CustomerValidationError::MissingCustomerType),
            (Some(CustomerType::Person), Some(number)) => {
                Err(CustomerValidationError::PersonWithCompanyNumber {
                    company_number: number.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for Customer {
    fn default() -> Self {
        Self::new()
    }
}
