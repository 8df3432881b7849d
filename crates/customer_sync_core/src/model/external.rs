//! Incoming customer update from the external source-of-truth feed.
//!
//! # Responsibility
//! - Expose a read-only view of one feed record.
//! - Classify the record as person or company from the feed's company number.
//!
//! # Invariants
//! - `external_id` is always present.
//! - The company number is the only discriminator of company records; it is
//!   held inside `ExternalKind::Company` so absence cannot be misread.

use crate::model::address::Address;
use crate::model::customer::CustomerType;
use crate::model::shopping_list::ShoppingList;
use serde::{Deserialize, Serialize};

/// Classification of an external record, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalKind {
    Person,
    Company { company_number: String },
}

/// Read-only view of one incoming customer update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ExternalCustomerRecord", into = "ExternalCustomerRecord")]
pub struct ExternalCustomer {
    external_id: String,
    kind: ExternalKind,
    name: String,
    address: Option<Address>,
    preferred_store: Option<String>,
    shopping_lists: Vec<ShoppingList>,
}

impl ExternalCustomer {
    /// Creates an individual (person) record.
    pub fn person(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(external_id, ExternalKind::Person, name)
    }

    /// Creates a company record identified by its registration number.
    pub fn company(
        external_id: impl Into<String>,
        company_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let kind = ExternalKind::Company {
            company_number: company_number.into(),
        };
        Self::with_kind(external_id, kind, name)
    }

    fn with_kind(
        external_id: impl Into<String>,
        kind: ExternalKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            kind,
            name: name.into(),
            address: None,
            preferred_store: None,
            shopping_lists: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_preferred_store(mut self, store: impl Into<String>) -> Self {
        self.preferred_store = Some(store.into());
        self
    }

    pub fn with_shopping_list(mut self, list: ShoppingList) -> Self {
        self.shopping_lists.push(list);
        self
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn kind(&self) -> &ExternalKind {
        &self.kind
    }

    pub fn is_company(&self) -> bool {
        matches!(self.kind, ExternalKind::Company { .. })
    }

    pub fn company_number(&self) -> Option<&str> {
        match &self.kind {
            ExternalKind::Company { company_number } => Some(company_number.as_str()),
            ExternalKind::Person => None,
        }
    }

    /// Stored customer type this record maps to.
    pub fn customer_type(&self) -> CustomerType {
        match self.kind {
            ExternalKind::Company { .. } => CustomerType::Company,
            ExternalKind::Person => CustomerType::Person,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn preferred_store(&self) -> Option<&str> {
        self.preferred_store.as_deref()
    }

    pub fn shopping_lists(&self) -> &[ShoppingList] {
        &self.shopping_lists
    }
}

/// Feed wire shape: `companyNumber` absent or null means a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalCustomerRecord {
    external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    company_number: Option<String>,
    name: String,
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    preferred_store: Option<String>,
    #[serde(default)]
    shopping_lists: Vec<ShoppingList>,
}

impl From<ExternalCustomerRecord> for ExternalCustomer {
    fn from(value: ExternalCustomerRecord) -> Self {
        let kind = match value.company_number {
            Some(company_number) => ExternalKind::Company { company_number },
            None => ExternalKind::Person,
        };
        Self {
            external_id: value.external_id,
            kind,
            name: value.name,
            address: value.address,
            preferred_store: value.preferred_store,
            shopping_lists: value.shopping_lists,
        }
    }
}

impl From<ExternalCustomer> for ExternalCustomerRecord {
    fn from(value: ExternalCustomer) -> Self {
        let company_number = match value.kind {
            ExternalKind::Company { company_number } => Some(company_number),
            ExternalKind::Person => None,
        };
        Self {
            external_id: value.external_id,
            company_number,
            name: value.name,
            address: value.address,
            preferred_store: value.preferred_store,
            shopping_lists: value.shopping_lists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExternalCustomer, ExternalKind};
    use crate::model::customer::CustomerType;

    #[test]
    fn company_number_drives_classification() {
        let company = ExternalCustomer::company("ext-1", "C-100", "Acme");
        assert!(company.is_company());
        assert_eq!(company.company_number(), Some("C-100"));
        assert_eq!(company.customer_type(), CustomerType::Company);

        let person = ExternalCustomer::person("ext-2", "Ada");
        assert!(!person.is_company());
        assert_eq!(person.company_number(), None);
        assert_eq!(person.customer_type(), CustomerType::Person);
    }

    #[test]
    fn feed_json_without_company_number_is_a_person() {
        let json = r#"{"externalId":"ext-9","name":"Grace","companyNumber":null}"#;
        let parsed: ExternalCustomer = serde_json::from_str(json).expect("feed json should parse");
        assert_eq!(parsed.kind(), &ExternalKind::Person);
        assert!(parsed.shopping_lists().is_empty());
        assert!(parsed.address().is_none());
    }

    #[test]
    fn feed_json_with_company_number_and_lists_parses() {
        let json = r#"{
            "externalId": "ext-3",
            "companyNumber": "C-7",
            "name": "Initech",
            "address": {"street": "1 Main St", "city": "Springfield", "postalCode": "12345"},
            "preferredStore": "north",
            "shoppingLists": [
                {"id": "5f1b0b8e-6c1c-4d7e-9a57-0d2b6c9f1a11", "products": ["milk", "bread"]}
            ]
        }"#;
        let parsed: ExternalCustomer = serde_json::from_str(json).expect("feed json should parse");
        assert_eq!(parsed.company_number(), Some("C-7"));
        assert_eq!(parsed.preferred_store(), Some("north"));
        assert_eq!(parsed.address().map(|a| a.city.as_str()), Some("Springfield"));
        assert_eq!(parsed.shopping_lists()[0].products, vec!["milk", "bread"]);
    }
}
