//! Identity matching for incoming external records.
//!
//! # Responsibility
//! - Find the stored record that represents the same real-world customer.
//! - Collect stored records that must be kept in sync as duplicates.
//! - Detect identity and type conflicts.
//!
//! # Invariants
//! - Only repository lookups happen here; nothing is written.
//! - External id lookup always runs before company number lookup.
//! - `CustomerMatch::duplicates` never contains the canonical record and
//!   never contains placeholders.

use crate::model::customer::{Customer, CustomerType};
use crate::model::external::{ExternalCustomer, ExternalKind};
use crate::repo::customer_repo::CustomerRepository;
use crate::service::customer_sync::{ConflictError, SyncError, SyncResult};
use std::fmt::{Display, Formatter};

/// How the canonical record of a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTerm {
    /// Nothing stored matched; the canonical record is new.
    NoMatch,
    ExternalId,
    CompanyNumber,
}

impl Display for MatchTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch => write!(f, "none"),
            Self::ExternalId => write!(f, "external_id"),
            Self::CompanyNumber => write!(f, "company_number"),
        }
    }
}

/// Result of identity matching for one external record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerMatch {
    customer: Customer,
    duplicates: Vec<Customer>,
    term: MatchTerm,
}

impl CustomerMatch {
    fn unmatched(external_id: &str, duplicates: Vec<Customer>) -> Self {
        Self {
            customer: Customer::new_canonical(external_id),
            duplicates,
            term: MatchTerm::NoMatch,
        }
    }

    /// Canonical record, either loaded or freshly built.
    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn duplicates(&self) -> &[Customer] {
        &self.duplicates
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn term(&self) -> MatchTerm {
        self.term
    }

    pub fn into_parts(self) -> (Customer, Vec<Customer>) {
        (self.customer, self.duplicates)
    }
}

/// Resolves `external` against stored records.
///
/// # Errors
/// - `SyncError::Conflict` when a matched record has the wrong customer type,
///   or a company number is already claimed by another external id.
/// - `SyncError::Repo` when a lookup fails.
pub fn load_customer<R: CustomerRepository + ?Sized>(
    repo: &R,
    external: &ExternalCustomer,
) -> SyncResult<CustomerMatch> {
    match external.kind() {
        ExternalKind::Company { company_number } => {
            load_company(repo, external.external_id(), company_number)
        }
        ExternalKind::Person => load_person(repo, external.external_id()),
    }
}

fn load_company<R: CustomerRepository + ?Sized>(
    repo: &R,
    external_id: &str,
    company_number: &str,
) -> SyncResult<CustomerMatch> {
    let mut duplicates = Vec::new();

    if let Some(by_external_id) = repo.find_by_external_id(external_id)? {
        ensure_type(
            &by_external_id,
            CustomerType::Company,
            external_id,
            MatchTerm::ExternalId,
        )?;

        if let Some(duplicate) = repo.find_by_master_external_id(external_id)? {
            if !same_record(&duplicate, &by_external_id) {
                duplicates.push(duplicate);
            }
        }

        if by_external_id.company_number.as_deref() == Some(company_number) {
            return Ok(CustomerMatch {
                customer: by_external_id,
                duplicates,
                term: MatchTerm::ExternalId,
            });
        }

        // Company number changed: the old record stays as a duplicate.
        let mut demoted = by_external_id;
        demoted.demote();
        duplicates.push(demoted);
    }

    let Some(mut by_company_number) = repo.find_by_company_number(company_number)? else {
        return Ok(CustomerMatch::unmatched(external_id, duplicates));
    };

    ensure_type(
        &by_company_number,
        CustomerType::Company,
        external_id,
        MatchTerm::CompanyNumber,
    )?;
    if let Some(found) = by_company_number.external_id.as_deref() {
        if found != external_id {
            return Err(SyncError::Conflict(ConflictError::ExternalIdMismatch {
                company_number: company_number.to_string(),
                external_id: external_id.to_string(),
                found_external_id: found.to_string(),
            }));
        }
    }

    duplicates.retain(|duplicate| !same_record(duplicate, &by_company_number));
    by_company_number.claim_identity(external_id);
    Ok(CustomerMatch {
        customer: by_company_number,
        duplicates,
        term: MatchTerm::CompanyNumber,
    })
}

fn load_person<R: CustomerRepository + ?Sized>(
    repo: &R,
    external_id: &str,
) -> SyncResult<CustomerMatch> {
    let Some(by_external_id) = repo.find_by_external_id(external_id)? else {
        return Ok(CustomerMatch::unmatched(external_id, Vec::new()));
    };

    ensure_type(
        &by_external_id,
        CustomerType::Person,
        external_id,
        MatchTerm::ExternalId,
    )?;
    Ok(CustomerMatch {
        customer: by_external_id,
        duplicates: Vec::new(),
        term: MatchTerm::ExternalId,
    })
}

fn ensure_type(
    customer: &Customer,
    expected: CustomerType,
    external_id: &str,
    matched_by: MatchTerm,
) -> SyncResult<()> {
    if customer.customer_type == Some(expected) {
        return Ok(());
    }
    Err(SyncError::Conflict(ConflictError::CustomerTypeMismatch {
        external_id: external_id.to_string(),
        matched_by,
        expected,
        found: customer.customer_type,
    }))
}

fn same_record(left: &Customer, right: &Customer) -> bool {
    match (left.internal_id(), right.internal_id()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::same_record;
    use crate::model::customer::{Customer, RecordState};
    use uuid::Uuid;

    #[test]
    fn same_record_requires_matching_stored_ids() {
        let id = Uuid::new_v4();
        let mut left = Customer::new_canonical("ext-1");
        let mut right = Customer::new_canonical("ext-1");
        assert!(!same_record(&left, &right));

        left.state = RecordState::Stored(id);
        right.state = RecordState::Stored(id);
        assert!(same_record(&left, &right));

        right.state = RecordState::Stored(Uuid::new_v4());
        assert!(!same_record(&left, &right));
    }
}
