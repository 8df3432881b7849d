//! Customer sync use-case service.
//!
//! # Responsibility
//! - Apply one external record onto its canonical stored customer.
//! - Keep duplicate records' names current.
//! - Propagate shopping-list relations and persist every touched record.
//!
//! # Invariants
//! - Name, type, company number, address and preferred store are fully
//!   replaced from the external record on every sync.
//! - Duplicates only receive the name.
//! - The canonical record is saved before relations are propagated, and every
//!   appended relation is followed by a canonical update, so the last write
//!   carries the full relation list.
//! - The return value reports the canonical record's create only.

use crate::model::customer::{Customer, CustomerType};
use crate::model::external::ExternalCustomer;
use crate::repo::customer_repo::{CustomerRepository, RepoError};
use crate::service::customer_match::{load_customer, MatchTerm};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

/// Identity or type invariant violated by an incoming record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// A stored record matched but has an incompatible customer type.
    CustomerTypeMismatch {
        external_id: String,
        matched_by: MatchTerm,
        expected: CustomerType,
        found: Option<CustomerType>,
    },
    /// The company number is already held under another external id.
    ExternalIdMismatch {
        company_number: String,
        external_id: String,
        found_external_id: String,
    },
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CustomerTypeMismatch {
                external_id,
                matched_by,
                expected,
                found,
            } => {
                let found = found.map_or_else(|| "untyped".to_string(), |kind| kind.to_string());
                write!(
                    f,
                    "existing customer for external customer {external_id} (matched by {matched_by}) is {found}, not {expected}"
                )
            }
            Self::ExternalIdMismatch {
                company_number,
                external_id,
                found_external_id,
            } => write!(
                f,
                "existing customer for company number {company_number} doesn't match external id {external_id}; found {found_external_id}"
            ),
        }
    }
}

impl Error for ConflictError {}

/// Service error for customer sync.
#[derive(Debug)]
pub enum SyncError {
    Conflict(ConflictError),
    /// Persistence failure, passed through unchanged.
    Repo(RepoError),
}

impl SyncError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict(err) => write!(f, "conflict: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Conflict(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ConflictError> for SyncError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Summary of one completed sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Whether the canonical record was created by this sync.
    pub created: bool,
    pub term: MatchTerm,
    /// Canonical record as last persisted.
    pub customer: Customer,
    pub duplicates: Vec<Customer>,
}

/// Sync engine over a customer repository.
pub struct CustomerSyncService<R: CustomerRepository> {
    repo: R,
}

impl<R: CustomerRepository> CustomerSyncService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Reconciles one external record.
    ///
    /// Returns `true` when the canonical record was newly created, `false`
    /// when an existing record was updated.
    pub fn sync(&self, external: &ExternalCustomer) -> SyncResult<bool> {
        self.sync_with_report(external).map(|report| report.created)
    }

    /// Reconciles one external record and returns the persisted records.
    pub fn sync_with_report(&self, external: &ExternalCustomer) -> SyncResult<SyncReport> {
        let started_at = Instant::now();
        let result = self.apply(external);

        match &result {
            Ok(report) => info!(
                "event=customer_sync module=service status=ok external_id={} term={} created={} duplicates={} shopping_lists={} duration_ms={}",
                external.external_id(),
                report.term,
                report.created,
                report.duplicates.len(),
                external.shopping_lists().len(),
                started_at.elapsed().as_millis()
            ),
            Err(SyncError::Conflict(err)) => warn!(
                "event=customer_sync module=service status=conflict external_id={} duration_ms={} error={}",
                external.external_id(),
                started_at.elapsed().as_millis(),
                err
            ),
            Err(SyncError::Repo(err)) => error!(
                "event=customer_sync module=service status=error external_id={} duration_ms={} error_code=repo_failed error={}",
                external.external_id(),
                started_at.elapsed().as_millis(),
                err
            ),
        }

        result
    }

    fn apply(&self, external: &ExternalCustomer) -> SyncResult<SyncReport> {
        let matched = load_customer(&self.repo, external)?;
        let term = matched.term();
        let (mut customer, mut duplicates) = matched.into_parts();

        populate_fields(external, &mut customer);
        update_contact_info(external, &mut customer);
        update_preferred_store(external, &mut customer);
        let created = self.repo.save(&mut customer)?;

        self.update_relations(external, &mut customer)?;

        for duplicate in &mut duplicates {
            duplicate.name = Some(external.name().to_string());
            self.repo.save(duplicate)?;
        }

        Ok(SyncReport {
            created,
            term,
            customer,
            duplicates,
        })
    }

    fn update_relations(
        &self,
        external: &ExternalCustomer,
        customer: &mut Customer,
    ) -> SyncResult<()> {
        for list in external.shopping_lists() {
            customer.add_shopping_list(list.clone());
            self.repo.update_shopping_list(list)?;
            self.repo.update_customer(customer)?;
        }
        Ok(())
    }
}

fn populate_fields(external: &ExternalCustomer, customer: &mut Customer) {
    customer.name = Some(external.name().to_string());
    customer.customer_type = Some(external.customer_type());
    customer.company_number = external.company_number().map(str::to_string);
}

fn update_contact_info(external: &ExternalCustomer, customer: &mut Customer) {
    customer.address = external.address().cloned();
}

fn update_preferred_store(external: &ExternalCustomer, customer: &mut Customer) {
    customer.preferred_store = external.preferred_store().map(str::to_string);
}
