//! Core customer sync logic.
//! Reconciles external customer records with the local customer store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::SyncConfig;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::address::Address;
pub use model::customer::{
    Customer, CustomerId, CustomerType, CustomerValidationError, RecordState,
};
pub use model::external::{ExternalCustomer, ExternalKind};
pub use model::shopping_list::{ShoppingList, ShoppingListId};
pub use repo::customer_repo::{
    CustomerRepository, RepoError, RepoResult, SqliteCustomerRepository,
};
pub use service::customer_match::{load_customer, CustomerMatch, MatchTerm};
pub use service::customer_sync::{
    ConflictError, CustomerSyncService, SyncError, SyncReport, SyncResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
