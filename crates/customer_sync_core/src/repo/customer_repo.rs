//! Customer repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the lookup/write port consumed by the sync engine.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Customer::validate()` before SQL mutations.
//! - `create_customer` is the only place internal ids are assigned.
//! - A customer's shopping-list sequence is stored in order, repeats included.
//! - Lookups prefer canonical rows over demoted rows sharing an identifier.

use crate::db::DbError;
use crate::model::address::Address;
use crate::model::customer::{
    Customer, CustomerId, CustomerType, CustomerValidationError, RecordState,
};
use crate::model::shopping_list::ShoppingList;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CUSTOMER_SELECT_SQL: &str = "SELECT
    internal_id,
    external_id,
    master_external_id,
    customer_type,
    company_number,
    name,
    address_street,
    address_city,
    address_postal_code,
    preferred_store
FROM customers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for customer persistence and lookups.
#[derive(Debug)]
pub enum RepoError {
    Validation(CustomerValidationError),
    Db(DbError),
    NotFound(CustomerId),
    /// Persisted data or caller input cannot be mapped to a valid customer.
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "customer not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid customer data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "customer repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "customer repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CustomerValidationError> for RepoError {
    fn from(value: CustomerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence port used by the sync engine.
pub trait CustomerRepository {
    /// Finds the record holding `external_id`, canonical rows first.
    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>>;
    /// Finds another record whose master external id is `external_id`.
    ///
    /// The record owning `external_id` itself is never returned.
    fn find_by_master_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>>;
    /// Finds the record registered under `company_number`, canonical rows first.
    fn find_by_company_number(&self, company_number: &str) -> RepoResult<Option<Customer>>;
    /// Inserts a new record and returns it in `Stored` state.
    fn create_customer(&self, customer: &Customer) -> RepoResult<Customer>;
    /// Rewrites an existing record, including its shopping-list sequence.
    fn update_customer(&self, customer: &Customer) -> RepoResult<Customer>;
    /// Inserts or replaces one shopping list.
    fn update_shopping_list(&self, list: &ShoppingList) -> RepoResult<()>;

    /// Creates `customer` when it is new, otherwise updates it.
    ///
    /// Returns `true` when a create happened. After a create, `customer`
    /// carries its assigned internal id.
    fn save(&self, customer: &mut Customer) -> RepoResult<bool> {
        match customer.state {
            RecordState::New => {
                *customer = self.create_customer(customer)?;
                Ok(true)
            }
            RecordState::Stored(_) => {
                self.update_customer(customer)?;
                Ok(false)
            }
        }
    }
}

impl<R: CustomerRepository + ?Sized> CustomerRepository for &R {
    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>> {
        (**self).find_by_external_id(external_id)
    }

    fn find_by_master_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>> {
        (**self).find_by_master_external_id(external_id)
    }

    fn find_by_company_number(&self, company_number: &str) -> RepoResult<Option<Customer>> {
        (**self).find_by_company_number(company_number)
    }

    fn create_customer(&self, customer: &Customer) -> RepoResult<Customer> {
        (**self).create_customer(customer)
    }

    fn update_customer(&self, customer: &Customer) -> RepoResult<Customer> {
        (**self).update_customer(customer)
    }

    fn update_shopping_list(&self, list: &ShoppingList) -> RepoResult<()> {
        (**self).update_shopping_list(list)
    }
}

/// SQLite-backed customer repository.
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_customer_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Loads one record by internal id.
    pub fn get_customer(&self, id: CustomerId) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!("{CUSTOMER_SELECT_SQL} WHERE internal_id = ?1;"),
            &id.to_string(),
        )
    }

    /// Lists every stored record in creation order.
    pub fn list_customers(&self) -> RepoResult<Vec<Customer>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CUSTOMER_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut customers = Vec::new();
        while let Some(row) = rows.next()? {
            customers.push(self.parse_customer_row(row)?);
        }
        Ok(customers)
    }

    fn query_one(&self, sql: &str, key: &str) -> RepoResult<Option<Customer>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(self.parse_customer_row(row)?)),
            None => Ok(None),
        }
    }

    fn parse_customer_row(&self, row: &Row<'_>) -> RepoResult<Customer> {
        let id_text: String = row.get("internal_id")?;
        let id = parse_uuid(&id_text, "customers.internal_id")?;

        let type_text: String = row.get("customer_type")?;
        let customer_type = parse_customer_type(&type_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid customer type `{type_text}` in customers.customer_type"
            ))
        })?;

        let address = match (
            row.get::<_, Option<String>>("address_street")?,
            row.get::<_, Option<String>>("address_city")?,
            row.get::<_, Option<String>>("address_postal_code")?,
        ) {
            (Some(street), Some(city), Some(postal_code)) => Some(Address {
                street,
                city,
                postal_code,
            }),
            (None, None, None) => None,
            _ => {
                return Err(RepoError::InvalidData(format!(
                    "partial address stored for customer {id}"
                )));
            }
        };

        let customer = Customer {
            state: RecordState::Stored(id),
            external_id: row.get("external_id")?,
            master_external_id: row.get("master_external_id")?,
            customer_type: Some(customer_type),
            company_number: row.get("company_number")?,
            name: row.get("name")?,
            address,
            preferred_store: row.get("preferred_store")?,
            shopping_lists: self.load_shopping_lists(id)?,
        };
        customer.validate()?;
        Ok(customer)
    }

    fn load_shopping_lists(&self, id: CustomerId) -> RepoResult<Vec<ShoppingList>> {
        let mut stmt = self.conn.prepare(
            "SELECT sl.id, sl.products
             FROM customer_shopping_lists csl
             JOIN shopping_lists sl ON sl.id = csl.shopping_list_id
             WHERE csl.customer_id = ?1
             ORDER BY csl.position ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            let list_id: String = row.get(0)?;
            let products: String = row.get(1)?;
            lists.push(ShoppingList {
                id: parse_uuid(&list_id, "shopping_lists.id")?,
                products: decode_products(&products)?,
            });
        }
        Ok(lists)
    }

    fn write_shopping_list_links(
        &self,
        conn: &Connection,
        id: CustomerId,
        lists: &[ShoppingList],
    ) -> RepoResult<()> {
        let id_text = id.to_string();
        conn.execute(
            "DELETE FROM customer_shopping_lists WHERE customer_id = ?1;",
            [id_text.as_str()],
        )?;
        for (position, list) in lists.iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO shopping_lists (id, products) VALUES (?1, ?2);",
                params![list.id.to_string(), encode_products(&list.products)?],
            )?;
            conn.execute(
                "INSERT INTO customer_shopping_lists (customer_id, position, shopping_list_id)
                 VALUES (?1, ?2, ?3);",
                params![id_text.as_str(), position as i64, list.id.to_string()],
            )?;
        }
        Ok(())
    }
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!(
                "{CUSTOMER_SELECT_SQL}
                 WHERE external_id = ?1
                 ORDER BY (master_external_id IS NULL) ASC, created_at ASC, rowid ASC
                 LIMIT 1;"
            ),
            external_id,
        )
    }

    fn find_by_master_external_id(&self, external_id: &str) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!(
                "{CUSTOMER_SELECT_SQL}
                 WHERE master_external_id = ?1
                   AND (external_id IS NULL OR external_id <> ?1)
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT 1;"
            ),
            external_id,
        )
    }

    fn find_by_company_number(&self, company_number: &str) -> RepoResult<Option<Customer>> {
        self.query_one(
            &format!(
                "{CUSTOMER_SELECT_SQL}
                 WHERE company_number = ?1
                 ORDER BY (master_external_id IS NULL) ASC, created_at ASC, rowid ASC
                 LIMIT 1;"
            ),
            company_number,
        )
    }

    fn create_customer(&self, customer: &Customer) -> RepoResult<Customer> {
        if let RecordState::Stored(id) = customer.state {
            return Err(RepoError::InvalidData(format!(
                "customer {id} is already stored; use update"
            )));
        }
        customer.validate()?;

        let id = Uuid::new_v4();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO customers (
                internal_id,
                external_id,
                master_external_id,
                customer_type,
                company_number,
                name,
                address_street,
                address_city,
                address_postal_code,
                preferred_store
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                id.to_string(),
                customer.external_id.as_deref(),
                customer.master_external_id.as_deref(),
                customer_type_to_db(customer.customer_type),
                customer.company_number.as_deref(),
                customer.name.as_deref(),
                customer.address.as_ref().map(|a| a.street.as_str()),
                customer.address.as_ref().map(|a| a.city.as_str()),
                customer.address.as_ref().map(|a| a.postal_code.as_str()),
                customer.preferred_store.as_deref(),
            ],
        )?;
        self.write_shopping_list_links(&tx, id, &customer.shopping_lists)?;
        tx.commit()?;

        let mut created = customer.clone();
        created.state = RecordState::Stored(id);
        Ok(created)
    }

    fn update_customer(&self, customer: &Customer) -> RepoResult<Customer> {
        let RecordState::Stored(id) = customer.state else {
            return Err(RepoError::InvalidData(
                "cannot update a customer that was never created".to_string(),
            ));
        };
        customer.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE customers
             SET
                external_id = ?2,
                master_external_id = ?3,
                customer_type = ?4,
                company_number = ?5,
                name = ?6,
                address_street = ?7,
                address_city = ?8,
                address_postal_code = ?9,
                preferred_store = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE internal_id = ?1;",
            params![
                id.to_string(),
                customer.external_id.as_deref(),
                customer.master_external_id.as_deref(),
                customer_type_to_db(customer.customer_type),
                customer.company_number.as_deref(),
                customer.name.as_deref(),
                customer.address.as_ref().map(|a| a.street.as_str()),
                customer.address.as_ref().map(|a| a.city.as_str()),
                customer.address.as_ref().map(|a| a.postal_code.as_str()),
                customer.preferred_store.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        self.write_shopping_list_links(&tx, id, &customer.shopping_lists)?;
        tx.commit()?;

        Ok(customer.clone())
    }

    fn update_shopping_list(&self, list: &ShoppingList) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO shopping_lists (id, products) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET
                products = excluded.products,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![list.id.to_string(), encode_products(&list.products)?],
        )?;
        Ok(())
    }
}

fn customer_type_to_db(kind: Option<CustomerType>) -> Option<&'static str> {
    kind.map(|kind| match kind {
        CustomerType::Person => "person",
        CustomerType::Company => "company",
    })
}

fn parse_customer_type(value: &str) -> Option<CustomerType> {
    match value {
        "person" => Some(CustomerType::Person),
        "company" => Some(CustomerType::Company),
        _ => None,
    }
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn encode_products(products: &[String]) -> RepoResult<String> {
    serde_json::to_string(products)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode products: {err}")))
}

fn decode_products(value: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid products `{value}` in shopping_lists: {err}"))
    })
}

fn ensure_customer_connection_ready(conn: &Connection) -> RepoResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        (
            "customers",
            &[
                "internal_id",
                "external_id",
                "master_external_id",
                "customer_type",
                "company_number",
                "name",
                "address_street",
                "address_city",
                "address_postal_code",
                "preferred_store",
                "created_at",
                "updated_at",
            ],
        ),
        ("shopping_lists", &["id", "products", "updated_at"]),
        (
            "customer_shopping_lists",
            &["customer_id", "position", "shopping_list_id"],
        ),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{decode_products, encode_products, parse_customer_type, RepoError};
    use crate::model::customer::CustomerType;

    #[test]
    fn customer_type_parsing_rejects_unknown_values() {
        assert_eq!(parse_customer_type("company"), Some(CustomerType::Company));
        assert_eq!(parse_customer_type("person"), Some(CustomerType::Person));
        assert_eq!(parse_customer_type("Company"), None);
    }

    #[test]
    fn products_keep_order_through_json_column() {
        let products = vec!["eggs".to_string(), "flour".to_string(), "eggs".to_string()];
        let encoded = encode_products(&products).expect("products should encode");
        assert_eq!(decode_products(&encoded).expect("should decode"), products);
    }

    #[test]
    fn malformed_products_column_is_invalid_data() {
        let err = decode_products("not json").expect_err("must reject malformed json");
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
