//! Customer store abstraction and backends.
//!
//! # Backends
//!
//! - [`PgCustomerStore`] - `PostgreSQL` (`crm` schema), used in production
//! - [`MemoryCustomerStore`] - in-process maps, used by tests and local runs
//!
//! # Tables
//!
//! - `crm.customer` - Customer records, primary key `(tenant_id, id)`, with a
//!   unique index on `share_code` spanning all tenants
//! - `crm.visit` - Visit child records
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and are NOT run on
//! startup. Apply them with [`run_migrations`] (`salon-crm-share migrate`).

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use salon_crm_core::{CustomerId, DisplayName, PhoneTail, ShareCode, TenantId, VisitId};

use crate::models::{Customer, SharePasswordHash, Visit};

pub use memory::MemoryCustomerStore;
pub use postgres::PgCustomerStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation (permissions, configuration). Fatal.
    #[error("store denied: {0}")]
    Denied(String),

    /// A conditional write found an existing document.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested document was not found.
    #[error("not found")]
    NotFound,

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// SQLSTATE codes that indicate a transient failure.
const TRANSIENT_SQLSTATES: &[&str] = &["57014", "40001", "40P01", "53300", "57P01"];

/// SQLSTATE for insufficient privilege.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::DataCorruption(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                if db_err.is_unique_violation() {
                    Self::Conflict(db_err.message().to_owned())
                } else if code.starts_with("08") || TRANSIENT_SQLSTATES.contains(&code.as_str())
                {
                    Self::Unavailable(err.to_string())
                } else if code == INSUFFICIENT_PRIVILEGE {
                    Self::Denied(err.to_string())
                } else {
                    Self::Denied(format!("database error {code}: {}", db_err.message()))
                }
            }
            _ => Self::Denied(err.to_string()),
        }
    }
}

/// Profile fields to overwrite on a customer. `None` leaves a field untouched.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: Option<DisplayName>,
    pub phone: Option<PhoneTail>,
    pub memo: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

/// A write to the share fields of one customer.
#[derive(Debug, Clone)]
pub enum ShareWrite {
    /// Replace the token and password hash and enable the share.
    Issue {
        code: ShareCode,
        password_hash: Option<SharePasswordHash>,
        issued_at: DateTime<Utc>,
    },
    /// Re-enable a previously issued token.
    Enable,
    /// Stop the token from resolving, keeping it on the record.
    Disable,
}

/// Persistent customer storage.
///
/// All implementations must satisfy these invariants:
/// - `insert_customer` is a conditional create: it never overwrites an
///   existing `(tenant, id)` document and reports `Conflict` instead.
/// - A share code is present on at most one customer across all tenants;
///   `write_share` reports `Conflict` when issuing a code already in use.
/// - `find_by_share_code` only returns customers whose share is enabled and
///   whose current code equals the argument.
/// - Visit reads are scoped to the given tenant and customer.
/// - Transient failures surface as `StoreError::Unavailable`.
pub trait CustomerStore: Send + Sync + 'static {
    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All customer identifiers of one tenant.
    fn list_customer_ids(
        &self,
        tenant: &TenantId,
    ) -> impl Future<Output = Result<Vec<CustomerId>, StoreError>> + Send;

    /// Read one customer.
    fn get_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, StoreError>> + Send;

    /// Create a customer if no document exists at its `(tenant, id)`.
    fn insert_customer(
        &self,
        customer: &Customer,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite profile fields. `NotFound` if the customer does not exist.
    fn update_profile(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Hard-delete a customer. Returns whether it existed.
    fn delete_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Write share fields. `NotFound` if the customer (or, for `Enable`, its
    /// token) does not exist.
    fn write_share(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        write: &ShareWrite,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Find the customer holding an enabled share with exactly this code,
    /// in any tenant.
    fn find_by_share_code(
        &self,
        code: &ShareCode,
    ) -> impl Future<Output = Result<Option<Customer>, StoreError>> + Send;

    /// Read one visit of one customer.
    fn find_visit(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        visit: VisitId,
    ) -> impl Future<Output = Result<Option<Visit>, StoreError>> + Send;

    /// Most recent completed visits of one customer, newest first.
    fn list_completed_visits(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Visit>, StoreError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `acquire_timeout` - How long a store call may wait for a connection
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// A database error carrying only a SQLSTATE.
    #[derive(Debug)]
    struct FakeDbError {
        code: &'static str,
        unique: bool,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.code)
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    fn database(code: &'static str) -> StoreError {
        let unique = code == "23505";
        StoreError::from(sqlx::Error::Database(Box::new(FakeDbError { code, unique })))
    }

    #[test]
    fn test_connection_failures_are_unavailable() {
        for err in [
            sqlx::Error::PoolTimedOut,
            sqlx::Error::PoolClosed,
            sqlx::Error::Io(std::io::Error::other("connection reset")),
            sqlx::Error::WorkerCrashed,
        ] {
            let mapped = StoreError::from(err);
            assert!(matches!(mapped, StoreError::Unavailable(_)), "{mapped:?}");
            assert!(mapped.is_transient());
        }
    }

    #[test]
    fn test_missing_row_and_bad_data() {
        assert!(matches!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound));
        assert!(matches!(
            StoreError::from(sqlx::Error::Decode("not a tenant id".into())),
            StoreError::DataCorruption(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::ColumnDecode {
                index: "phone".to_string(),
                source: "too long".into(),
            }),
            StoreError::DataCorruption(_)
        ));
    }

    #[test]
    fn test_sqlstate_mapping() {
        assert!(matches!(database("23505"), StoreError::Conflict(_)));
        assert!(matches!(database("08006"), StoreError::Unavailable(_)));
        assert!(matches!(database("40001"), StoreError::Unavailable(_)));

        let denied = database("42501");
        assert!(matches!(denied, StoreError::Denied(_)));
        assert!(!denied.is_transient());
        assert!(matches!(database("42P01"), StoreError::Denied(_)));
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::Conflict("dup".into()).is_transient());
        assert!(!StoreError::NotFound.is_transient());
        assert!(!StoreError::DataCorruption("x".into()).is_transient());
    }
}
