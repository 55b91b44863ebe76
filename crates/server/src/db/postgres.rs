//! `PostgreSQL` customer store.
//!
//! Queries are built at runtime (`sqlx::query_as`) against the `crm` schema.
//! The `(tenant_id, id)` primary key makes customer creation a conditional
//! insert, and the partial unique index on `share_code` enforces token
//! uniqueness across tenants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use salon_crm_core::{
    CurrencyCode, CustomerId, DisplayName, PhoneTail, Price, ShareCode, TenantId, VisitId,
    VisitStatus,
};

use super::{CustomerStore, ProfileUpdate, ShareWrite, StoreError};
use crate::models::{Customer, ShareGrant, SharePasswordHash, Visit};

const CUSTOMER_COLUMNS: &str = "tenant_id, id, name, phone, memo, created_at, updated_at, \
     share_code, share_enabled, share_password_hash, share_created_at";

const VISIT_COLUMNS: &str = "id, tenant_id, customer_id, visited_at, menu, price_amount, \
     price_currency, status, note";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    tenant_id: TenantId,
    id: CustomerId,
    name: DisplayName,
    phone: PhoneTail,
    memo: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    share_code: Option<ShareCode>,
    share_enabled: bool,
    share_password_hash: Option<String>,
    share_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let share = match row.share_code {
            Some(code) => {
                let issued_at = row.share_created_at.ok_or_else(|| {
                    StoreError::DataCorruption(format!(
                        "customer {} has a share code without share_created_at",
                        row.id
                    ))
                })?;
                Some(ShareGrant {
                    code,
                    enabled: row.share_enabled,
                    password_hash: row.share_password_hash.map(SharePasswordHash::from_phc),
                    issued_at,
                })
            }
            None => None,
        };

        Ok(Self {
            tenant_id: row.tenant_id,
            id: row.id,
            name: row.name,
            phone: row.phone,
            memo: row.memo,
            created_at: row.created_at,
            updated_at: row.updated_at,
            share,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VisitRow {
    id: Uuid,
    tenant_id: TenantId,
    customer_id: CustomerId,
    visited_at: DateTime<Utc>,
    menu: String,
    price_amount: Option<Decimal>,
    price_currency: Option<String>,
    status: String,
    note: Option<String>,
}

impl TryFrom<VisitRow> for Visit {
    type Error = StoreError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let status: VisitStatus = row.status.parse().map_err(StoreError::DataCorruption)?;
        let price = match (row.price_amount, row.price_currency) {
            (Some(amount), Some(currency)) => {
                let currency: CurrencyCode =
                    currency.parse().map_err(StoreError::DataCorruption)?;
                Some(Price::new(amount, currency))
            }
            (None, None) => None,
            _ => {
                return Err(StoreError::DataCorruption(format!(
                    "visit {} has a partial price",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: VisitId::new(row.id),
            tenant_id: row.tenant_id,
            customer_id: row.customer_id,
            visited_at: row.visited_at,
            menu: row.menu,
            price,
            status,
            note: row.note,
        })
    }
}

/// Customer store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CustomerStore for PgCustomerStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_customer_ids(&self, tenant: &TenantId) -> Result<Vec<CustomerId>, StoreError> {
        let ids = sqlx::query_scalar::<_, CustomerId>(
            "SELECT id FROM crm.customer WHERE tenant_id = $1",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn get_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM crm.customer WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let share = customer.share.as_ref();
        let result = sqlx::query(&format!(
            r"
            INSERT INTO crm.customer ({CUSTOMER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tenant_id, id) DO NOTHING
            "
        ))
        .bind(&customer.tenant_id)
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.memo.as_deref())
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(share.map(|s| &s.code))
        .bind(share.is_some_and(|s| s.enabled))
        .bind(share.and_then(|s| s.password_hash.as_ref().map(SharePasswordHash::as_phc)))
        .bind(share.map(|s| s.issued_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "customer {} already exists",
                customer.id
            )));
        }

        Ok(())
    }

    async fn update_profile(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE crm.customer
            SET name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                memo = CASE WHEN $5 THEN $6 ELSE memo END,
                updated_at = $7
            WHERE tenant_id = $1 AND id = $2
            ",
        )
        .bind(tenant)
        .bind(id)
        .bind(update.name.as_ref())
        .bind(update.phone.as_ref())
        .bind(update.memo.is_some())
        .bind(update.memo.clone().flatten())
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete_customer(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM crm.customer WHERE tenant_id = $1 AND id = $2")
            .bind(tenant)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn write_share(
        &self,
        tenant: &TenantId,
        id: &CustomerId,
        write: &ShareWrite,
    ) -> Result<(), StoreError> {
        let query = match write {
            ShareWrite::Issue {
                code,
                password_hash,
                issued_at,
            } => sqlx::query(
                r"
                UPDATE crm.customer
                SET share_code = $3,
                    share_enabled = TRUE,
                    share_password_hash = $4,
                    share_created_at = $5,
                    updated_at = $5
                WHERE tenant_id = $1 AND id = $2
                ",
            )
            .bind(tenant)
            .bind(id)
            .bind(code)
            .bind(password_hash.as_ref().map(SharePasswordHash::as_phc))
            .bind(*issued_at),
            ShareWrite::Enable => sqlx::query(
                r"
                UPDATE crm.customer
                SET share_enabled = TRUE
                WHERE tenant_id = $1 AND id = $2 AND share_code IS NOT NULL
                ",
            )
            .bind(tenant)
            .bind(id),
            ShareWrite::Disable => sqlx::query(
                r"
                UPDATE crm.customer
                SET share_enabled = FALSE
                WHERE tenant_id = $1 AND id = $2
                ",
            )
            .bind(tenant)
            .bind(id),
        };

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn find_by_share_code(&self, code: &ShareCode) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM crm.customer \
             WHERE share_code = $1 AND share_enabled"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn find_visit(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        visit: VisitId,
    ) -> Result<Option<Visit>, StoreError> {
        let row = sqlx::query_as::<_, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM crm.visit \
             WHERE id = $1 AND tenant_id = $2 AND customer_id = $3"
        ))
        .bind(visit.as_uuid())
        .bind(tenant)
        .bind(customer)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Visit::try_from).transpose()
    }

    async fn list_completed_visits(
        &self,
        tenant: &TenantId,
        customer: &CustomerId,
        limit: u32,
    ) -> Result<Vec<Visit>, StoreError> {
        let rows = sqlx::query_as::<_, VisitRow>(&format!(
            "SELECT {VISIT_COLUMNS} FROM crm.visit \
             WHERE tenant_id = $1 AND customer_id = $2 AND status = 'completed' \
             ORDER BY visited_at DESC \
             LIMIT $3"
        ))
        .bind(tenant)
        .bind(customer)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Visit::try_from).collect()
    }
}
