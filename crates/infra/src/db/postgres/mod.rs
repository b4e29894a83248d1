//! Postgres-backed storage.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `PersistenceError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | PersistenceError | Scenario |
//! |------------|----------------------|------------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate client identity |
//! | Database (foreign key violation) | `23503` | `Conflict` | Deleting a referenced client/product, dangling reference |
//! | Database (check constraint violation) | `23514` | `Constraint` | Negative stock, non-positive price or quantity |
//! | Database (numeric value out of range) | `22003` | `Constraint` | Amount wider than `NUMERIC(18,2)` |
//! | Database (other) | Any other | `Query` | Other database errors |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` | Backend unreachable |
//! | Decode / ColumnDecode / ColumnNotFound | N/A | `Decode` | Row shape mismatch |
//! | Other | N/A | `Query` | Anything else |
//!
//! ## Concurrency
//!
//! Stock is decremented with a single conditional `UPDATE ... WHERE stock >= $n`.
//! Concurrent decrements of the same row serialize on the row lock, and the
//! losing statement re-evaluates the predicate against the committed value.

mod clients;
mod orders;
mod products;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use ordermgmt_core::{PersistenceError, PersistenceResult, TransactionScope, TransactionSource};

pub use clients::PgClientStore;
pub use orders::PgOrderStore;
pub use products::PgProductStore;

const SCHEMA: &str = include_str!("../../../migrations/0001_order_management.sql");

/// Connection pool plus the transaction source for order creation.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(url), err)]
    pub async fn connect(url: &str, max_connections: u32) -> PersistenceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema. Safe to run repeatedly.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> PersistenceResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn clients(&self) -> PgClientStore {
        PgClientStore::new(self.pool.clone())
    }

    pub fn products(&self) -> PgProductStore {
        PgProductStore::new(self.pool.clone())
    }

    pub fn orders(&self) -> PgOrderStore {
        PgOrderStore::new(self.pool.clone())
    }
}

/// An open Postgres transaction.
///
/// `sqlx` rolls back a transaction that is dropped without commit.
pub struct PgTransaction {
    inner: Transaction<'static, Postgres>,
}

impl PgTransaction {
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        &mut self.inner
    }
}

#[async_trait]
impl TransactionScope for PgTransaction {
    async fn commit(self) -> PersistenceResult<()> {
        self.inner
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> PersistenceResult<()> {
        self.inner
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl TransactionSource for PgDatabase {
    type Tx = PgTransaction;

    async fn begin(&self) -> PersistenceResult<PgTransaction> {
        let inner = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgTransaction { inner })
    }
}

/// Map SQLx errors to `PersistenceError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => PersistenceError::Conflict(msg),
                Some("23514") | Some("22003") => PersistenceError::Constraint(msg),
                _ => PersistenceError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            PersistenceError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            PersistenceError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => PersistenceError::Unavailable(format!("io error in {}: {}", operation, e)),
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => {
            PersistenceError::Decode(format!("failed to decode row in {}: {}", operation, e))
        }
        e => PersistenceError::Query(format!("sqlx error in {}: {}", operation, e)),
    }
}

pub(crate) fn decode_error(operation: &str, err: sqlx::Error) -> PersistenceError {
    PersistenceError::Decode(format!("failed to deserialize row in {}: {}", operation, err))
}
