use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use ordermgmt_clients::{Client, ClientDetails, ClientDirectory, ClientRepository};
use ordermgmt_core::{ClientId, PersistenceResult};

use super::{decode_error, map_sqlx_error};

/// Client table access.
#[derive(Debug, Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientDirectory for PgClientStore {
    #[instrument(skip(self), fields(client_id = %id), err)]
    async fn find_by_id(&self, id: ClientId) -> PersistenceResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT client_id, name, identity, created_at
            FROM clients
            WHERE client_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_client", e))?;

        row.map(|r| ClientRow::from_row(&r).map(Client::from))
            .transpose()
            .map_err(|e| decode_error("find_client", e))
    }
}

#[async_trait]
impl ClientRepository for PgClientStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> PersistenceResult<Vec<Client>> {
        let rows = sqlx::query(
            r#"
            SELECT client_id, name, identity, created_at
            FROM clients
            ORDER BY client_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_clients", e))?;

        rows.iter()
            .map(|r| ClientRow::from_row(r).map(Client::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_error("list_clients", e))
    }

    #[instrument(skip(self), err)]
    async fn find_by_identity(&self, identity: &str) -> PersistenceResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            SELECT client_id, name, identity, created_at
            FROM clients
            WHERE identity = $1
            "#,
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_client_by_identity", e))?;

        row.map(|r| ClientRow::from_row(&r).map(Client::from))
            .transpose()
            .map_err(|e| decode_error("find_client_by_identity", e))
    }

    #[instrument(skip(self, details), fields(identity = %details.identity), err)]
    async fn insert(&self, details: &ClientDetails) -> PersistenceResult<Client> {
        let row = sqlx::query(
            r#"
            INSERT INTO clients (name, identity)
            VALUES ($1, $2)
            RETURNING client_id, name, identity, created_at
            "#,
        )
        .bind(&details.name)
        .bind(&details.identity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_client", e))?;

        ClientRow::from_row(&row)
            .map(Client::from)
            .map_err(|e| decode_error("insert_client", e))
    }

    #[instrument(skip(self, details), fields(client_id = %id), err)]
    async fn update(&self, id: ClientId, details: &ClientDetails) -> PersistenceResult<Option<Client>> {
        let row = sqlx::query(
            r#"
            UPDATE clients
            SET name = $2, identity = $3
            WHERE client_id = $1
            RETURNING client_id, name, identity, created_at
            "#,
        )
        .bind(id.get())
        .bind(&details.name)
        .bind(&details.identity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;

        row.map(|r| ClientRow::from_row(&r).map(Client::from))
            .transpose()
            .map_err(|e| decode_error("update_client", e))
    }

    #[instrument(skip(self), fields(client_id = %id), err)]
    async fn delete(&self, id: ClientId) -> PersistenceResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug)]
struct ClientRow {
    client_id: i64,
    name: String,
    identity: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ClientRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ClientRow {
            client_id: row.try_get("client_id")?,
            name: row.try_get("name")?,
            identity: row.try_get("identity")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: ClientId::from_raw(row.client_id),
            name: row.name,
            identity: row.identity,
            created_at: row.created_at,
        }
    }
}
