use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use ordermgmt_core::{
    ClientId, Money, OrderId, OrderLineId, PersistenceError, PersistenceResult, ProductId,
};
use ordermgmt_sales::{LineAmounts, Order, OrderLine, OrderQueries, OrderStore};

use super::{decode_error, map_sqlx_error, PgTransaction};

/// Order header and line tables.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore<PgTransaction> for PgOrderStore {
    #[instrument(skip(self, tx), fields(client_id = %client_id), err)]
    async fn create_header(
        &self,
        tx: &mut PgTransaction,
        client_id: ClientId,
        created_at: DateTime<Utc>,
    ) -> PersistenceResult<OrderId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (client_id, created_at, subtotal, tax, total)
            VALUES ($1, $2, 0, 0, 0)
            RETURNING order_id
            "#,
        )
        .bind(client_id.get())
        .bind(created_at)
        .fetch_one(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("create_order_header", e))?;

        Ok(OrderId::from_raw(id))
    }

    #[instrument(skip(self, tx, amounts), fields(order_id = %order_id, product_id = %product_id), err)]
    async fn add_line(
        &self,
        tx: &mut PgTransaction,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        amounts: &LineAmounts,
    ) -> PersistenceResult<OrderLineId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO order_lines (order_id, product_id, quantity, subtotal, tax, total)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING line_id
            "#,
        )
        .bind(order_id.get())
        .bind(product_id.get())
        .bind(quantity)
        .bind(amounts.subtotal.amount())
        .bind(amounts.tax.amount())
        .bind(amounts.total.amount())
        .fetch_one(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("add_order_line", e))?;

        Ok(OrderLineId::from_raw(id))
    }

    #[instrument(skip(self, tx, totals), fields(order_id = %order_id, total = %totals.total), err)]
    async fn update_totals(
        &self,
        tx: &mut PgTransaction,
        order_id: OrderId,
        totals: &LineAmounts,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET subtotal = $2, tax = $3, total = $4
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.get())
        .bind(totals.subtotal.amount())
        .bind(totals.tax.amount())
        .bind(totals.total.amount())
        .execute(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("update_order_totals", e))?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::Query(format!(
                "order {order_id} vanished before its totals were written"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for PgOrderStore {
    #[instrument(skip(self), err)]
    async fn list_orders(&self) -> PersistenceResult<Vec<Order>> {
        let headers = sqlx::query(
            r#"
            SELECT order_id, client_id, created_at, subtotal, tax, total
            FROM orders
            ORDER BY order_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let line_rows = sqlx::query(
            r#"
            SELECT line_id, order_id, product_id, quantity, subtotal, tax, total
            FROM order_lines
            ORDER BY line_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_order_lines", e))?;

        let mut lines_by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let line: OrderLine = OrderLineRow::from_row(row)
                .map_err(|e| decode_error("list_order_lines", e))?
                .into();
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        headers
            .iter()
            .map(|row| -> PersistenceResult<Order> {
                let header = OrderRow::from_row(row).map_err(|e| decode_error("list_orders", e))?;
                let lines = lines_by_order
                    .remove(&OrderId::from_raw(header.order_id))
                    .unwrap_or_default();
                Ok(header.into_order(lines))
            })
            .collect()
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn find_order(&self, id: OrderId) -> PersistenceResult<Option<Order>> {
        let header = sqlx::query(
            r#"
            SELECT order_id, client_id, created_at, subtotal, tax, total
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_order", e))?;

        let Some(header) = header else {
            return Ok(None);
        };
        let header = OrderRow::from_row(&header).map_err(|e| decode_error("find_order", e))?;

        let line_rows = sqlx::query(
            r#"
            SELECT line_id, order_id, product_id, quantity, subtotal, tax, total
            FROM order_lines
            WHERE order_id = $1
            ORDER BY line_id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_order_lines", e))?;

        let lines = line_rows
            .iter()
            .map(|r| OrderLineRow::from_row(r).map(OrderLine::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_error("find_order_lines", e))?;

        Ok(Some(header.into_order(lines)))
    }
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    order_id: i64,
    client_id: i64,
    created_at: DateTime<Utc>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId::from_raw(self.order_id),
            client_id: ClientId::from_raw(self.client_id),
            created_at: self.created_at,
            subtotal: Money::new(self.subtotal),
            tax: Money::new(self.tax),
            total: Money::new(self.total),
            lines,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            order_id: row.try_get("order_id")?,
            client_id: row.try_get("client_id")?,
            created_at: row.try_get("created_at")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            total: row.try_get("total")?,
        })
    }
}

#[derive(Debug)]
struct OrderLineRow {
    line_id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for OrderLineRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineRow {
            line_id: row.try_get("line_id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            subtotal: row.try_get("subtotal")?,
            tax: row.try_get("tax")?,
            total: row.try_get("total")?,
        })
    }
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: OrderLineId::from_raw(row.line_id),
            order_id: OrderId::from_raw(row.order_id),
            product_id: ProductId::from_raw(row.product_id),
            quantity: row.quantity,
            subtotal: Money::new(row.subtotal),
            tax: Money::new(row.tax),
            total: Money::new(row.total),
        }
    }
}
