use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use ordermgmt_core::{Money, PersistenceResult, ProductId};
use ordermgmt_products::{Product, ProductCatalog, ProductDetails, ProductRepository, StockDecrement};

use super::{decode_error, map_sqlx_error, PgTransaction};

/// Product table access, both standalone and under an order transaction.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> PersistenceResult<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, name, description, unit_price, stock, created_at
            FROM products
            ORDER BY product_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter()
            .map(|r| ProductRow::from_row(r).map(Product::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decode_error("list_products", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> PersistenceResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, name, description, unit_price, stock, created_at
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map(Product::from))
            .transpose()
            .map_err(|e| decode_error("get_product", e))
    }

    #[instrument(skip(self, details), fields(name = %details.name), err)]
    async fn insert(&self, details: &ProductDetails) -> PersistenceResult<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, unit_price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING product_id, name, description, unit_price, stock, created_at
            "#,
        )
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.unit_price.amount())
        .bind(details.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        ProductRow::from_row(&row)
            .map(Product::from)
            .map_err(|e| decode_error("insert_product", e))
    }

    #[instrument(skip(self, details), fields(product_id = %id), err)]
    async fn update(&self, id: ProductId, details: &ProductDetails) -> PersistenceResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, unit_price = $4, stock = $5
            WHERE product_id = $1
            RETURNING product_id, name, description, unit_price, stock, created_at
            "#,
        )
        .bind(id.get())
        .bind(&details.name)
        .bind(&details.description)
        .bind(details.unit_price.amount())
        .bind(details.stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map(Product::from))
            .transpose()
            .map_err(|e| decode_error("update_product", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete(&self, id: ProductId) -> PersistenceResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductCatalog<PgTransaction> for PgProductStore {
    #[instrument(skip(self, tx), fields(product_id = %id), err)]
    async fn find_by_id(
        &self,
        tx: &mut PgTransaction,
        id: ProductId,
    ) -> PersistenceResult<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, name, description, unit_price, stock, created_at
            FROM products
            WHERE product_id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.map(|r| ProductRow::from_row(&r).map(Product::from))
            .transpose()
            .map_err(|e| decode_error("find_product", e))
    }

    #[instrument(skip(self, tx), fields(product_id = %id), err)]
    async fn decrement_stock(
        &self,
        tx: &mut PgTransaction,
        id: ProductId,
        quantity: i32,
    ) -> PersistenceResult<StockDecrement> {
        let applied = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE product_id = $1 AND stock >= $2
            RETURNING stock, unit_price
            "#,
        )
        .bind(id.get())
        .bind(quantity)
        .fetch_optional(tx.conn())
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        if let Some(row) = applied {
            let remaining: i32 = row
                .try_get("stock")
                .map_err(|e| decode_error("decrement_stock", e))?;
            let unit_price: Decimal = row
                .try_get("unit_price")
                .map_err(|e| decode_error("decrement_stock", e))?;
            return Ok(StockDecrement::Applied {
                remaining,
                unit_price: Money::new(unit_price),
            });
        }

        // Nothing updated: either the product is gone or stock is short.
        let current: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE product_id = $1")
            .bind(id.get())
            .fetch_optional(tx.conn())
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        Ok(match current {
            Some(available) => StockDecrement::Insufficient { available },
            None => StockDecrement::Missing,
        })
    }
}

#[derive(Debug)]
struct ProductRow {
    product_id: i64,
    name: String,
    description: String,
    unit_price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            product_id: row.try_get("product_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            unit_price: row.try_get("unit_price")?,
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_raw(row.product_id),
            name: row.name,
            description: row.description,
            unit_price: Money::new(row.unit_price),
            stock: row.stock,
            created_at: row.created_at,
        }
    }
}
