//! Order persistence ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ordermgmt_core::{ClientId, OrderId, OrderLineId, PersistenceResult, ProductId};

use crate::order::Order;
use crate::pricing::LineAmounts;

/// Writes an order header and its lines under a caller-owned transaction.
///
/// All three operations take the same `&mut Tx` so the workflow can compose them
/// atomically with the catalog's stock decrement.
#[async_trait]
pub trait OrderStore<Tx: Send>: Send + Sync {
    /// Insert a header with zero totals. Returns the generated id.
    async fn create_header(
        &self,
        tx: &mut Tx,
        client_id: ClientId,
        created_at: DateTime<Utc>,
    ) -> PersistenceResult<OrderId>;

    async fn add_line(
        &self,
        tx: &mut Tx,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        amounts: &LineAmounts,
    ) -> PersistenceResult<OrderLineId>;

    async fn update_totals(
        &self,
        tx: &mut Tx,
        order_id: OrderId,
        totals: &LineAmounts,
    ) -> PersistenceResult<()>;
}

/// Read side for committed orders.
#[async_trait]
pub trait OrderQueries: Send + Sync {
    /// All orders with their lines, newest first.
    async fn list_orders(&self) -> PersistenceResult<Vec<Order>>;

    async fn find_order(&self, id: OrderId) -> PersistenceResult<Option<Order>>;
}
