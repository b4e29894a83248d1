use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use ordermgmt_clients::{Client, ClientDetails, ClientDirectory, ClientRepository};
use ordermgmt_core::{
    ClientId, Money, OrderId, OrderLineId, PersistenceError, PersistenceResult, ProductId,
    TransactionScope, TransactionSource,
};
use ordermgmt_products::{Product, ProductCatalog, ProductDetails, ProductRepository, StockDecrement};
use ordermgmt_sales::{LineAmounts, Order, OrderLine, OrderQueries, OrderStore};

#[derive(Debug, Clone)]
struct OrderHeader {
    client_id: ClientId,
    created_at: DateTime<Utc>,
    totals: LineAmounts,
}

#[derive(Debug, Clone, Default)]
struct State {
    clients: BTreeMap<ClientId, Client>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, OrderHeader>,
    lines: BTreeMap<OrderLineId, OrderLine>,
    last_client_id: i64,
    last_product_id: i64,
    last_order_id: i64,
    last_line_id: i64,
}

impl State {
    fn assemble(&self, id: OrderId, header: &OrderHeader) -> Order {
        Order {
            id,
            client_id: header.client_id,
            created_at: header.created_at,
            subtotal: header.totals.subtotal,
            tax: header.totals.tax,
            total: header.totals.total,
            lines: self
                .lines
                .values()
                .filter(|l| l.order_id == id)
                .cloned()
                .collect(),
        }
    }

    fn identity_taken(&self, identity: &str, except: Option<ClientId>) -> bool {
        self.clients
            .values()
            .any(|c| c.identity == identity && Some(c.id) != except)
    }
}

/// Process-local database implementing every storage port.
///
/// Intended for tests/dev. Transactions take an exclusive lock on the whole
/// state and keep a snapshot to restore on rollback, so they are fully
/// serialized: a conditional stock decrement can never interleave with another
/// transaction's.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<State>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Exclusive transaction over an [`InMemoryDatabase`].
///
/// Dropping it without calling `commit` restores the state captured at `begin`.
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<State>,
    snapshot: Option<State>,
}

impl InMemoryTransaction {
    fn state(&mut self) -> &mut State {
        &mut self.state
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.state = snapshot;
        }
    }
}

#[async_trait]
impl TransactionScope for InMemoryTransaction {
    async fn commit(mut self) -> PersistenceResult<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> PersistenceResult<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}

#[async_trait]
impl TransactionSource for InMemoryDatabase {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> PersistenceResult<InMemoryTransaction> {
        let state = self.state.clone().lock_owned().await;
        let snapshot = state.clone();
        Ok(InMemoryTransaction {
            state,
            snapshot: Some(snapshot),
        })
    }
}

#[async_trait]
impl ClientDirectory for InMemoryDatabase {
    async fn find_by_id(&self, id: ClientId) -> PersistenceResult<Option<Client>> {
        Ok(self.state.lock().await.clients.get(&id).cloned())
    }
}

#[async_trait]
impl ClientRepository for InMemoryDatabase {
    async fn list(&self) -> PersistenceResult<Vec<Client>> {
        Ok(self.state.lock().await.clients.values().cloned().collect())
    }

    async fn find_by_identity(&self, identity: &str) -> PersistenceResult<Option<Client>> {
        let state = self.state.lock().await;
        Ok(state.clients.values().find(|c| c.identity == identity).cloned())
    }

    async fn insert(&self, details: &ClientDetails) -> PersistenceResult<Client> {
        let mut state = self.state.lock().await;
        if state.identity_taken(&details.identity, None) {
            return Err(PersistenceError::Conflict(format!(
                "identity {} is already registered",
                details.identity
            )));
        }
        state.last_client_id += 1;
        let client = Client {
            id: ClientId::from_raw(state.last_client_id),
            name: details.name.clone(),
            identity: details.identity.clone(),
            created_at: Utc::now().trunc_subsecs(6),
        };
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn update(&self, id: ClientId, details: &ClientDetails) -> PersistenceResult<Option<Client>> {
        let mut state = self.state.lock().await;
        if !state.clients.contains_key(&id) {
            return Ok(None);
        }
        if state.identity_taken(&details.identity, Some(id)) {
            return Err(PersistenceError::Conflict(format!(
                "identity {} is already registered",
                details.identity
            )));
        }
        let Some(client) = state.clients.get_mut(&id) else {
            return Ok(None);
        };
        client.name = details.name.clone();
        client.identity = details.identity.clone();
        Ok(Some(client.clone()))
    }

    async fn delete(&self, id: ClientId) -> PersistenceResult<bool> {
        let mut state = self.state.lock().await;
        if !state.clients.contains_key(&id) {
            return Ok(false);
        }
        if state.orders.values().any(|o| o.client_id == id) {
            return Err(PersistenceError::Conflict(format!(
                "client {id} has orders"
            )));
        }
        state.clients.remove(&id);
        Ok(true)
    }
}

/// The `products` table's column checks: positive price within `NUMERIC(18,2)`,
/// non-negative stock.
fn check_product_columns(details: &ProductDetails) -> PersistenceResult<()> {
    if !details.unit_price.is_positive() || !details.unit_price.is_storable() {
        return Err(PersistenceError::Constraint(format!(
            "unit_price {} is outside (0, {}]",
            details.unit_price,
            Money::MAX_STORABLE
        )));
    }
    if details.stock < 0 {
        return Err(PersistenceError::Constraint(format!(
            "stock cannot be negative, got {}",
            details.stock
        )));
    }
    Ok(())
}

#[async_trait]
impl ProductRepository for InMemoryDatabase {
    async fn list(&self) -> PersistenceResult<Vec<Product>> {
        Ok(self.state.lock().await.products.values().cloned().collect())
    }

    async fn get(&self, id: ProductId) -> PersistenceResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn insert(&self, details: &ProductDetails) -> PersistenceResult<Product> {
        check_product_columns(details)?;
        let mut state = self.state.lock().await;
        state.last_product_id += 1;
        let product = Product {
            id: ProductId::from_raw(state.last_product_id),
            name: details.name.clone(),
            description: details.description.clone(),
            unit_price: details.unit_price,
            stock: details.stock,
            created_at: Utc::now().trunc_subsecs(6),
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: ProductId, details: &ProductDetails) -> PersistenceResult<Option<Product>> {
        check_product_columns(details)?;
        let mut state = self.state.lock().await;
        let Some(product) = state.products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = details.name.clone();
        product.description = details.description.clone();
        product.unit_price = details.unit_price;
        product.stock = details.stock;
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: ProductId) -> PersistenceResult<bool> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&id) {
            return Ok(false);
        }
        if state.lines.values().any(|l| l.product_id == id) {
            return Err(PersistenceError::Conflict(format!(
                "product {id} is referenced by order lines"
            )));
        }
        state.products.remove(&id);
        Ok(true)
    }
}

#[async_trait]
impl ProductCatalog<InMemoryTransaction> for InMemoryDatabase {
    async fn find_by_id(
        &self,
        tx: &mut InMemoryTransaction,
        id: ProductId,
    ) -> PersistenceResult<Option<Product>> {
        Ok(tx.state().products.get(&id).cloned())
    }

    async fn decrement_stock(
        &self,
        tx: &mut InMemoryTransaction,
        id: ProductId,
        quantity: i32,
    ) -> PersistenceResult<StockDecrement> {
        let Some(product) = tx.state().products.get_mut(&id) else {
            return Ok(StockDecrement::Missing);
        };
        if !product.has_stock_for(quantity) {
            return Ok(StockDecrement::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(StockDecrement::Applied {
            remaining: product.stock,
            unit_price: product.unit_price,
        })
    }
}

#[async_trait]
impl OrderStore<InMemoryTransaction> for InMemoryDatabase {
    async fn create_header(
        &self,
        tx: &mut InMemoryTransaction,
        client_id: ClientId,
        created_at: DateTime<Utc>,
    ) -> PersistenceResult<OrderId> {
        let state = tx.state();
        if !state.clients.contains_key(&client_id) {
            return Err(PersistenceError::Conflict(format!(
                "client {client_id} does not exist"
            )));
        }
        state.last_order_id += 1;
        let id = OrderId::from_raw(state.last_order_id);
        state.orders.insert(
            id,
            OrderHeader {
                client_id,
                created_at,
                totals: LineAmounts::ZERO,
            },
        );
        Ok(id)
    }

    async fn add_line(
        &self,
        tx: &mut InMemoryTransaction,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
        amounts: &LineAmounts,
    ) -> PersistenceResult<OrderLineId> {
        let state = tx.state();
        if !state.orders.contains_key(&order_id) {
            return Err(PersistenceError::Conflict(format!(
                "order {order_id} does not exist"
            )));
        }
        if !state.products.contains_key(&product_id) {
            return Err(PersistenceError::Conflict(format!(
                "product {product_id} does not exist"
            )));
        }
        if quantity <= 0 {
            return Err(PersistenceError::Constraint(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        state.last_line_id += 1;
        let id = OrderLineId::from_raw(state.last_line_id);
        state.lines.insert(
            id,
            OrderLine {
                id,
                order_id,
                product_id,
                quantity,
                subtotal: amounts.subtotal,
                tax: amounts.tax,
                total: amounts.total,
            },
        );
        Ok(id)
    }

    async fn update_totals(
        &self,
        tx: &mut InMemoryTransaction,
        order_id: OrderId,
        totals: &LineAmounts,
    ) -> PersistenceResult<()> {
        let header = tx
            .state()
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| PersistenceError::Query(format!("order {order_id} does not exist")))?;
        header.totals = *totals;
        Ok(())
    }
}

#[async_trait]
impl OrderQueries for InMemoryDatabase {
    async fn list_orders(&self) -> PersistenceResult<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .map(|(id, header)| state.assemble(*id, header))
            .collect())
    }

    async fn find_order(&self, id: OrderId) -> PersistenceResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|header| state.assemble(id, header)))
    }
}
