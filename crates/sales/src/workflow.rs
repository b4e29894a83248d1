//! Order creation: the one operation that spans several collaborators.
//!
//! ```text
//! CreateOrder
//!   ↓
//! 1. Validate lines (non-empty, positive quantities)      -- no transaction
//!   ↓
//! 2. Resolve client                                       -- no transaction
//!   ↓
//! 3. begin
//!   ↓
//! 4. Insert header (zero totals)
//!   ↓
//! 5. Per line, in input order:
//!      find product → conditional stock decrement → price → insert line
//!      (a line amount outside the storable range aborts the order)
//!   ↓
//! 6. Write summed totals to the header
//!   ↓
//! 7. commit  (any error in 4–6: rollback, then return the error)
//! ```

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tracing::{error, info, instrument, warn};

use ordermgmt_clients::ClientDirectory;
use ordermgmt_core::{TransactionScope, TransactionSource};
use ordermgmt_products::{ProductCatalog, StockDecrement};

use crate::error::OrderError;
use crate::order::{CreateOrder, Order, OrderLine, OrderLineRequest};
use crate::pricing::{LineAmounts, PricingPolicy};
use crate::store::OrderStore;

/// Object-safe entry point, so callers can hold the workflow as
/// `Arc<dyn OrderPlacement>` without naming its collaborator types.
#[async_trait]
pub trait OrderPlacement: Send + Sync {
    async fn create_order(&self, command: CreateOrder) -> Result<Order, OrderError>;
}

/// Composes client lookup, catalog, pricing and order storage into one atomic
/// "create order" unit of work.
pub struct OrderWorkflow<D, C, P, S> {
    database: D,
    clients: C,
    catalog: P,
    orders: S,
    pricing: PricingPolicy,
}

impl<D, C, P, S> OrderWorkflow<D, C, P, S>
where
    D: TransactionSource,
    C: ClientDirectory,
    P: ProductCatalog<D::Tx>,
    S: OrderStore<D::Tx>,
{
    pub fn new(database: D, clients: C, catalog: P, orders: S) -> Self {
        Self {
            database,
            clients,
            catalog,
            orders,
            pricing: PricingPolicy,
        }
    }

    /// Create an order, all-or-nothing.
    ///
    /// On success the returned order carries its generated ids and derived
    /// totals. On failure nothing has been persisted and no stock has moved.
    #[instrument(
        skip(self, command),
        fields(client_id = %command.client_id, line_count = command.lines.len()),
        err
    )]
    pub async fn create_order(&self, command: CreateOrder) -> Result<Order, OrderError> {
        validate_lines(&command.lines)?;

        if self.clients.find_by_id(command.client_id).await?.is_none() {
            return Err(OrderError::ClientNotFound(command.client_id));
        }

        let mut tx = self.database.begin().await?;

        match self.write_order(&mut tx, &command).await {
            Ok(order) => {
                tx.commit().await?;
                info!(order_id = %order.id, total = %order.total, "order committed");
                Ok(order)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // The transaction is dropped either way; backends roll back on drop.
                    error!(error = %rollback_err, "explicit rollback failed");
                }
                warn!(error = %err, "order rolled back");
                Err(err)
            }
        }
    }

    async fn write_order(&self, tx: &mut D::Tx, command: &CreateOrder) -> Result<Order, OrderError> {
        // Postgres keeps microseconds; truncate so the returned order matches a reload.
        let created_at = Utc::now().trunc_subsecs(6);
        let order_id = self
            .orders
            .create_header(tx, command.client_id, created_at)
            .await?;

        let mut lines = Vec::with_capacity(command.lines.len());
        for request in &command.lines {
            let product = self
                .catalog
                .find_by_id(tx, request.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(request.product_id))?;

            let unit_price = match self
                .catalog
                .decrement_stock(tx, product.id, request.quantity)
                .await?
            {
                StockDecrement::Applied { unit_price, .. } => unit_price,
                StockDecrement::Insufficient { available } => {
                    return Err(OrderError::InsufficientStock {
                        product_id: product.id,
                        available,
                        requested: request.quantity,
                    });
                }
                StockDecrement::Missing => return Err(OrderError::ProductNotFound(product.id)),
            };

            let amounts = self
                .pricing
                .compute(request.quantity, unit_price)
                .ok_or(OrderError::LineAmountOutOfRange {
                    product_id: product.id,
                    quantity: request.quantity,
                })?;
            let line_id = self
                .orders
                .add_line(tx, order_id, product.id, request.quantity, &amounts)
                .await?;

            lines.push(OrderLine {
                id: line_id,
                order_id,
                product_id: product.id,
                quantity: request.quantity,
                subtotal: amounts.subtotal,
                tax: amounts.tax,
                total: amounts.total,
            });
        }

        let totals = LineAmounts::checked_sum(lines.iter().map(OrderLine::amounts))
            .ok_or(OrderError::OrderTotalOutOfRange)?;
        self.orders.update_totals(tx, order_id, &totals).await?;

        Ok(Order {
            id: order_id,
            client_id: command.client_id,
            created_at,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            lines,
        })
    }
}

#[async_trait]
impl<D, C, P, S> OrderPlacement for OrderWorkflow<D, C, P, S>
where
    D: TransactionSource,
    C: ClientDirectory,
    P: ProductCatalog<D::Tx>,
    S: OrderStore<D::Tx>,
{
    async fn create_order(&self, command: CreateOrder) -> Result<Order, OrderError> {
        OrderWorkflow::create_order(self, command).await
    }
}

fn validate_lines(lines: &[OrderLineRequest]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    if let Some(bad) = lines.iter().find(|l| l.quantity <= 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: bad.product_id,
            quantity: bad.quantity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Call-sequence tests against scripted collaborators. Behavioral tests
    //! against a real backend live in `ordermgmt-infra`.

    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use ordermgmt_clients::Client;
    use ordermgmt_core::{
        ClientId, Money, OrderId, OrderLineId, PersistenceError, PersistenceResult, ProductId,
    };
    use ordermgmt_products::Product;

    use super::*;

    #[derive(Default)]
    struct Journal {
        calls: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct Scripted {
        journal: Arc<Mutex<Journal>>,
        fail_update_totals: bool,
    }

    impl Scripted {
        fn record(&self, call: impl Into<String>) {
            self.journal.lock().unwrap().calls.push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.journal.lock().unwrap().calls.clone()
        }
    }

    struct ScriptedTx(Scripted);

    #[async_trait]
    impl TransactionScope for ScriptedTx {
        async fn commit(self) -> PersistenceResult<()> {
            self.0.record("commit");
            Ok(())
        }

        async fn rollback(self) -> PersistenceResult<()> {
            self.0.record("rollback");
            Ok(())
        }
    }

    #[async_trait]
    impl TransactionSource for Scripted {
        type Tx = ScriptedTx;

        async fn begin(&self) -> PersistenceResult<ScriptedTx> {
            self.record("begin");
            Ok(ScriptedTx(self.clone()))
        }
    }

    #[async_trait]
    impl ClientDirectory for Scripted {
        async fn find_by_id(&self, id: ClientId) -> PersistenceResult<Option<Client>> {
            self.record(format!("client {id}"));
            Ok((id.get() == 1).then(|| Client {
                id,
                name: "Ana Torres".into(),
                identity: "0801-1990-12345".into(),
                created_at: Utc::now(),
            }))
        }
    }

    #[async_trait]
    impl ProductCatalog<ScriptedTx> for Scripted {
        async fn find_by_id(
            &self,
            _tx: &mut ScriptedTx,
            id: ProductId,
        ) -> PersistenceResult<Option<Product>> {
            self.record(format!("find product {id}"));
            Ok(Some(Product {
                id,
                name: "Widget".into(),
                description: String::new(),
                unit_price: Money::from_cents(10_000),
                stock: 10,
                created_at: Utc::now(),
            }))
        }

        async fn decrement_stock(
            &self,
            _tx: &mut ScriptedTx,
            id: ProductId,
            quantity: i32,
        ) -> PersistenceResult<StockDecrement> {
            self.record(format!("decrement {id} by {quantity}"));
            Ok(StockDecrement::Applied {
                remaining: 10 - quantity,
                unit_price: Money::from_cents(10_000),
            })
        }
    }

    #[async_trait]
    impl OrderStore<ScriptedTx> for Scripted {
        async fn create_header(
            &self,
            _tx: &mut ScriptedTx,
            _client_id: ClientId,
            _created_at: chrono::DateTime<Utc>,
        ) -> PersistenceResult<OrderId> {
            self.record("header");
            Ok(OrderId::from_raw(1))
        }

        async fn add_line(
            &self,
            _tx: &mut ScriptedTx,
            _order_id: OrderId,
            product_id: ProductId,
            _quantity: i32,
            amounts: &LineAmounts,
        ) -> PersistenceResult<OrderLineId> {
            self.record(format!("line {product_id} total {}", amounts.total));
            Ok(OrderLineId::from_raw(product_id.get()))
        }

        async fn update_totals(
            &self,
            _tx: &mut ScriptedTx,
            _order_id: OrderId,
            totals: &LineAmounts,
        ) -> PersistenceResult<()> {
            self.record(format!("totals {}", totals.total));
            if self.fail_update_totals {
                return Err(PersistenceError::Query("disk full".into()));
            }
            Ok(())
        }
    }

    fn workflow(s: &Scripted) -> OrderWorkflow<Scripted, Scripted, Scripted, Scripted> {
        OrderWorkflow::new(s.clone(), s.clone(), s.clone(), s.clone())
    }

    fn command(client: i64, lines: &[(i64, i32)]) -> CreateOrder {
        CreateOrder {
            client_id: ClientId::from_raw(client),
            lines: lines
                .iter()
                .map(|(p, q)| OrderLineRequest::new(ProductId::from_raw(*p), *q))
                .collect(),
        }
    }

    #[tokio::test]
    async fn empty_order_fails_before_any_lookup() {
        let s = Scripted::default();
        let err = workflow(&s).create_order(command(1, &[])).await.unwrap_err();
        assert_eq!(err, OrderError::EmptyOrder);
        assert!(s.calls().is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_fails_before_any_lookup() {
        let s = Scripted::default();
        let err = workflow(&s)
            .create_order(command(1, &[(1, 2), (2, 0)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidQuantity {
                product_id: ProductId::from_raw(2),
                quantity: 0
            }
        );
        assert!(s.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_client_never_opens_a_transaction() {
        let s = Scripted::default();
        let err = workflow(&s).create_order(command(7, &[(1, 1)])).await.unwrap_err();
        assert_eq!(err, OrderError::ClientNotFound(ClientId::from_raw(7)));
        assert_eq!(s.calls(), vec!["client 7"]);
    }

    #[tokio::test]
    async fn steps_run_in_order_and_commit() {
        let s = Scripted::default();
        let order = workflow(&s)
            .create_order(command(1, &[(1, 4), (2, 1)]))
            .await
            .unwrap();

        assert_eq!(
            s.calls(),
            vec![
                "client 1",
                "begin",
                "header",
                "find product 1",
                "decrement 1 by 4",
                "line 1 total 460.00",
                "find product 2",
                "decrement 2 by 1",
                "line 2 total 115.00",
                "totals 575.00",
                "commit",
            ]
        );
        assert_eq!(order.total, Money::from_cents(57_500));
        assert!(order.totals_are_consistent());
    }

    #[tokio::test]
    async fn persistence_failure_rolls_back() {
        let s = Scripted {
            fail_update_totals: true,
            ..Scripted::default()
        };
        let err = workflow(&s).create_order(command(1, &[(1, 1)])).await.unwrap_err();
        assert_eq!(
            err,
            OrderError::PersistenceFailure(PersistenceError::Query("disk full".into()))
        );
        let calls = s.calls();
        assert_eq!(calls.last().map(String::as_str), Some("rollback"));
        assert!(!calls.iter().any(|c| c == "commit"));
    }
}
