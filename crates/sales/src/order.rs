use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ordermgmt_core::{ClientId, Entity, Money, OrderId, OrderLineId, ProductId, ValueObject};

use crate::pricing::LineAmounts;

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl OrderLineRequest {
    pub fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl ValueObject for OrderLineRequest {}

/// Command: place an order for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub client_id: ClientId,
    /// Processed in this order; the same product may appear more than once.
    pub lines: Vec<OrderLineRequest>,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderLine {
    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
        }
    }
}

impl Entity for OrderLine {
    type Id = OrderLineId;

    fn id(&self) -> OrderLineId {
        self.id
    }
}

/// A committed order: header plus its lines.
///
/// Totals are always derived from the lines; there is no way to supply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: ClientId,
    pub created_at: DateTime<Utc>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn amounts(&self) -> LineAmounts {
        LineAmounts {
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
        }
    }

    /// Whether the header totals equal the sums over the lines.
    pub fn totals_are_consistent(&self) -> bool {
        let summed = LineAmounts::checked_sum(self.lines.iter().map(OrderLine::amounts));
        summed == Some(self.amounts()) && self.subtotal.checked_add(self.tax) == Some(self.total)
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, subtotal: i64, tax: i64) -> OrderLine {
        OrderLine {
            id: OrderLineId::from_raw(id),
            order_id: OrderId::from_raw(1),
            product_id: ProductId::from_raw(id),
            quantity: 1,
            subtotal: Money::from_cents(subtotal),
            tax: Money::from_cents(tax),
            total: Money::from_cents(subtotal + tax),
        }
    }

    #[test]
    fn consistent_totals_are_detected() {
        let order = Order {
            id: OrderId::from_raw(1),
            client_id: ClientId::from_raw(1),
            created_at: Utc::now(),
            subtotal: Money::from_cents(30_000),
            tax: Money::from_cents(4_500),
            total: Money::from_cents(34_500),
            lines: vec![line(1, 10_000, 1_500), line(2, 20_000, 3_000)],
        };
        assert!(order.totals_are_consistent());

        let mut tampered = order.clone();
        tampered.total = Money::from_cents(34_501);
        assert!(!tampered.totals_are_consistent());
    }
}
