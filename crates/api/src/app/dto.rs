use serde::Deserialize;

use ordermgmt_clients::{Client, ClientDetails};
use ordermgmt_core::{ClientId, DomainResult, Money, ProductId};
use ordermgmt_products::{Product, ProductDetails};
use ordermgmt_sales::{CreateOrder, Order, OrderLine, OrderLineRequest};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub name: String,
    pub identity: String,
}

impl ClientRequest {
    pub fn into_details(self) -> ClientDetails {
        ClientDetails::new(self.name, self.identity)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Accepts a JSON number or a decimal string (`"19.99"`).
    pub unit_price: Money,
    pub stock: i32,
}

impl ProductRequest {
    pub fn into_details(self) -> ProductDetails {
        ProductDetails {
            name: self.name,
            description: self.description.unwrap_or_default(),
            unit_price: self.unit_price,
            stock: self.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderLineBody {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: i64,
    #[serde(default)]
    pub lines: Vec<OrderLineBody>,
}

impl CreateOrderRequest {
    /// Ids must be positive; quantities are checked by the workflow.
    pub fn into_command(self) -> DomainResult<CreateOrder> {
        let client_id = ClientId::new(self.client_id)?;
        let lines = self
            .lines
            .into_iter()
            .map(|l| -> DomainResult<OrderLineRequest> {
                Ok(OrderLineRequest::new(ProductId::new(l.product_id)?, l.quantity))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(CreateOrder { client_id, lines })
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn client_to_json(client: Client) -> serde_json::Value {
    serde_json::json!({
        "id": client.id,
        "name": client.name,
        "identity": client.identity,
        "created_at": client.created_at,
    })
}

pub fn product_to_json(product: Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id,
        "name": product.name,
        "description": product.description,
        "unit_price": product.unit_price,
        "stock": product.stock,
        "created_at": product.created_at,
    })
}

fn order_line_to_json(line: OrderLine) -> serde_json::Value {
    serde_json::json!({
        "id": line.id,
        "product_id": line.product_id,
        "quantity": line.quantity,
        "subtotal": line.subtotal,
        "tax": line.tax,
        "total": line.total,
    })
}

pub fn order_to_json(order: Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id,
        "client_id": order.client_id,
        "created_at": order.created_at,
        "subtotal": order.subtotal,
        "tax": order.tax,
        "total": order.total,
        "lines": order.lines.into_iter().map(order_line_to_json).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_request_rejects_non_positive_ids() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "client_id": 1,
            "lines": [{ "product_id": 0, "quantity": 2 }],
        }))
        .unwrap();
        assert!(req.into_command().is_err());
    }

    #[test]
    fn product_request_accepts_string_and_number_prices() {
        let a: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Widget", "unit_price": "19.99", "stock": 3,
        }))
        .unwrap();
        let b: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Widget", "unit_price": 19.99, "stock": 3,
        }))
        .unwrap();
        assert_eq!(a.unit_price, Money::from_cents(1999));
        assert_eq!(b.unit_price, Money::from_cents(1999));
        assert_eq!(a.into_details().description, "");
    }
}
