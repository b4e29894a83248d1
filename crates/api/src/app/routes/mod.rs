use axum::{routing::get, Router};

pub mod clients;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/clients", clients::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
}
