use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use ordermgmt_core::ProductId;
use ordermgmt_products::{ProductDetails, ProductRepository};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.list().await {
        Ok(products) => {
            let items = products.into_iter().map(dto::product_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let details = match validated(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.products.insert(&details).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, stock = product.stock, "product created");
            (StatusCode::CREATED, Json(dto::product_to_json(product))).into_response()
        }
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.get(id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Ok(None) => product_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let details = match validated(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.products.update(id, &details).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Ok(None) => product_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => product_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

fn validated(
    body: Result<Json<dto::ProductRequest>, JsonRejection>,
) -> Result<ProductDetails, axum::response::Response> {
    let Json(body) = body.map_err(errors::json_rejection_to_response)?;
    body.into_details()
        .validated()
        .map_err(errors::domain_error_to_response)
}

fn product_not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found")
}
