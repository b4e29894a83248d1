use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use ordermgmt_clients::{ClientDetails, ClientDirectory, ClientRepository};
use ordermgmt_core::{ClientId, DomainError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route("/:id", get(get_client).put(update_client).delete(delete_client))
}

pub async fn list_clients(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.clients.list().await {
        Ok(clients) => {
            let items = clients.into_iter().map(dto::client_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn create_client(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ClientRequest>, JsonRejection>,
) -> axum::response::Response {
    let details = match validated(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.clients.find_by_identity(&details.identity).await {
        Ok(Some(_)) => return identity_taken(&details),
        Ok(None) => {}
        Err(e) => return errors::persistence_error_to_response(e),
    }

    match services.clients.insert(&details).await {
        Ok(client) => {
            tracing::info!(client_id = %client.id, "client registered");
            (StatusCode::CREATED, Json(dto::client_to_json(client))).into_response()
        }
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn get_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.clients.find_by_id(id).await {
        Ok(Some(client)) => (StatusCode::OK, Json(dto::client_to_json(client))).into_response(),
        Ok(None) => client_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn update_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::ClientRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let details = match validated(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    // The identity may stay the same but must not belong to another client.
    match services.clients.find_by_identity(&details.identity).await {
        Ok(Some(other)) if other.id != id => return identity_taken(&details),
        Ok(_) => {}
        Err(e) => return errors::persistence_error_to_response(e),
    }

    match services.clients.update(id, &details).await {
        Ok(Some(client)) => (StatusCode::OK, Json(dto::client_to_json(client))).into_response(),
        Ok(None) => client_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

pub async fn delete_client(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ClientId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.clients.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => client_not_found(),
        Err(e) => errors::persistence_error_to_response(e),
    }
}

fn validated(
    body: Result<Json<dto::ClientRequest>, JsonRejection>,
) -> Result<ClientDetails, axum::response::Response> {
    let Json(body) = body.map_err(errors::json_rejection_to_response)?;
    body.into_details()
        .validated()
        .map_err(errors::domain_error_to_response)
}

fn identity_taken(details: &ClientDetails) -> axum::response::Response {
    errors::domain_error_to_response(DomainError::conflict(format!(
        "identity {} is already registered",
        details.identity
    )))
}

fn client_not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "client not found")
}
