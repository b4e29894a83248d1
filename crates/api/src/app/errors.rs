use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ordermgmt_core::{DomainError, PersistenceError};
use ordermgmt_sales::OrderError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn persistence_error_to_response(err: PersistenceError) -> axum::response::Response {
    match err {
        PersistenceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        PersistenceError::Constraint(msg) => {
            json_error(StatusCode::CONFLICT, "constraint_violation", msg)
        }
        PersistenceError::Unavailable(msg) => {
            tracing::error!(error = %msg, "storage unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", msg)
        }
        e @ (PersistenceError::Decode(_) | PersistenceError::Query(_)) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", e.to_string())
        }
    }
}

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    let message = err.to_string();
    let code = err.code();
    match err {
        OrderError::EmptyOrder => json_error(StatusCode::BAD_REQUEST, code, message),
        OrderError::InvalidQuantity {
            product_id,
            quantity,
        } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": code,
                "message": message,
                "product_id": product_id,
                "quantity": quantity,
            })),
        )
            .into_response(),
        OrderError::ClientNotFound(client_id) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": code,
                "message": message,
                "client_id": client_id,
            })),
        )
            .into_response(),
        OrderError::ProductNotFound(product_id) => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": code,
                "message": message,
                "product_id": product_id,
            })),
        )
            .into_response(),
        OrderError::InsufficientStock {
            product_id,
            available,
            requested,
        } => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "error": code,
                "message": message,
                "product_id": product_id,
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        OrderError::LineAmountOutOfRange {
            product_id,
            quantity,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": code,
                "message": message,
                "product_id": product_id,
                "quantity": quantity,
            })),
        )
            .into_response(),
        OrderError::OrderTotalOutOfRange => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, code, message)
        }
        OrderError::PersistenceFailure(cause) => {
            tracing::error!(error = %cause, "order persistence failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordermgmt_core::ProductId;

    #[test]
    fn order_errors_map_to_statuses() {
        let cases = [
            (OrderError::EmptyOrder, StatusCode::BAD_REQUEST),
            (
                OrderError::InvalidQuantity {
                    product_id: ProductId::from_raw(1),
                    quantity: 0,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                OrderError::ProductNotFound(ProductId::from_raw(1)),
                StatusCode::NOT_FOUND,
            ),
            (
                OrderError::InsufficientStock {
                    product_id: ProductId::from_raw(1),
                    available: 4,
                    requested: 6,
                },
                StatusCode::CONFLICT,
            ),
            (
                OrderError::LineAmountOutOfRange {
                    product_id: ProductId::from_raw(1),
                    quantity: 2,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (OrderError::OrderTotalOutOfRange, StatusCode::UNPROCESSABLE_ENTITY),
            (
                OrderError::PersistenceFailure(PersistenceError::Query("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(order_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn domain_errors_map_to_client_errors() {
        let cases = [
            (DomainError::validation("name cannot be empty"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("client id"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("identity taken"), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn storage_conflicts_are_409() {
        let res = persistence_error_to_response(PersistenceError::Conflict("dup".into()));
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let res = domain_error_to_response(DomainError::invalid_id("client id"));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
