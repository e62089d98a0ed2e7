use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::NotFound(entity) => AppError::NotFound(entity),
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::EmptyCart => AppError::EmptyCart,
            DomainError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::EmptyCart | AppError::InvalidTransition(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(msg) = self {
            // Log the detail, return a generic body.
            log::error!("internal error: {msg}");
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "Internal server error"
            }));
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    use super::*;
    use crate::domain::order::OrderStatus;

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            AppError::NotFound("Order").error_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn client_errors_return_400() {
        for err in [
            AppError::Validation("quantity must be a positive integer".to_string()),
            AppError::EmptyCart,
            AppError::InvalidTransition("no".to_string()),
        ] {
            assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            AppError::Unauthorized.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden.error_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_error_returns_500_with_generic_body() {
        let err = AppError::Internal("connection reset".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn empty_cart_maps_through_from_domain() {
        let app_err: AppError = DomainError::EmptyCart.into();
        assert!(matches!(app_err, AppError::EmptyCart));
    }

    #[test]
    fn invalid_transition_keeps_the_detail_message() {
        let app_err: AppError = DomainError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        }
        .into();
        assert_eq!(
            app_err.to_string(),
            "Cannot change order status from PENDING to SHIPPED"
        );
    }
}
