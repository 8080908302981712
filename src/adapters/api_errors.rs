use crate::domain::error::OrderError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// HTTP face of [`OrderError`].
pub struct ApiError(pub OrderError);

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match &self.0 {
            OrderError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            // Buyer-facing text stays generic.
            OrderError::PaymentVerificationFailed => (
                StatusCode::UNAUTHORIZED,
                "payment_verification_failed",
                "payment could not be verified".to_string(),
            ),
            OrderError::WebhookSignature(_) => (
                StatusCode::BAD_REQUEST,
                "webhook_error",
                "invalid webhook signature".to_string(),
            ),
            err @ OrderError::InvalidTransition { .. } => (
                StatusCode::CONFLICT,
                "invalid_transition",
                err.to_string(),
            ),
            err @ OrderError::StatusConflict { .. } => {
                (StatusCode::CONFLICT, "status_conflict", err.to_string())
            }
            err @ OrderError::OrderNotFound(_) => {
                (StatusCode::NOT_FOUND, "order_not_found", err.to_string())
            }
            OrderError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            OrderError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            OrderError::Gateway(err) => {
                tracing::error!("payment gateway error: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_error",
                    "payment gateway unavailable".to_string(),
                )
            }
            OrderError::Store(err) => {
                tracing::error!("store error: {err}");
                internal()
            }
            OrderError::Database(err) => {
                tracing::error!("database error: {err}");
                internal()
            }
            OrderError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                internal()
            }
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error".to_string(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
