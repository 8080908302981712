use {super::order::OrderStatus, thiserror::Error, uuid::Uuid};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("payment could not be verified")]
    PaymentVerificationFailed,

    #[error("webhook signature: {0}")]
    WebhookSignature(String),

    #[error("invalid status transition: {from} → {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order status changed concurrently: expected {expected}, found {found}")]
    StatusConflict {
        expected: OrderStatus,
        found: OrderStatus,
    },

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("payment gateway: {0}")]
    Gateway(String),

    #[error("store: {0}")]
    Store(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
