use {
    super::cart::CartSnapshot,
    super::error::OrderError,
    super::id::PaymentRef,
    super::money::{Currency, MoneyAmount},
    super::order::Order,
    serde::Serialize,
    std::{future::Future, pin::Pin},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the gateway hands back after creating a remote payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub external_payment_ref: PaymentRef,
    pub amount: MoneyAmount,
}

pub trait PaymentGateway: Send + Sync {
    fn create_intent(
        &self,
        amount: MoneyAmount,
        currency: Currency,
    ) -> BoxFuture<'_, Result<PaymentIntent, OrderError>>;
}

/// The buyer's cart, owned by another service.
pub trait CartService: Send + Sync {
    fn load<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<CartSnapshot, OrderError>>;

    fn clear<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<(), OrderError>>;
}

/// Confirmation email sender. Callers never wait on it for control flow.
pub trait ReceiptNotifier: Send + Sync {
    fn send_receipt(&self, order: Order) -> BoxFuture<'_, Result<(), OrderError>>;
}
