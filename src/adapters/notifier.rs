use crate::domain::{
    error::OrderError,
    order::Order,
    provider::{BoxFuture, ReceiptNotifier},
};

/// Receipt sink that only logs. Stands in until a mail transport is wired.
pub struct LogReceiptNotifier {
    sender: String,
}

impl LogReceiptNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

impl ReceiptNotifier for LogReceiptNotifier {
    fn send_receipt(&self, order: Order) -> BoxFuture<'_, Result<(), OrderError>> {
        Box::pin(async move {
            tracing::info!(
                from = %self.sender,
                to = %order.customer().email,
                order_id = %order.id(),
                amount = %order.amount(),
                items = order.items().len(),
                "order receipt"
            );
            Ok(())
        })
    }
}
