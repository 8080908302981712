use {
    crate::domain::{
        error::OrderError,
        ledger::LedgerEntry,
        order::Order,
        provider::BoxFuture,
        store::{CheckoutCommit, CheckoutWriter, LedgerStore, OrderStore},
    },
    std::sync::Arc,
};

/// Checkout writer for backends that cannot commit the order and the ledger
/// credit in one transaction. Order goes first; if the credit then fails
/// the order is kept and the gap is logged for the reconciliation sweep.
/// The gateway webhook for the same reference fills the credit in later.
pub struct SplitCheckoutWriter {
    orders: Arc<dyn OrderStore>,
    ledger: Arc<dyn LedgerStore>,
}

impl SplitCheckoutWriter {
    pub fn new(orders: Arc<dyn OrderStore>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { orders, ledger }
    }

    async fn commit(
        &self,
        order: &Order,
        credit: &LedgerEntry,
    ) -> Result<CheckoutCommit, OrderError> {
        let order = self.orders.insert_if_absent(order).await?;
        let credit = order.credit_for(credit);

        match self.ledger.insert_if_absent(&credit).await {
            Ok(credit) => Ok(CheckoutCommit {
                order,
                credit: Some(credit),
            }),
            Err(e) => {
                tracing::error!(
                    partial_write = true,
                    order_id = %order.order().id(),
                    reference = %credit.reference,
                    amount = %credit.amount,
                    error = %e,
                    "order persisted but ledger credit failed"
                );
                Ok(CheckoutCommit {
                    order,
                    credit: None,
                })
            }
        }
    }
}

impl CheckoutWriter for SplitCheckoutWriter {
    fn commit_paid_order<'a>(
        &'a self,
        order: &'a Order,
        credit: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<CheckoutCommit, OrderError>> {
        Box::pin(self.commit(order, credit))
    }
}
