use crate::domain::{
    error::OrderError,
    id::PaymentRef,
    money::{Currency, MoneyAmount},
    provider::{BoxFuture, PaymentGateway, PaymentIntent},
};

/// Payment intents created through the Stripe API.
pub struct StripeGateway {
    client: stripe::Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }

    async fn create_intent_inner(
        &self,
        amount: MoneyAmount,
        currency: Currency,
    ) -> Result<PaymentIntent, OrderError> {
        let params = stripe::CreatePaymentIntent::new(amount.minor(), convert_currency(currency));
        let pi = stripe::PaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| OrderError::Gateway(format!("Stripe API: {e}")))?;

        let charged = convert_amount(pi.amount)?;
        if charged != amount {
            return Err(OrderError::Gateway(format!(
                "intent {} created for {charged}, requested {amount}",
                pi.id
            )));
        }

        Ok(PaymentIntent {
            external_payment_ref: PaymentRef::new(pi.id.to_string())?,
            amount: charged,
        })
    }
}

impl PaymentGateway for StripeGateway {
    fn create_intent(
        &self,
        amount: MoneyAmount,
        currency: Currency,
    ) -> BoxFuture<'_, Result<PaymentIntent, OrderError>> {
        Box::pin(self.create_intent_inner(amount, currency))
    }
}

pub fn convert_currency(c: Currency) -> stripe::Currency {
    match c {
        Currency::Usd => stripe::Currency::USD,
        Currency::Eur => stripe::Currency::EUR,
        Currency::Gbp => stripe::Currency::GBP,
        Currency::Inr => stripe::Currency::INR,
    }
}

pub fn convert_amount(amount: i64) -> Result<MoneyAmount, OrderError> {
    MoneyAmount::new(amount).map_err(|_| OrderError::Gateway(format!("negative amount: {amount}")))
}
