use {
    crate::domain::{
        error::OrderError,
        id::{PaymentId, PaymentRef},
        money::MoneyAmount,
    },
    serde::{Deserialize, Serialize},
};

/// Gateway webhook envelope:
/// `{"event": "payment.captured", "payload": {"payment": {"entity": {...}}}}`.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Option<EventPayload>,
}

#[derive(Debug, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub payment: Option<PaymentEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEnvelope {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    /// The payment intent this payment settles.
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentCaptured,
    PaymentAuthorized,
    Unknown,
}

/// A verified gateway report that money arrived for `reference`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedPayment {
    pub reference: PaymentRef,
    pub payment_id: PaymentId,
    pub amount: MoneyAmount,
}

impl GatewayEvent {
    /// Parse only after the raw bytes have been verified.
    pub fn parse(raw_body: &[u8]) -> Result<Self, OrderError> {
        Ok(serde_json::from_slice(raw_body)?)
    }

    pub fn kind(&self) -> EventKind {
        match self.event.as_str() {
            "payment.captured" => EventKind::PaymentCaptured,
            "payment.authorized" => EventKind::PaymentAuthorized,
            _ => EventKind::Unknown,
        }
    }

    /// The ledger reference is the intent id, the same key the completion
    /// path writes, so both channels collapse onto one entry. Payments
    /// without an intent fall back to their own id.
    pub fn reported_payment(&self) -> Result<ReportedPayment, OrderError> {
        let entity = self
            .payload
            .as_ref()
            .and_then(|p| p.payment.as_ref())
            .map(|p| &p.entity)
            .ok_or_else(|| OrderError::Validation("event has no payment entity".into()))?;

        let payment_id = PaymentId::new(entity.id.as_str())?;
        let reference = PaymentRef::new(entity.order_id.as_deref().unwrap_or(&entity.id))?;
        let amount = MoneyAmount::new(entity.amount)?;
        if amount.is_zero() {
            return Err(OrderError::Validation("payment amount must be positive".into()));
        }

        Ok(ReportedPayment {
            reference,
            payment_id,
            amount,
        })
    }
}

/// Body returned to the gateway. Every variant is a success acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookAck {
    Recorded { reference: PaymentRef },
    Duplicate { reference: PaymentRef },
    Ignored { event: String },
    IgnoredInvalidData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_event_maps_to_intent_reference() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1","amount":1300,"currency":"INR"}}}}"#;
        let event = GatewayEvent::parse(body).unwrap();
        assert_eq!(event.kind(), EventKind::PaymentCaptured);
        let payment = event.reported_payment().unwrap();
        assert_eq!(payment.reference.as_str(), "order_1");
        assert_eq!(payment.payment_id.as_str(), "pay_1");
        assert_eq!(payment.amount.minor(), 1300);
    }

    #[test]
    fn missing_intent_falls_back_to_payment_id() {
        let body = br#"{"event":"payment.authorized","payload":{"payment":{"entity":{"id":"pay_2","amount":50}}}}"#;
        let payment = GatewayEvent::parse(body).unwrap().reported_payment().unwrap();
        assert_eq!(payment.reference.as_str(), "pay_2");
    }

    #[test]
    fn unknown_event_kind() {
        let event = GatewayEvent::parse(br#"{"event":"refund.processed"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Unknown);
        assert!(event.reported_payment().is_err());
    }

    #[test]
    fn ack_serializes_with_status_tag() {
        let ack = WebhookAck::Duplicate {
            reference: PaymentRef::new("order_1").unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            serde_json::json!({"status": "duplicate", "reference": "order_1"})
        );
    }
}
