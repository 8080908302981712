use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::OrderError;

/// Gateway-issued payment intent identifier. Doubles as the idempotency
/// key shared by the order and its ledger credit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentRef(String);

impl PaymentRef {
    pub fn new(reference: impl Into<String>) -> Result<Self, OrderError> {
        let reference = reference.into();
        validate_gateway_id("payment reference", &reference)?;
        Ok(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway-issued identifier of a single payment attempt (`pay_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self, OrderError> {
        let id = id.into();
        validate_gateway_id("payment id", &id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// `|` would make the completion payload ambiguous.
fn validate_gateway_id(kind: &str, id: &str) -> Result<(), OrderError> {
    if id.is_empty() || id.len() > 255 {
        return Err(OrderError::Validation(format!(
            "{kind} must be 1..=255 bytes, got {} bytes",
            id.len()
        )));
    }
    if id.contains('|') || id.chars().any(char::is_whitespace) {
        return Err(OrderError::Validation(format!(
            "{kind} contains forbidden characters: {id}"
        )));
    }
    Ok(())
}
