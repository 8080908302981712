//! HMAC-SHA256 proof-of-payment checks.
//!
//! Both call sites sign different canonical payloads with different secrets:
//! the client-completion path signs `order_ref|payment_id`, the webhook path
//! signs the raw request body exactly as received. Never feed a
//! re-serialized JSON value into [`verify`]; key order and whitespace are
//! part of the signed bytes.

use {
    super::id::{PaymentId, PaymentRef},
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check a hex signature against `payload`. The comparison is the MAC's own
/// constant-time check; malformed hex never verifies.
pub fn verify(payload: &[u8], provided_signature: &str, secret: &[u8]) -> bool {
    let Ok(provided) = hex::decode(provided_signature.trim()) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

/// Bytes signed by the gateway on the client-completion path.
pub fn completion_payload(order_ref: &PaymentRef, payment_id: &PaymentId) -> Vec<u8> {
    format!("{}|{}", order_ref.as_str(), payment_id.as_str()).into_bytes()
}
