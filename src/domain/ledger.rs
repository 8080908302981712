use {
    super::error::OrderError,
    super::id::{PaymentId, PaymentRef},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Credited,
    Debited,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credited => "Credited",
            Self::Debited => "Debited",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Direction {
    type Error = OrderError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "Credited" => Ok(Self::Credited),
            "Debited" => Ok(Self::Debited),
            other => Err(OrderError::Validation(format!(
                "unknown ledger direction: {other}"
            ))),
        }
    }
}

/// Which channel reported the payment first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Checkout,
    Webhook,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Webhook => "webhook",
        }
    }
}

impl TryFrom<&str> for EntrySource {
    type Error = OrderError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "checkout" => Ok(Self::Checkout),
            "webhook" => Ok(Self::Webhook),
            other => Err(OrderError::Validation(format!(
                "unknown ledger source: {other}"
            ))),
        }
    }
}

/// Append-only money movement. At most one entry per
/// (reference, direction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub reference: PaymentRef,
    pub payment_id: Option<PaymentId>,
    pub amount: MoneyAmount,
    pub direction: Direction,
    pub source: EntrySource,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn credit(
        reference: PaymentRef,
        payment_id: Option<PaymentId>,
        amount: MoneyAmount,
        source: EntrySource,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            reference,
            payment_id,
            amount,
            direction: Direction::Credited,
            source,
            occurred_at,
        }
    }
}

/// Outcome of an insert-if-absent ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInsert {
    Inserted(LedgerEntry),
    /// An entry for this reference and direction already existed; it is
    /// returned unchanged.
    Duplicate(LedgerEntry),
}

impl LedgerInsert {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// A later report for an already-credited reference that named a different
/// amount. The credit is left as it is; the conflict is kept for the sweep.
/// At most one per (reference, reported amount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountConflict {
    pub id: Uuid,
    pub reference: PaymentRef,
    pub payment_id: Option<PaymentId>,
    pub ledger_amount: MoneyAmount,
    pub reported_amount: MoneyAmount,
    pub source: EntrySource,
    pub reported_at: DateTime<Utc>,
}

impl AmountConflict {
    pub fn between(recorded: &LedgerEntry, reported: &LedgerEntry) -> Self {
        Self {
            id: Uuid::now_v7(),
            reference: recorded.reference.clone(),
            payment_id: reported.payment_id.clone(),
            ledger_amount: recorded.amount,
            reported_amount: reported.amount,
            source: reported.source,
            reported_at: reported.occurred_at,
        }
    }
}
