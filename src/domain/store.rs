use {
    super::error::OrderError,
    super::id::PaymentRef,
    super::ledger::{AmountConflict, LedgerEntry, LedgerInsert},
    super::order::{Order, OrderStatus, PaymentStatus},
    super::provider::BoxFuture,
    chrono::{DateTime, Utc},
    serde::Deserialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInsert {
    Inserted(Order),
    /// An order already carries this payment reference.
    Existing(Order),
}

impl OrderInsert {
    pub fn order(&self) -> &Order {
        match self {
            Self::Inserted(order) | Self::Existing(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            Self::Inserted(order) | Self::Existing(order) => order,
        }
    }

    /// Credit to book alongside this outcome. A replayed completion books the
    /// stored order's amount, not the total of the replayed cart.
    pub fn credit_for(&self, credit: &LedgerEntry) -> LedgerEntry {
        match self {
            Self::Inserted(_) => credit.clone(),
            Self::Existing(order) => LedgerEntry {
                amount: order.amount(),
                ..credit.clone()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied(Order),
    /// The stored status no longer matches the one the caller read.
    Conflict { current: OrderStatus },
    NotFound,
}

/// Listing filter. Also the cache key for listings, so it must stay
/// hashable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl OrderQuery {
    pub fn paid() -> Self {
        Self {
            payment_status: Some(PaymentStatus::Paid),
            ..Self::default()
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| s == order.status())
            && self.payment_status.is_none_or(|s| s == order.payment_status())
            && self
                .category
                .as_deref()
                .is_none_or(|c| order.category() == Some(c))
            && self.from.is_none_or(|from| order.created_at() >= from)
            && self.to.is_none_or(|to| order.created_at() < to)
    }
}

pub trait OrderStore: Send + Sync {
    /// Insert unless an order with the same payment reference exists.
    fn insert_if_absent<'a>(
        &'a self,
        order: &'a Order,
    ) -> BoxFuture<'a, Result<OrderInsert, OrderError>>;

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Order>, OrderError>>;

    fn find_by_payment_ref<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Option<Order>, OrderError>>;

    /// Replace the order's status and history only if its stored status is
    /// still `expected`.
    fn compare_and_set_status<'a>(
        &'a self,
        expected: OrderStatus,
        updated: &'a Order,
    ) -> BoxFuture<'a, Result<StatusUpdate, OrderError>>;

    /// Matching orders, oldest first.
    fn list<'a>(&'a self, query: &'a OrderQuery) -> BoxFuture<'a, Result<Vec<Order>, OrderError>>;
}

pub trait LedgerStore: Send + Sync {
    /// Insert unless an entry with the same (reference, direction) exists.
    fn insert_if_absent<'a>(
        &'a self,
        entry: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<LedgerInsert, OrderError>>;

    fn find_by_reference<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Vec<LedgerEntry>, OrderError>>;

    fn list_credits(&self) -> BoxFuture<'_, Result<Vec<LedgerEntry>, OrderError>>;

    /// Keep a conflicting amount report. Returns `false` when the same
    /// (reference, reported amount) was already on file.
    fn record_conflict<'a>(
        &'a self,
        conflict: &'a AmountConflict,
    ) -> BoxFuture<'a, Result<bool, OrderError>>;

    fn list_conflicts(&self) -> BoxFuture<'_, Result<Vec<AmountConflict>, OrderError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCommit {
    pub order: OrderInsert,
    /// `None` when the order landed but the ledger write did not.
    pub credit: Option<LedgerInsert>,
}

/// Writes a paid order together with its ledger credit.
pub trait CheckoutWriter: Send + Sync {
    fn commit_paid_order<'a>(
        &'a self,
        order: &'a Order,
        credit: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<CheckoutCommit, OrderError>>;
}
