use {
    super::cart::LineItem,
    super::error::OrderError,
    super::id::PaymentRef,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Placed,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Placed,
        Self::Packed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::Packed => "Packed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Legal next states. Shipped goods can't be cancelled, that needs a
    /// returns flow.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            Self::Placed => &[Self::Packed, Self::Cancelled],
            Self::Packed => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        self.successors().contains(next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = OrderError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OrderError::Validation(format!("unknown order status: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Paid,
    Pending,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = OrderError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            other => Err(OrderError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub name: String,
    pub email: String,
}

impl CustomerIdentity {
    pub fn snapshot(self, address: Address) -> Result<CustomerSnapshot, OrderError> {
        if self.name.trim().is_empty() {
            return Err(OrderError::Validation("customer name is required".into()));
        }
        if !self.email.contains('@') {
            return Err(OrderError::Validation(format!(
                "customer email is invalid: {}",
                self.email
            )));
        }
        if address.line1.trim().is_empty() || address.country.trim().is_empty() {
            return Err(OrderError::Validation(
                "shipping address needs at least line1 and country".into(),
            ));
        }
        Ok(CustomerSnapshot {
            name: self.name,
            email: self.email,
            address,
        })
    }
}

/// Buyer details copied onto the order; profile edits never rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    customer: CustomerSnapshot,
    items: Vec<LineItem>,
    amount: MoneyAmount,
    status: OrderStatus,
    payment_status: PaymentStatus,
    external_payment_ref: PaymentRef,
    status_history: Vec<StatusChange>,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

pub struct NewOrderParams {
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub amount: MoneyAmount,
    pub payment_status: PaymentStatus,
    pub external_payment_ref: PaymentRef,
    pub category: Option<String>,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Every column of a stored order, for backends rebuilding one from a row.
pub struct StoredOrderParts {
    pub id: Uuid,
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub amount: MoneyAmount,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub external_payment_ref: PaymentRef,
    pub status_history: Vec<StatusChange>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// New order in `Placed` with a single history entry. Id generated via
    /// Uuid::now_v7().
    pub fn place(params: NewOrderParams) -> Self {
        Self {
            id: Uuid::now_v7(),
            customer: params.customer,
            items: params.items,
            amount: params.amount,
            status: OrderStatus::Placed,
            payment_status: params.payment_status,
            external_payment_ref: params.external_payment_ref,
            status_history: vec![StatusChange {
                status: OrderStatus::Placed,
                timestamp: params.at,
                actor: params.actor,
            }],
            category: params.category,
            created_at: params.at,
        }
    }

    pub fn restore(parts: StoredOrderParts) -> Self {
        Self {
            id: parts.id,
            customer: parts.customer,
            items: parts.items,
            amount: parts.amount,
            status: parts.status,
            payment_status: parts.payment_status,
            external_payment_ref: parts.external_payment_ref,
            status_history: parts.status_history,
            category: parts.category,
            created_at: parts.created_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn external_payment_ref(&self) -> &PaymentRef {
        &self.external_payment_ref
    }

    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the order moved to `to`, with one history entry appended.
    /// `self` is left untouched so the caller can compare-and-swap on the
    /// status it read.
    pub fn transition(
        &self,
        to: OrderStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        if !self.status.can_transition_to(&to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        let mut next = self.clone();
        next.status = to;
        next.status_history.push(StatusChange {
            status: to,
            timestamp: at,
            actor: actor.to_string(),
        });
        Ok(next)
    }
}
