use {
    super::id::PaymentRef,
    super::ledger::{AmountConflict, Direction, EntrySource, LedgerEntry},
    super::money::MoneyAmount,
    super::order::{Order, PaymentStatus},
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::collections::{BTreeMap, HashMap},
    uuid::Uuid,
};

/// A single disagreement between the order store and the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// Paid order with no credit for its reference.
    MissingCredit {
        order_id: Uuid,
        reference: PaymentRef,
        amount: MoneyAmount,
    },
    AmountMismatch {
        order_id: Uuid,
        reference: PaymentRef,
        order_amount: MoneyAmount,
        ledger_amount: MoneyAmount,
    },
    DuplicateCredit {
        reference: PaymentRef,
        entry_ids: Vec<Uuid>,
    },
    /// Credit with no paid order behind it.
    OrphanCredit {
        entry_id: Uuid,
        reference: PaymentRef,
        amount: MoneyAmount,
    },
    DuplicateOrder {
        reference: PaymentRef,
        order_ids: Vec<Uuid>,
    },
    /// A second report for a credited reference named another amount.
    ReportedAmountConflict {
        reference: PaymentRef,
        ledger_amount: MoneyAmount,
        reported_amount: MoneyAmount,
        source: EntrySource,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub generated_at: DateTime<Utc>,
    /// Records stamped after this instant were left for the next sweep.
    pub cutoff: DateTime<Utc>,
    pub orders_checked: usize,
    pub credits_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Compare paid orders against credit entries, as of `cutoff`. Orders and
/// credits are read separately, so anything stamped after the cutoff may be
/// missing its other half and is skipped. Report only: nothing here decides
/// which side is right.
pub fn reconcile(
    orders: &[Order],
    entries: &[LedgerEntry],
    conflicts: &[AmountConflict],
    cutoff: DateTime<Utc>,
    generated_at: DateTime<Utc>,
) -> ReconciliationReport {
    let paid: Vec<&Order> = orders
        .iter()
        .filter(|o| o.payment_status() == PaymentStatus::Paid && o.created_at() <= cutoff)
        .collect();
    let credits: Vec<&LedgerEntry> = entries
        .iter()
        .filter(|e| e.direction == Direction::Credited && e.occurred_at <= cutoff)
        .collect();

    // BTreeMap keeps the report order stable across runs.
    let mut credits_by_ref: BTreeMap<&str, Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in &credits {
        credits_by_ref
            .entry(entry.reference.as_str())
            .or_default()
            .push(entry);
    }
    let mut orders_by_ref: HashMap<&str, Vec<&Order>> = HashMap::new();
    for order in &paid {
        orders_by_ref
            .entry(order.external_payment_ref().as_str())
            .or_default()
            .push(order);
    }

    let mut discrepancies = Vec::new();

    for order in &paid {
        let reference = order.external_payment_ref();
        match credits_by_ref.get(reference.as_str()) {
            None => discrepancies.push(Discrepancy::MissingCredit {
                order_id: order.id(),
                reference: reference.clone(),
                amount: order.amount(),
            }),
            Some(found) => {
                if let Some(entry) = found.iter().find(|e| e.amount != order.amount()) {
                    discrepancies.push(Discrepancy::AmountMismatch {
                        order_id: order.id(),
                        reference: reference.clone(),
                        order_amount: order.amount(),
                        ledger_amount: entry.amount,
                    });
                }
            }
        }
    }

    for (reference, found) in &credits_by_ref {
        if found.len() > 1 {
            discrepancies.push(Discrepancy::DuplicateCredit {
                reference: found[0].reference.clone(),
                entry_ids: found.iter().map(|e| e.id).collect(),
            });
        }
        match orders_by_ref.get(reference) {
            None => {
                for entry in found {
                    discrepancies.push(Discrepancy::OrphanCredit {
                        entry_id: entry.id,
                        reference: entry.reference.clone(),
                        amount: entry.amount,
                    });
                }
            }
            Some(matched) if matched.len() > 1 => {
                discrepancies.push(Discrepancy::DuplicateOrder {
                    reference: found[0].reference.clone(),
                    order_ids: matched.iter().map(|o| o.id()).collect(),
                });
            }
            Some(_) => {}
        }
    }

    for conflict in conflicts.iter().filter(|c| c.reported_at <= cutoff) {
        discrepancies.push(Discrepancy::ReportedAmountConflict {
            reference: conflict.reference.clone(),
            ledger_amount: conflict.ledger_amount,
            reported_amount: conflict.reported_amount,
            source: conflict.source,
        });
    }

    ReconciliationReport {
        generated_at,
        cutoff,
        orders_checked: paid.len(),
        credits_checked: credits.len(),
        discrepancies,
    }
}
