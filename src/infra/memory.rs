//! Process-local stores with the same insert-if-absent and compare-and-swap
//! semantics as the Postgres backend. Used when no `DATABASE_URL` is set and
//! throughout the test suite.

use {
    crate::domain::{
        cart::CartSnapshot,
        error::OrderError,
        id::PaymentRef,
        ledger::{AmountConflict, Direction, LedgerEntry, LedgerInsert},
        order::{Order, OrderStatus},
        provider::{BoxFuture, CartService},
        store::{LedgerStore, OrderInsert, OrderQuery, OrderStore, StatusUpdate},
    },
    parking_lot::Mutex,
    std::collections::HashMap,
    uuid::Uuid,
};

#[derive(Default)]
struct OrderTable {
    rows: Vec<Order>,
    by_id: HashMap<Uuid, usize>,
    by_ref: HashMap<PaymentRef, usize>,
}

#[derive(Default)]
pub struct MemoryOrderStore {
    table: Mutex<OrderTable>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert_if_absent<'a>(
        &'a self,
        order: &'a Order,
    ) -> BoxFuture<'a, Result<OrderInsert, OrderError>> {
        Box::pin(async move {
            let mut table = self.table.lock();
            if let Some(&idx) = table.by_ref.get(order.external_payment_ref()) {
                return Ok(OrderInsert::Existing(table.rows[idx].clone()));
            }
            let idx = table.rows.len();
            table.rows.push(order.clone());
            table.by_id.insert(order.id(), idx);
            table.by_ref.insert(order.external_payment_ref().clone(), idx);
            Ok(OrderInsert::Inserted(order.clone()))
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Order>, OrderError>> {
        Box::pin(async move {
            let table = self.table.lock();
            Ok(table.by_id.get(&id).map(|&idx| table.rows[idx].clone()))
        })
    }

    fn find_by_payment_ref<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Option<Order>, OrderError>> {
        Box::pin(async move {
            let table = self.table.lock();
            Ok(table.by_ref.get(reference).map(|&idx| table.rows[idx].clone()))
        })
    }

    fn compare_and_set_status<'a>(
        &'a self,
        expected: OrderStatus,
        updated: &'a Order,
    ) -> BoxFuture<'a, Result<StatusUpdate, OrderError>> {
        Box::pin(async move {
            let mut table = self.table.lock();
            let Some(&idx) = table.by_id.get(&updated.id()) else {
                return Ok(StatusUpdate::NotFound);
            };
            let current = table.rows[idx].status();
            if current != expected {
                return Ok(StatusUpdate::Conflict { current });
            }
            table.rows[idx] = updated.clone();
            Ok(StatusUpdate::Applied(updated.clone()))
        })
    }

    fn list<'a>(&'a self, query: &'a OrderQuery) -> BoxFuture<'a, Result<Vec<Order>, OrderError>> {
        Box::pin(async move {
            let table = self.table.lock();
            Ok(table
                .rows
                .iter()
                .filter(|order| query.matches(order))
                .cloned()
                .collect())
        })
    }
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<Vec<LedgerEntry>>,
    conflicts: Mutex<Vec<AmountConflict>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn insert_if_absent<'a>(
        &'a self,
        entry: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<LedgerInsert, OrderError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries
                .iter()
                .find(|e| e.reference == entry.reference && e.direction == entry.direction)
            {
                return Ok(LedgerInsert::Duplicate(existing.clone()));
            }
            entries.push(entry.clone());
            Ok(LedgerInsert::Inserted(entry.clone()))
        })
    }

    fn find_by_reference<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Vec<LedgerEntry>, OrderError>> {
        Box::pin(async move {
            Ok(self
                .entries
                .lock()
                .iter()
                .filter(|e| &e.reference == reference)
                .cloned()
                .collect())
        })
    }

    fn list_credits(&self) -> BoxFuture<'_, Result<Vec<LedgerEntry>, OrderError>> {
        Box::pin(async move {
            Ok(self
                .entries
                .lock()
                .iter()
                .filter(|e| e.direction == Direction::Credited)
                .cloned()
                .collect())
        })
    }

    fn record_conflict<'a>(
        &'a self,
        conflict: &'a AmountConflict,
    ) -> BoxFuture<'a, Result<bool, OrderError>> {
        Box::pin(async move {
            let mut conflicts = self.conflicts.lock();
            if conflicts.iter().any(|c| {
                c.reference == conflict.reference && c.reported_amount == conflict.reported_amount
            }) {
                return Ok(false);
            }
            conflicts.push(conflict.clone());
            Ok(true)
        })
    }

    fn list_conflicts(&self) -> BoxFuture<'_, Result<Vec<AmountConflict>, OrderError>> {
        Box::pin(async move { Ok(self.conflicts.lock().clone()) })
    }
}

/// Stand-in for the external cart service, keyed by buyer id.
#[derive(Default)]
pub struct MemoryCart {
    carts: Mutex<HashMap<String, CartSnapshot>>,
}

impl MemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, buyer: &str, cart: CartSnapshot) {
        self.carts.lock().insert(buyer.to_string(), cart);
    }

    pub fn get(&self, buyer: &str) -> Option<CartSnapshot> {
        self.carts.lock().get(buyer).cloned()
    }
}

impl CartService for MemoryCart {
    fn load<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<CartSnapshot, OrderError>> {
        Box::pin(async move { Ok(self.get(buyer).unwrap_or_default()) })
    }

    fn clear<'a>(&'a self, buyer: &'a str) -> BoxFuture<'a, Result<(), OrderError>> {
        Box::pin(async move {
            self.carts.lock().remove(buyer);
            Ok(())
        })
    }
}
