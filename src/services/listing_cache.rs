use {
    crate::domain::{order::Order, store::OrderQuery},
    parking_lot::RwLock,
    std::{collections::HashMap, sync::Arc},
};

/// Distinct listings kept before the cache starts over. Query keys carry
/// caller-chosen filters, so the key space is open-ended.
pub const MAX_ENTRIES: usize = 256;

/// Order listings keyed by query shape.
///
/// Every order write must call [`OrderListCache::invalidate`]. A load that
/// started before an invalidation is not stored: each entry is tagged with
/// the generation it was read under, and [`OrderListCache::store`] drops
/// results from an older generation.
#[derive(Default)]
pub struct OrderListCache {
    inner: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<OrderQuery, Arc<Vec<Order>>>,
}

impl OrderListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached listing plus the generation to pass back to `store` on a miss.
    pub fn lookup(&self, query: &OrderQuery) -> (Option<Arc<Vec<Order>>>, u64) {
        let state = self.inner.read();
        (state.entries.get(query).cloned(), state.generation)
    }

    pub fn store(&self, query: OrderQuery, generation: u64, orders: Vec<Order>) -> Arc<Vec<Order>> {
        let orders = Arc::new(orders);
        let mut state = self.inner.write();
        if state.generation == generation {
            if state.entries.len() >= MAX_ENTRIES && !state.entries.contains_key(&query) {
                tracing::debug!(entries = state.entries.len(), "order listing cache full, clearing");
                state.entries.clear();
            }
            state.entries.insert(query, Arc::clone(&orders));
        }
        orders
    }

    pub fn invalidate(&self) {
        let mut state = self.inner.write();
        state.generation += 1;
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
