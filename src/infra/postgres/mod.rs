pub mod ledger_repo;
pub mod order_repo;

use {
    crate::domain::{
        error::OrderError,
        id::PaymentRef,
        ledger::{AmountConflict, LedgerEntry, LedgerInsert},
        order::{Order, OrderStatus},
        provider::BoxFuture,
        store::{
            CheckoutCommit, CheckoutWriter, LedgerStore, OrderInsert, OrderQuery, OrderStore,
            StatusUpdate,
        },
    },
    sqlx::PgPool,
    uuid::Uuid,
};

/// Orders and ledger in one Postgres database. A checkout's order and
/// credit commit in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn commit_paid_order_inner(
        &self,
        order: &Order,
        credit: &LedgerEntry,
    ) -> Result<CheckoutCommit, OrderError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        let order = order_repo::insert_if_absent(&mut tx, order).await?;
        let credit = ledger_repo::insert_if_absent(&mut tx, &order.credit_for(credit)).await?;
        tx.commit().await?;

        Ok(CheckoutCommit {
            order,
            credit: Some(credit),
        })
    }
}

impl CheckoutWriter for PgStore {
    fn commit_paid_order<'a>(
        &'a self,
        order: &'a Order,
        credit: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<CheckoutCommit, OrderError>> {
        Box::pin(self.commit_paid_order_inner(order, credit))
    }
}

impl OrderStore for PgStore {
    fn insert_if_absent<'a>(
        &'a self,
        order: &'a Order,
    ) -> BoxFuture<'a, Result<OrderInsert, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let result = order_repo::insert_if_absent(&mut tx, order).await?;
            tx.commit().await?;
            Ok(result)
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<Order>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let order = order_repo::get(&mut tx, id).await?;
            tx.commit().await?;
            Ok(order)
        })
    }

    fn find_by_payment_ref<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Option<Order>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let order = order_repo::find_by_payment_ref(&mut tx, reference).await?;
            tx.commit().await?;
            Ok(order)
        })
    }

    fn compare_and_set_status<'a>(
        &'a self,
        expected: OrderStatus,
        updated: &'a Order,
    ) -> BoxFuture<'a, Result<StatusUpdate, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET LOCAL lock_timeout = '5s'")
                .execute(&mut *tx)
                .await?;
            let result = order_repo::compare_and_set_status(&mut tx, expected, updated).await?;
            tx.commit().await?;
            Ok(result)
        })
    }

    fn list<'a>(&'a self, query: &'a OrderQuery) -> BoxFuture<'a, Result<Vec<Order>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let orders = order_repo::list(&mut tx, query).await?;
            tx.commit().await?;
            Ok(orders)
        })
    }
}

impl LedgerStore for PgStore {
    fn insert_if_absent<'a>(
        &'a self,
        entry: &'a LedgerEntry,
    ) -> BoxFuture<'a, Result<LedgerInsert, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let result = ledger_repo::insert_if_absent(&mut tx, entry).await?;
            tx.commit().await?;
            Ok(result)
        })
    }

    fn find_by_reference<'a>(
        &'a self,
        reference: &'a PaymentRef,
    ) -> BoxFuture<'a, Result<Vec<LedgerEntry>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let entries = ledger_repo::find_by_reference(&mut tx, reference).await?;
            tx.commit().await?;
            Ok(entries)
        })
    }

    fn list_credits(&self) -> BoxFuture<'_, Result<Vec<LedgerEntry>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let entries = ledger_repo::list_credits(&mut tx).await?;
            tx.commit().await?;
            Ok(entries)
        })
    }

    fn record_conflict<'a>(
        &'a self,
        conflict: &'a AmountConflict,
    ) -> BoxFuture<'a, Result<bool, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let recorded = ledger_repo::record_conflict(&mut tx, conflict).await?;
            tx.commit().await?;
            Ok(recorded)
        })
    }

    fn list_conflicts(&self) -> BoxFuture<'_, Result<Vec<AmountConflict>, OrderError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let conflicts = ledger_repo::list_conflicts(&mut tx).await?;
            tx.commit().await?;
            Ok(conflicts)
        })
    }
}
