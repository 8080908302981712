use {
    crate::domain::{
        cart::LineItem,
        error::OrderError,
        id::PaymentRef,
        money::MoneyAmount,
        order::{
            CustomerSnapshot, Order, OrderStatus, PaymentStatus, StatusChange, StoredOrderParts,
        },
        store::{OrderInsert, OrderQuery, StatusUpdate},
    },
    sqlx::{Postgres, QueryBuilder, Row, postgres::PgRow, types::Json},
    uuid::Uuid,
};

const ORDER_COLUMNS: &str = "id, customer, items, amount, status, payment_status, \
     external_payment_ref, status_history, category, created_at";

fn order_from_row(row: &PgRow) -> Result<Order, OrderError> {
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    let external_payment_ref: String = row.try_get("external_payment_ref")?;
    let Json(customer): Json<CustomerSnapshot> = row.try_get("customer")?;
    let Json(items): Json<Vec<LineItem>> = row.try_get("items")?;
    let Json(status_history): Json<Vec<StatusChange>> = row.try_get("status_history")?;

    Ok(Order::restore(StoredOrderParts {
        id: row.try_get("id")?,
        customer,
        items,
        amount: MoneyAmount::new(row.try_get("amount")?)?,
        status: OrderStatus::try_from(status.as_str())?,
        payment_status: PaymentStatus::try_from(payment_status.as_str())?,
        external_payment_ref: PaymentRef::new(external_payment_ref)?,
        status_history,
        category: row.try_get("category")?,
        created_at: row.try_get("created_at")?,
    }))
}

/// Insert the order unless its payment reference is already taken, in which
/// case the stored order is returned.
pub async fn insert_if_absent(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    order: &Order,
) -> Result<OrderInsert, OrderError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO orders
            (id, customer, items, amount, status, payment_status,
             external_payment_ref, status_history, category, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (external_payment_ref) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(order.id())
    .bind(Json(order.customer()))
    .bind(Json(order.items()))
    .bind(order.amount().minor())
    .bind(order.status().as_str())
    .bind(order.payment_status().as_str())
    .bind(order.external_payment_ref().as_str())
    .bind(Json(order.status_history()))
    .bind(order.category())
    .bind(order.created_at())
    .fetch_optional(&mut **tx)
    .await?;

    if inserted.is_some() {
        return Ok(OrderInsert::Inserted(order.clone()));
    }

    match find_by_payment_ref(tx, order.external_payment_ref()).await? {
        Some(existing) => Ok(OrderInsert::Existing(existing)),
        None => Err(OrderError::Store(format!(
            "order insert for {} conflicted but no row is visible",
            order.external_payment_ref()
        ))),
    }
}

pub async fn get(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Order>, OrderError> {
    let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.as_ref().map(order_from_row).transpose()
}

pub async fn find_by_payment_ref(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    reference: &PaymentRef,
) -> Result<Option<Order>, OrderError> {
    let row = sqlx::query(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE external_payment_ref = $1"
    ))
    .bind(reference.as_str())
    .fetch_optional(&mut **tx)
    .await?;
    row.as_ref().map(order_from_row).transpose()
}

/// Conditional update on the status the caller read. The `status = $4`
/// predicate is what serializes concurrent transitions of one order.
pub async fn compare_and_set_status(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    expected: OrderStatus,
    updated: &Order,
) -> Result<StatusUpdate, OrderError> {
    let applied = sqlx::query(
        r#"
        UPDATE orders
        SET status = $1, status_history = $2, updated_at = now()
        WHERE id = $3 AND status = $4
        RETURNING id
        "#,
    )
    .bind(updated.status().as_str())
    .bind(Json(updated.status_history()))
    .bind(updated.id())
    .bind(expected.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    if applied.is_some() {
        return Ok(StatusUpdate::Applied(updated.clone()));
    }

    let current: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(updated.id())
        .fetch_optional(&mut **tx)
        .await?;

    match current {
        None => Ok(StatusUpdate::NotFound),
        Some(status) => Ok(StatusUpdate::Conflict {
            current: OrderStatus::try_from(status.as_str())?,
        }),
    }
}

pub async fn list(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    query: &OrderQuery,
) -> Result<Vec<Order>, OrderError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));

    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(payment_status) = query.payment_status {
        qb.push(" AND payment_status = ")
            .push_bind(payment_status.as_str());
    }
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(from) = query.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        qb.push(" AND created_at < ").push_bind(to);
    }
    qb.push(" ORDER BY created_at, id");

    let rows = qb.build().fetch_all(&mut **tx).await?;
    rows.iter().map(order_from_row).collect()
}
