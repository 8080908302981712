use {
    crate::domain::{
        error::OrderError,
        id::{PaymentId, PaymentRef},
        ledger::{AmountConflict, Direction, EntrySource, LedgerEntry, LedgerInsert},
        money::MoneyAmount,
    },
    sqlx::{Postgres, Row, postgres::PgRow},
};

const ENTRY_COLUMNS: &str = "id, reference, payment_id, amount, direction, source, occurred_at";

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, OrderError> {
    let reference: String = row.try_get("reference")?;
    let payment_id: Option<String> = row.try_get("payment_id")?;
    let direction: String = row.try_get("direction")?;
    let source: String = row.try_get("source")?;

    Ok(LedgerEntry {
        id: row.try_get("id")?,
        reference: PaymentRef::new(reference)?,
        payment_id: payment_id.map(PaymentId::new).transpose()?,
        amount: MoneyAmount::new(row.try_get("amount")?)?,
        direction: Direction::try_from(direction.as_str())?,
        source: EntrySource::try_from(source.as_str())?,
        occurred_at: row.try_get("occurred_at")?,
    })
}

/// Insert-if-absent keyed by (reference, direction). Returns the stored
/// entry when another writer got there first.
pub async fn insert_if_absent(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> Result<LedgerInsert, OrderError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO ledger_entries
            (id, reference, payment_id, amount, direction, source, occurred_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (reference, direction) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(entry.id)
    .bind(entry.reference.as_str())
    .bind(entry.payment_id.as_ref().map(PaymentId::as_str))
    .bind(entry.amount.minor())
    .bind(entry.direction.as_str())
    .bind(entry.source.as_str())
    .bind(entry.occurred_at)
    .fetch_optional(&mut **tx)
    .await?;

    if inserted.is_some() {
        return Ok(LedgerInsert::Inserted(entry.clone()));
    }

    let row = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE reference = $1 AND direction = $2"
    ))
    .bind(entry.reference.as_str())
    .bind(entry.direction.as_str())
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(row) => Ok(LedgerInsert::Duplicate(entry_from_row(&row)?)),
        None => Err(OrderError::Store(format!(
            "ledger insert for {} conflicted but no row is visible",
            entry.reference
        ))),
    }
}

pub async fn find_by_reference(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    reference: &PaymentRef,
) -> Result<Vec<LedgerEntry>, OrderError> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE reference = $1 ORDER BY occurred_at"
    ))
    .bind(reference.as_str())
    .fetch_all(&mut **tx)
    .await?;
    rows.iter().map(entry_from_row).collect()
}

pub async fn list_credits(
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<Vec<LedgerEntry>, OrderError> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE direction = $1 ORDER BY occurred_at, id"
    ))
    .bind(Direction::Credited.as_str())
    .fetch_all(&mut **tx)
    .await?;
    rows.iter().map(entry_from_row).collect()
}

const CONFLICT_COLUMNS: &str =
    "id, reference, payment_id, ledger_amount, reported_amount, source, reported_at";

fn conflict_from_row(row: &PgRow) -> Result<AmountConflict, OrderError> {
    let reference: String = row.try_get("reference")?;
    let payment_id: Option<String> = row.try_get("payment_id")?;
    let source: String = row.try_get("source")?;

    Ok(AmountConflict {
        id: row.try_get("id")?,
        reference: PaymentRef::new(reference)?,
        payment_id: payment_id.map(PaymentId::new).transpose()?,
        ledger_amount: MoneyAmount::new(row.try_get("ledger_amount")?)?,
        reported_amount: MoneyAmount::new(row.try_get("reported_amount")?)?,
        source: EntrySource::try_from(source.as_str())?,
        reported_at: row.try_get("reported_at")?,
    })
}

/// Insert-if-absent keyed by (reference, reported_amount).
pub async fn record_conflict(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    conflict: &AmountConflict,
) -> Result<bool, OrderError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO ledger_amount_conflicts
            (id, reference, payment_id, ledger_amount, reported_amount, source, reported_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (reference, reported_amount) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(conflict.id)
    .bind(conflict.reference.as_str())
    .bind(conflict.payment_id.as_ref().map(PaymentId::as_str))
    .bind(conflict.ledger_amount.minor())
    .bind(conflict.reported_amount.minor())
    .bind(conflict.source.as_str())
    .bind(conflict.reported_at)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(inserted.is_some())
}

pub async fn list_conflicts(
    tx: &mut sqlx::Transaction<'_, Postgres>,
) -> Result<Vec<AmountConflict>, OrderError> {
    let rows = sqlx::query(&format!(
        "SELECT {CONFLICT_COLUMNS} FROM ledger_amount_conflicts ORDER BY reported_at, id"
    ))
    .fetch_all(&mut **tx)
    .await?;
    rows.iter().map(conflict_from_row).collect()
}
