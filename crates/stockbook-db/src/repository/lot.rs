//! # Stock Lot Repository
//!
//! Database operations for stock lots.
//!
//! ## Key Operations
//! - Intake inserts and descriptive edits
//! - Candidate queries for deduction planning
//! - Guarded remaining-quantity decrements
//! - The canonical stock summary read-model
//!
//! Candidate ordering here is a stable base order (`date ASC, id ASC`);
//! the allocation policy (FIFO/LIFO) is applied in exactly one place, the
//! selector in stockbook-core.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::{LotFilter, LotKey, LotPatch, StockLot, StockSummary};

const LOT_COLUMNS: &str = "id, product, kind, place, unit, quantity, remaining, \
     amount_cents, total_cents, date, created_at, updated_at";

/// Repository for stock lot database operations.
#[derive(Debug, Clone)]
pub struct LotRepository {
    pool: SqlitePool,
}

impl LotRepository {
    /// Creates a new LotRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LotRepository { pool }
    }

    /// Gets a lot by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockLot>> {
        let lot = sqlx::query_as::<_, StockLot>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lots WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lot)
    }

    /// Inserts a new lot.
    pub async fn insert(&self, lot: &StockLot) -> DbResult<()> {
        debug!(id = %lot.id, product = %lot.product, quantity = lot.quantity, "Inserting lot");

        sqlx::query(
            r#"
            INSERT INTO stock_lots (
                id, product, kind, place, unit,
                quantity, remaining, amount_cents, total_cents,
                date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&lot.id)
        .bind(&lot.product)
        .bind(&lot.kind)
        .bind(&lot.place)
        .bind(&lot.unit)
        .bind(lot.quantity)
        .bind(lot.remaining)
        .bind(lot.amount_cents)
        .bind(lot.total_cents)
        .bind(lot.date)
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists lots for display, newest intake date first.
    ///
    /// Each filter field narrows the result when set; `in_stock_only`
    /// drops fully-consumed lots.
    pub async fn list(&self, filter: &LotFilter) -> DbResult<Vec<StockLot>> {
        let lots = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            SELECT {LOT_COLUMNS}
            FROM stock_lots
            WHERE (?1 IS NULL OR product = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR place = ?3)
              AND (?4 IS NULL OR unit = ?4)
              AND (?5 = 0 OR remaining > 0)
            ORDER BY date DESC, id ASC
            "#
        ))
        .bind(filter.product.as_deref())
        .bind(filter.kind.as_deref())
        .bind(filter.place.as_deref())
        .bind(filter.unit.as_deref())
        .bind(filter.in_stock_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    /// All lots matching the classification key with stock left, in stable
    /// base order (`date ASC, id ASC`).
    pub async fn find_candidates(&self, key: &LotKey) -> DbResult<Vec<StockLot>> {
        let lots = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            SELECT {LOT_COLUMNS}
            FROM stock_lots
            WHERE product = ?1 AND kind = ?2 AND place = ?3 AND unit = ?4
              AND remaining > 0
            ORDER BY date ASC, id ASC
            "#
        ))
        .bind(&key.product)
        .bind(&key.kind)
        .bind(&key.place)
        .bind(&key.unit)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    /// Decrements a lot's remaining quantity, guarded against going below
    /// zero.
    ///
    /// ## Returns
    /// * `Err(Internal)` - negative amount: a bug in the caller's plan
    /// * `Err(NotFound)` - no such lot
    /// * `Err(CommitConflict)` - the lot has less remaining than `amount`
    pub async fn apply_deduction(&self, lot_id: &str, amount: i64) -> DbResult<()> {
        if amount < 0 {
            return Err(DbError::Internal(format!(
                "negative deduction {amount} for lot {lot_id}"
            )));
        }

        debug!(id = %lot_id, amount, "Applying deduction");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE stock_lots
            SET remaining = remaining - ?2, updated_at = ?3
            WHERE id = ?1 AND remaining >= ?2
            "#,
        )
        .bind(lot_id)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(lot_id).await? {
                Some(_) => Err(DbError::CommitConflict {
                    lot_id: lot_id.to_string(),
                }),
                None => Err(DbError::not_found("StockLot", lot_id)),
            };
        }

        Ok(())
    }

    /// Applies a partial edit to a lot's descriptive fields.
    ///
    /// `remaining` is never recomputed by an edit. If the new `quantity`
    /// falls below the current `remaining`, `remaining` is clamped down to
    /// the new `quantity` so the `remaining <= quantity` invariant holds.
    /// The stored `total_cents` is recomputed from the edited values.
    pub async fn update(&self, id: &str, patch: &LotPatch) -> DbResult<StockLot> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("StockLot", id))?;

        let quantity = patch.quantity.unwrap_or(current.quantity);
        let amount_cents = patch.amount_cents.unwrap_or(current.amount_cents);

        let updated = StockLot {
            id: current.id,
            product: patch.product.clone().unwrap_or(current.product),
            kind: patch.kind.clone().unwrap_or(current.kind),
            place: patch.place.clone().unwrap_or(current.place),
            unit: patch.unit.clone().unwrap_or(current.unit),
            quantity,
            remaining: current.remaining.min(quantity),
            amount_cents,
            total_cents: quantity * amount_cents,
            date: patch.date.unwrap_or(current.date),
            created_at: current.created_at,
            updated_at: Utc::now(),
        };

        debug!(id = %updated.id, "Updating lot");

        sqlx::query(
            r#"
            UPDATE stock_lots SET
                product = ?2,
                kind = ?3,
                place = ?4,
                unit = ?5,
                quantity = ?6,
                remaining = ?7,
                amount_cents = ?8,
                total_cents = ?9,
                date = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.product)
        .bind(&updated.kind)
        .bind(&updated.place)
        .bind(&updated.unit)
        .bind(updated.quantity)
        .bind(updated.remaining)
        .bind(updated.amount_cents)
        .bind(updated.total_cents)
        .bind(updated.date)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Sets a lot's remaining quantity directly (explicit reconciliation).
    /// Bounds are validated by the service before calling this.
    pub async fn set_remaining(&self, id: &str, remaining: i64) -> DbResult<()> {
        debug!(id = %id, remaining, "Adjusting remaining");

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE stock_lots SET remaining = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(remaining)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StockLot", id));
        }

        Ok(())
    }

    /// The canonical remaining-stock view, aggregated per classification
    /// key. Display consumers read this instead of recomputing from lots.
    pub async fn summarize(&self, filter: &LotFilter) -> DbResult<Vec<StockSummary>> {
        let summaries = sqlx::query_as::<_, StockSummary>(
            r#"
            SELECT
                product, kind, place, unit,
                SUM(quantity) AS quantity,
                SUM(remaining) AS remaining,
                SUM(total_cents) AS total_cents
            FROM stock_lots
            WHERE (?1 IS NULL OR product = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR place = ?3)
              AND (?4 IS NULL OR unit = ?4)
              AND (?5 = 0 OR remaining > 0)
            GROUP BY product, kind, place, unit
            ORDER BY product, kind, place, unit
            "#,
        )
        .bind(filter.product.as_deref())
        .bind(filter.kind.as_deref())
        .bind(filter.place.as_deref())
        .bind(filter.unit.as_deref())
        .bind(filter.in_stock_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    /// Counts lots (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_lots")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
