//! # Bill Repository
//!
//! Database operations for bills and bill items, including the one
//! transaction that makes a bill real.
//!
//! ## Commit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  One Bill Commit                            │
//! │                                                             │
//! │  DraftBill (validated + allocated in memory, no I/O yet)    │
//! │       │                                                     │
//! │       ▼ BEGIN                                               │
//! │  INSERT bill                                                │
//! │  for each draft line:                                       │
//! │      INSERT bill_item                                       │
//! │      UPDATE stock_lots                                      │
//! │          SET remaining = remaining - deduct                 │
//! │          WHERE id = lot AND remaining >= deduct  ← guard    │
//! │       │                                                     │
//! │       ├── guard missed → ROLLBACK, CommitConflict           │
//! │       ▼                                                     │
//! │  COMMIT                                                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write lands or none do. A failed commit leaves all lots at their
//! pre-commit remaining values, so the same bill can be resubmitted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{Bill, BillFilter, BillItem, BillWithItems, DraftBill};

const BILL_COLUMNS: &str = "id, bill_number, bill_date, grand_total_cents, created_at";

const ITEM_COLUMNS: &str = "id, bill_id, lot_id, product, kind, place, unit, \
     quantity, amount_cents, total_cents, created_at";

/// Repository for bill database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill by ID (header only).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets all items of a bill, in the order they were allocated.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY rowid"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a bill with its resolved items.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<BillWithItems>> {
        let Some(bill) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let items = self.get_items(&bill.id).await?;
        Ok(Some(BillWithItems { bill, items }))
    }

    /// Lists bills with their items, newest bill date first.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<Vec<BillWithItems>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT {BILL_COLUMNS}
            FROM bills
            WHERE (?1 IS NULL OR bill_number LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR bill_date >= ?2)
              AND (?3 IS NULL OR bill_date <= ?3)
            ORDER BY bill_date DESC, created_at DESC
            "#
        ))
        .bind(filter.bill_number.as_deref())
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(bills.len());
        for bill in bills {
            let items = self.get_items(&bill.id).await?;
            result.push(BillWithItems { bill, items });
        }

        Ok(result)
    }

    /// Commits a built bill atomically: the bill record, every item, and
    /// every lot decrement land in one transaction, or none of them do.
    ///
    /// Each decrement is guarded by `remaining >= deduct`. A guard that
    /// matches no row means the lot changed between snapshot and commit
    /// (or was deleted); the whole transaction rolls back and the error is
    /// a retryable [`DbError::CommitConflict`].
    pub async fn commit_draft(&self, draft: &DraftBill) -> DbResult<BillWithItems> {
        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            bill_number: draft.bill_number.clone(),
            bill_date: draft.bill_date,
            grand_total_cents: draft.grand_total_cents,
            created_at: now,
        };

        debug!(
            id = %bill.id,
            bill_number = %bill.bill_number,
            lines = draft.lines.len(),
            "Committing bill"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (id, bill_number, bill_date, grand_total_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(bill.bill_date)
        .bind(bill.grand_total_cents)
        .bind(bill.created_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item = BillItem {
                id: Uuid::new_v4().to_string(),
                bill_id: bill.id.clone(),
                lot_id: line.lot_id.clone(),
                product: line.product.clone(),
                kind: line.kind.clone(),
                place: line.place.clone(),
                unit: line.unit.clone(),
                quantity: line.quantity,
                amount_cents: line.amount_cents,
                total_cents: line.total_cents,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO bill_items (
                    id, bill_id, lot_id, product, kind, place, unit,
                    quantity, amount_cents, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&item.bill_id)
            .bind(&item.lot_id)
            .bind(&item.product)
            .bind(&item.kind)
            .bind(&item.place)
            .bind(&item.unit)
            .bind(item.quantity)
            .bind(item.amount_cents)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            let deducted = sqlx::query(
                r#"
                UPDATE stock_lots
                SET remaining = remaining - ?2, updated_at = ?3
                WHERE id = ?1 AND remaining >= ?2
                "#,
            )
            .bind(&line.lot_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if deducted.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(DbError::CommitConflict {
                    lot_id: line.lot_id.clone(),
                });
            }

            items.push(item);
        }

        tx.commit().await?;

        Ok(BillWithItems { bill, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use stockbook_core::bill::build_bill;
    use stockbook_core::{BillRequest, DeductionPolicy, LineRequest, NewLot};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_lot(quantity: i64, amount_cents: i64, date: &str) -> NewLot {
        NewLot {
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
            quantity,
            amount_cents,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    fn request(quantity: i64) -> BillRequest {
        BillRequest {
            bill_number: "INV-001".to_string(),
            bill_date: NaiveDate::from_ymd_opt(2081, 3, 1).unwrap(),
            lines: vec![LineRequest {
                product: "Widget".to_string(),
                kind: "Std".to_string(),
                place: "WarehouseX".to_string(),
                unit: "pcs".to_string(),
                quantity,
            }],
        }
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_stale_draft() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service.record_intake(new_lot(5, 500, "2081-01-01")).await.unwrap();

        // Build a draft against the current snapshot...
        let snapshot = db.lots().find_candidates(&lot.key()).await.unwrap();
        let draft = build_bill(&request(5), snapshot, DeductionPolicy::Fifo).unwrap();

        // ...then shrink the lot behind the draft's back.
        db.lots().apply_deduction(&lot.id, 2).await.unwrap();

        let err = db.bills().commit_draft(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::CommitConflict { .. }));

        // Rollback left no bill, no items, and the lot at its pre-commit value.
        assert!(db.bills().list(&Default::default()).await.unwrap().is_empty());
        let lot = db.lots().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.remaining, 3);
    }

    #[tokio::test]
    async fn test_commit_persists_bill_items_and_deductions() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service.record_intake(new_lot(10, 500, "2081-01-01")).await.unwrap();

        let snapshot = db.lots().find_candidates(&lot.key()).await.unwrap();
        let draft = build_bill(&request(4), snapshot, DeductionPolicy::Fifo).unwrap();

        let committed = db.bills().commit_draft(&draft).await.unwrap();
        assert_eq!(committed.items.len(), 1);
        assert_eq!(committed.bill.grand_total_cents, 2000);

        let reloaded = db
            .bills()
            .get_with_items(&committed.bill.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.items.len(), 1);
        assert_eq!(reloaded.items[0].lot_id, lot.id);
        assert_eq!(reloaded.items[0].quantity, 4);

        let lot = db.lots().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.remaining, 6);
    }
}
