//! # Billing Service
//!
//! The contract the desktop frontend calls over IPC: stock intake, bill
//! submission, lot edits, and the read paths for display tables.
//!
//! ## One Bill Submission
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  submit_bill                                                │
//! │                                                             │
//! │  Validating ── malformed request ──────────► Rejected       │
//! │      │            (no writes attempted)                     │
//! │      ▼                                                      │
//! │  Allocating ── InsufficientStock ──────────► Rejected       │
//! │      │            (computed in memory,                      │
//! │      │             no writes attempted)                     │
//! │      ▼                                                      │
//! │  Committing ── write fault / guard miss ──► RolledBack      │
//! │      │            (transaction undoes                       │
//! │      ▼             partial writes)                          │
//! │  Committed                                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation and allocation are pure and side-effect-free; only the
//! commit step performs writes, and the commit transaction is the only
//! rollback point.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use stockbook_core::bill::build_bill;
use stockbook_core::validation::{validate_amount_cents, validate_key_field, validate_quantity};
use stockbook_core::{
    BillFilter, BillRequest, BillWithItems, CoreError, DeductionPolicy, LotFilter, LotPatch,
    NewLot, StockLot, StockSummary, ValidationError,
};

use crate::error::DbError;
use crate::repository::bill::BillRepository;
use crate::repository::lot::LotRepository;

// =============================================================================
// Service Error
// =============================================================================

/// Boundary error for service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

impl ServiceError {
    /// Machine-readable code for the IPC boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            ServiceError::Core(CoreError::InsufficientStock { .. }) => ErrorCode::InsufficientStock,
            ServiceError::Core(CoreError::LotNotFound(_)) => ErrorCode::NotFound,
            ServiceError::Core(CoreError::InvalidDeduction { .. }) => ErrorCode::Internal,
            ServiceError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            ServiceError::Db(DbError::CommitConflict { .. }) => ErrorCode::CommitConflict,
            ServiceError::Db(_) => ErrorCode::DatabaseError,
        }
    }
}

/// Error codes for IPC responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,
    /// Input validation failed
    ValidationError,
    /// Requested quantity exceeds available stock
    InsufficientStock,
    /// Commit lost a race with another mutation; safe to retry
    CommitConflict,
    /// Database operation failed
    DatabaseError,
    /// Internal error
    Internal,
}

/// Serialized error shape the frontend receives.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Billing Service
// =============================================================================

/// Facade over the lot and bill repositories implementing the IPC contract.
///
/// Holds the deduction policy for the whole service; every allocation uses
/// it, so FIFO/LIFO is decided in exactly one place.
#[derive(Debug, Clone)]
pub struct BillingService {
    pool: SqlitePool,
    policy: DeductionPolicy,
}

impl BillingService {
    /// Creates a new BillingService with the given deduction policy.
    pub fn new(pool: SqlitePool, policy: DeductionPolicy) -> Self {
        BillingService { pool, policy }
    }

    /// The configured deduction policy.
    pub fn policy(&self) -> DeductionPolicy {
        self.policy
    }

    fn lots(&self) -> LotRepository {
        LotRepository::new(self.pool.clone())
    }

    fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Stock Intake & Edits
    // =========================================================================

    /// Records a stock intake, creating a lot with `remaining = quantity`.
    pub async fn record_intake(&self, new: NewLot) -> ServiceResult<StockLot> {
        validate_key_field("product", &new.product)?;
        validate_key_field("type", &new.kind)?;
        validate_key_field("place", &new.place)?;
        validate_key_field("unit", &new.unit)?;
        validate_quantity(new.quantity)?;
        validate_amount_cents(new.amount_cents)?;

        let now = Utc::now();
        let lot = StockLot {
            id: Uuid::new_v4().to_string(),
            product: new.product,
            kind: new.kind,
            place: new.place,
            unit: new.unit,
            quantity: new.quantity,
            remaining: new.quantity,
            amount_cents: new.amount_cents,
            total_cents: new.quantity * new.amount_cents,
            date: new.date,
            created_at: now,
            updated_at: now,
        };

        self.lots().insert(&lot).await?;

        info!(id = %lot.id, product = %lot.product, quantity = lot.quantity, "Recorded intake");
        Ok(lot)
    }

    /// Edits a lot's descriptive fields.
    ///
    /// `remaining` is preserved, clamped to the new `quantity` when the
    /// edit shrinks the lot below what is still unconsumed. Already-issued
    /// bill items are never repriced.
    pub async fn edit_lot(&self, lot_id: &str, patch: LotPatch) -> ServiceResult<StockLot> {
        if let Some(product) = &patch.product {
            validate_key_field("product", product)?;
        }
        if let Some(kind) = &patch.kind {
            validate_key_field("type", kind)?;
        }
        if let Some(place) = &patch.place {
            validate_key_field("place", place)?;
        }
        if let Some(unit) = &patch.unit {
            validate_key_field("unit", unit)?;
        }
        if let Some(quantity) = patch.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(amount_cents) = patch.amount_cents {
            validate_amount_cents(amount_cents)?;
        }

        let lot = self.lots().update(lot_id, &patch).await?;
        info!(id = %lot.id, "Edited lot");
        Ok(lot)
    }

    /// Explicitly sets a lot's remaining quantity (reconciliation after a
    /// physical recount). Rejects values outside `0 ..= quantity`.
    pub async fn adjust_remaining(&self, lot_id: &str, remaining: i64) -> ServiceResult<StockLot> {
        let lots = self.lots();
        let lot = lots
            .get_by_id(lot_id)
            .await?
            .ok_or_else(|| DbError::not_found("StockLot", lot_id))?;

        if remaining < 0 || remaining > lot.quantity {
            return Err(ValidationError::OutOfRange {
                field: "remaining".to_string(),
                min: 0,
                max: lot.quantity,
            }
            .into());
        }

        lots.set_remaining(lot_id, remaining).await?;
        info!(id = %lot_id, remaining, "Adjusted remaining");

        Ok(StockLot { remaining, ..lot })
    }

    // =========================================================================
    // Billing
    // =========================================================================

    /// Submits a bill: validates, allocates against a snapshot of the
    /// current lots, and commits everything atomically.
    ///
    /// ## Returns
    /// * `Ok(BillWithItems)` - the committed bill with resolved items
    /// * `Err` with code `VALIDATION_ERROR` - malformed request, no writes
    /// * `Err` with code `INSUFFICIENT_STOCK` - some line cannot be
    ///   satisfied; no lot in the entire bill is touched
    /// * `Err` with code `COMMIT_CONFLICT` - write-layer conflict, rolled
    ///   back; safe to resubmit
    pub async fn submit_bill(&self, request: BillRequest) -> ServiceResult<BillWithItems> {
        debug!(
            bill_number = %request.bill_number,
            lines = request.lines.len(),
            "Submitting bill"
        );

        let snapshot = self
            .lots()
            .list(&LotFilter {
                in_stock_only: true,
                ..LotFilter::default()
            })
            .await?;

        let draft = build_bill(&request, snapshot, self.policy)?;
        let committed = self.bills().commit_draft(&draft).await?;

        info!(
            id = %committed.bill.id,
            bill_number = %committed.bill.bill_number,
            items = committed.items.len(),
            grand_total = %committed.bill.grand_total(),
            "Bill committed"
        );

        Ok(committed)
    }

    // =========================================================================
    // Read Paths
    // =========================================================================

    /// Lists lots for display, newest intake date first.
    pub async fn list_lots(&self, filter: LotFilter) -> ServiceResult<Vec<StockLot>> {
        Ok(self.lots().list(&filter).await?)
    }

    /// The canonical remaining-stock view per classification key.
    pub async fn stock_summary(&self, filter: LotFilter) -> ServiceResult<Vec<StockSummary>> {
        Ok(self.lots().summarize(&filter).await?)
    }

    /// Lists bills with resolved items, newest bill date first.
    pub async fn list_bills(&self, filter: BillFilter) -> ServiceResult<Vec<BillWithItems>> {
        Ok(self.bills().list(&filter).await?)
    }

    /// Gets one bill with resolved items.
    pub async fn get_bill(&self, id: &str) -> ServiceResult<BillWithItems> {
        self.bills()
            .get_with_items(id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", id).into())
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
    use stockbook_core::LineRequest;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn widget_lot(quantity: i64, amount_cents: i64, date: &str) -> NewLot {
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

    fn widget_line(quantity: i64) -> LineRequest {
        LineRequest {
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
            quantity,
        }
    }

    fn bill_request(lines: Vec<LineRequest>) -> BillRequest {
        BillRequest {
            bill_number: "INV-001".to_string(),
            bill_date: NaiveDate::from_ymd_opt(2081, 3, 1).unwrap(),
            lines,
        }
    }

    #[tokio::test]
    async fn test_record_intake_starts_full() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(10, 500, "2081-01-01"))
            .await
            .unwrap();

        assert_eq!(lot.remaining, 10);
        assert_eq!(lot.total_cents, 5000);

        let listed = service.list_lots(LotFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, lot.id);
    }

    #[tokio::test]
    async fn test_record_intake_rejects_bad_input() {
        let db = test_db().await;
        let service = db.billing();

        let mut bad = widget_lot(10, 500, "2081-01-01");
        bad.product = "".to_string();
        let err = service.record_intake(bad).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service
            .record_intake(widget_lot(0, 500, "2081-01-01"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_submit_bill_single_lot() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(10, 500, "2081-01-01"))
            .await
            .unwrap();

        let bill = service
            .submit_bill(bill_request(vec![widget_line(4)]))
            .await
            .unwrap();

        assert_eq!(bill.items.len(), 1);
        assert_eq!(bill.items[0].lot_id, lot.id);
        assert_eq!(bill.items[0].quantity, 4);
        assert_eq!(bill.items[0].total_cents, 2000);
        assert_eq!(bill.bill.grand_total_cents, 2000);

        let lot = db.lots().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.remaining, 6);
    }

    #[tokio::test]
    async fn test_submit_bill_fifo_spans_lots() {
        let db = test_db().await;
        let service = db.billing();

        let a = service
            .record_intake(widget_lot(5, 500, "2081-01-01"))
            .await
            .unwrap();
        let b = service
            .record_intake(widget_lot(5, 700, "2081-02-01"))
            .await
            .unwrap();

        let bill = service
            .submit_bill(bill_request(vec![widget_line(8)]))
            .await
            .unwrap();

        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.items[0].lot_id, a.id);
        assert_eq!(bill.items[0].quantity, 5);
        assert_eq!(bill.items[1].lot_id, b.id);
        assert_eq!(bill.items[1].quantity, 3);
        assert_eq!(bill.bill.grand_total_cents, 5 * 500 + 3 * 700);

        let a = db.lots().get_by_id(&a.id).await.unwrap().unwrap();
        let b = db.lots().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(a.remaining, 0);
        assert_eq!(b.remaining, 2);
    }

    #[tokio::test]
    async fn test_submit_bill_lifo_policy() {
        let db = test_db().await;
        let service = db.billing_with_policy(DeductionPolicy::Lifo);

        service
            .record_intake(widget_lot(5, 500, "2081-01-01"))
            .await
            .unwrap();
        let newest = service
            .record_intake(widget_lot(5, 700, "2081-02-01"))
            .await
            .unwrap();

        let bill = service
            .submit_bill(bill_request(vec![widget_line(3)]))
            .await
            .unwrap();

        assert_eq!(bill.items.len(), 1);
        assert_eq!(bill.items[0].lot_id, newest.id);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_store_untouched() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(3, 500, "2081-01-01"))
            .await
            .unwrap();

        let err = service
            .submit_bill(bill_request(vec![widget_line(5)]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        match err {
            ServiceError::Core(core) => assert_eq!(core.shortfall(), Some(2)),
            other => panic!("expected core error, got {other:?}"),
        }

        let lot = db.lots().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.remaining, 3);
        assert!(service.list_bills(BillFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsatisfiable_second_line_rejects_whole_bill() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(5, 500, "2081-01-01"))
            .await
            .unwrap();

        let err = service
            .submit_bill(bill_request(vec![widget_line(4), widget_line(4)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        // First line's lot untouched, no bill created.
        let lot = db.lots().get_by_id(&lot.id).await.unwrap().unwrap();
        assert_eq!(lot.remaining, 5);
        assert!(service.list_bills(BillFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_preserves_remaining_and_clamps() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(10, 500, "2081-01-01"))
            .await
            .unwrap();
        service
            .submit_bill(bill_request(vec![widget_line(4)]))
            .await
            .unwrap();

        // Edit that doesn't shrink below remaining: remaining preserved.
        let edited = service
            .edit_lot(
                &lot.id,
                LotPatch {
                    quantity: Some(8),
                    amount_cents: Some(600),
                    ..LotPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.remaining, 6);
        assert_eq!(edited.total_cents, 8 * 600);

        // Edit below remaining: clamped so remaining <= quantity holds.
        let edited = service
            .edit_lot(
                &lot.id,
                LotPatch {
                    quantity: Some(2),
                    ..LotPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.quantity, 2);
        assert_eq!(edited.remaining, 2);
    }

    #[tokio::test]
    async fn test_edit_does_not_reprice_issued_items() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(10, 500, "2081-01-01"))
            .await
            .unwrap();
        let bill = service
            .submit_bill(bill_request(vec![widget_line(4)]))
            .await
            .unwrap();

        service
            .edit_lot(
                &lot.id,
                LotPatch {
                    amount_cents: Some(900),
                    ..LotPatch::default()
                },
            )
            .await
            .unwrap();

        let reloaded = service.get_bill(&bill.bill.id).await.unwrap();
        assert_eq!(reloaded.items[0].amount_cents, 500);
        assert_eq!(reloaded.bill.grand_total_cents, 2000);
    }

    #[tokio::test]
    async fn test_adjust_remaining_bounds() {
        let db = test_db().await;
        let service = db.billing();

        let lot = service
            .record_intake(widget_lot(10, 500, "2081-01-01"))
            .await
            .unwrap();

        let adjusted = service.adjust_remaining(&lot.id, 7).await.unwrap();
        assert_eq!(adjusted.remaining, 7);

        let err = service.adjust_remaining(&lot.id, 11).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service.adjust_remaining(&lot.id, -1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service.adjust_remaining("missing", 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_stock_summary_aggregates_by_key() {
        let db = test_db().await;
        let service = db.billing();

        service
            .record_intake(widget_lot(5, 500, "2081-01-01"))
            .await
            .unwrap();
        service
            .record_intake(widget_lot(5, 700, "2081-02-01"))
            .await
            .unwrap();
        let mut other = widget_lot(3, 100, "2081-01-15");
        other.place = "WarehouseY".to_string();
        service.record_intake(other).await.unwrap();

        service
            .submit_bill(bill_request(vec![widget_line(6)]))
            .await
            .unwrap();

        let summary = service.stock_summary(LotFilter::default()).await.unwrap();
        assert_eq!(summary.len(), 2);

        let x = summary
            .iter()
            .find(|s| s.place == "WarehouseX")
            .unwrap();
        assert_eq!(x.quantity, 10);
        assert_eq!(x.remaining, 4);
        assert_eq!(x.total_cents, 5 * 500 + 5 * 700);
    }

    #[tokio::test]
    async fn test_list_bills_newest_first_with_filter() {
        let db = test_db().await;
        let service = db.billing();

        service
            .record_intake(widget_lot(20, 500, "2081-01-01"))
            .await
            .unwrap();

        let mut first = bill_request(vec![widget_line(2)]);
        first.bill_number = "INV-OLD".to_string();
        first.bill_date = NaiveDate::from_ymd_opt(2081, 2, 1).unwrap();
        service.submit_bill(first).await.unwrap();

        let mut second = bill_request(vec![widget_line(3)]);
        second.bill_number = "INV-NEW".to_string();
        second.bill_date = NaiveDate::from_ymd_opt(2081, 3, 1).unwrap();
        service.submit_bill(second).await.unwrap();

        let bills = service.list_bills(BillFilter::default()).await.unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].bill.bill_number, "INV-NEW");
        assert!(!bills[0].items.is_empty());

        let filtered = service
            .list_bills(BillFilter {
                bill_number: Some("OLD".to_string()),
                ..BillFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].bill.bill_number, "INV-OLD");

        let ranged = service
            .list_bills(BillFilter {
                from_date: NaiveDate::from_ymd_opt(2081, 2, 15),
                ..BillFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].bill.bill_number, "INV-NEW");
    }

    #[tokio::test]
    async fn test_api_error_shape() {
        let db = test_db().await;
        let service = db.billing();

        let err = service
            .submit_bill(bill_request(vec![widget_line(1)]))
            .await
            .unwrap_err();

        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::InsufficientStock);
        let json = serde_json::to_string(&api).unwrap();
        assert!(json.contains("\"code\":\"INSUFFICIENT_STOCK\""));
    }
}
