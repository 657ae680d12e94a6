//! # Bill Builder
//!
//! Turns a [`BillRequest`](crate::types::BillRequest) into a validated
//! [`DraftBill`]: line items with resolved lot references and computed
//! totals, ready for the storage layer to commit atomically.
//!
//! ## Building a Bill
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. VALIDATE                                                │
//! │     bill number, at least one line, key fields, quantities  │
//! │                                                             │
//! │  2. ALLOCATE (against an owned snapshot, line by line)      │
//! │     line 1 ── plan ── apply to snapshot                     │
//! │     line 2 ── plan ── apply to snapshot  ← sees line 1's    │
//! │     ...                                    consumption      │
//! │                                                             │
//! │  3. PRICE                                                   │
//! │     one draft line per (lot, deduct) pair                   │
//! │     grand total = Σ line totals                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first line that cannot be satisfied aborts the whole build - no
//! partial draft is ever returned, so the storage layer either commits a
//! complete bill or writes nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::{apply_plan, plan_deduction, DeductionPolicy};
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{BillRequest, StockLot};
use crate::validation::{validate_bill_number, validate_key_field, validate_quantity};
use crate::MAX_BILL_LINES;

// =============================================================================
// Draft Types
// =============================================================================

/// One priced deduction of a built bill, tied to a specific lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLine {
    pub lot_id: String,
    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,
    pub quantity: i64,
    pub amount_cents: i64,
    pub total_cents: i64,
}

/// A validated, fully-allocated bill that has not been persisted yet.
///
/// Each draft line doubles as the lot deduction the commit must apply:
/// deduct `quantity` from `lot_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftBill {
    pub bill_number: String,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub grand_total_cents: i64,
    pub lines: Vec<DraftLine>,
}

impl DraftBill {
    /// Returns the grand total as a Money type.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Building
// =============================================================================

/// Builds a bill from a request and a snapshot of the current lots.
///
/// The snapshot is owned and mutated in memory as lines are allocated, so a
/// quantity consumed by an earlier line is reflected before the next line is
/// processed. The lot store itself is never touched here.
///
/// ## Returns
/// * `Ok(DraftBill)` - every line allocated; possibly more draft lines than
///   requested lines due to multi-lot splitting
/// * `Err(Validation)` - malformed request, nothing allocated
/// * `Err(InsufficientStock)` - some line cannot be satisfied, nothing
///   allocated for the caller to commit
pub fn build_bill(
    request: &BillRequest,
    mut snapshot: Vec<StockLot>,
    policy: DeductionPolicy,
) -> CoreResult<DraftBill> {
    validate_request(request)?;

    let mut lines = Vec::new();
    let mut grand_total = Money::zero();

    for line in &request.lines {
        let plan = plan_deduction(&line.key(), line.quantity, &snapshot, policy)?;
        apply_plan(&mut snapshot, &plan)?;

        for step in plan {
            let total = Money::from_cents(step.amount_cents) * step.quantity;
            grand_total += total;
            lines.push(DraftLine {
                lot_id: step.lot_id,
                product: line.product.clone(),
                kind: line.kind.clone(),
                place: line.place.clone(),
                unit: line.unit.clone(),
                quantity: step.quantity,
                amount_cents: step.amount_cents,
                total_cents: total.cents(),
            });
        }
    }

    Ok(DraftBill {
        bill_number: request.bill_number.trim().to_string(),
        bill_date: request.bill_date,
        grand_total_cents: grand_total.cents(),
        lines,
    })
}

/// Validates the whole request up front; allocation only starts on a
/// well-formed bill.
fn validate_request(request: &BillRequest) -> CoreResult<()> {
    validate_bill_number(&request.bill_number)?;

    if request.lines.is_empty() {
        return Err(ValidationError::required("lines").into());
    }

    if request.lines.len() > MAX_BILL_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_BILL_LINES as i64,
        }
        .into());
    }

    for line in &request.lines {
        validate_key_field("product", &line.product)?;
        validate_key_field("type", &line.kind)?;
        validate_key_field("place", &line.place)?;
        validate_key_field("unit", &line.unit)?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
