//! # Lot Allocation
//!
//! Pure lot selection for a deduction request.
//!
//! ## How Allocation Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Request: 8 pcs of Widget (Std) at WarehouseX               │
//! │                                                             │
//! │  Candidates (FIFO: oldest intake first)                     │
//! │  ┌──────────────────────────────┐                           │
//! │  │ Lot A  date 2081-01-01  rem 5│ ── deduct 5 (drained)     │
//! │  │ Lot B  date 2081-02-01  rem 5│ ── deduct 3 (rem 2)       │
//! │  │ Lot C  date 2081-03-01  rem 9│ ── untouched              │
//! │  └──────────────────────────────┘                           │
//! │                                                             │
//! │  Plan: [(A, 5), (B, 3)]   Σ == 8                            │
//! │                                                             │
//! │  Total remaining < 8?  → InsufficientStock, no partial plan │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is computed entirely in memory; nothing is written anywhere.
//! Given the same candidates and request, repeated runs produce the
//! identical plan (candidates are sorted by intake date with lot id as the
//! tie-break).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{LotKey, StockLot};
use crate::validation::validate_quantity;

// =============================================================================
// Deduction Policy
// =============================================================================

/// Lot consumption ordering.
///
/// Chosen once per service and threaded to every allocation; no call site
/// decides the ordering locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeductionPolicy {
    /// First-in-first-out: oldest intake date consumed first.
    #[default]
    Fifo,
    /// Last-in-first-out: newest intake date consumed first.
    Lifo,
}

// =============================================================================
// Allocation Plan
// =============================================================================

/// One step of an allocation plan: deduct `quantity` from lot `lot_id`.
///
/// Carries the lot's unit price so line items can be priced without
/// re-reading the lot after allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotDeduction {
    pub lot_id: String,
    pub quantity: i64,
    pub amount_cents: i64,
}

// =============================================================================
// Planning
// =============================================================================

/// Plans which lots to draw from to satisfy `quantity` of `key`.
///
/// ## Algorithm
/// 1. Keep candidates matching `key` with `remaining > 0`.
/// 2. Sort by intake date per `policy`, ties broken by lot id ascending.
/// 3. Greedy walk: deduct `min(lot.remaining, still_needed)` per lot.
///
/// ## Returns
/// * `Ok(plan)` - deductions summing to exactly `quantity`
/// * `Err(InsufficientStock)` - total remaining < `quantity`; no partial plan
/// * `Err(Validation)` - `quantity <= 0`
///
/// A key matching no candidates is an `InsufficientStock` with available 0.
pub fn plan_deduction(
    key: &LotKey,
    quantity: i64,
    candidates: &[StockLot],
    policy: DeductionPolicy,
) -> CoreResult<Vec<LotDeduction>> {
    validate_quantity(quantity)?;

    let mut matching: Vec<&StockLot> = candidates
        .iter()
        .filter(|lot| lot.matches(key) && lot.has_remaining())
        .collect();

    matching.sort_by(|a, b| order_for(policy, a, b));

    let available: i64 = matching.iter().map(|lot| lot.remaining).sum();
    if available < quantity {
        return Err(CoreError::InsufficientStock {
            key: key.clone(),
            available,
            requested: quantity,
        });
    }

    let mut plan = Vec::new();
    let mut needed = quantity;
    for lot in matching {
        if needed == 0 {
            break;
        }
        let deduct = needed.min(lot.remaining);
        plan.push(LotDeduction {
            lot_id: lot.id.clone(),
            quantity: deduct,
            amount_cents: lot.amount_cents,
        });
        needed -= deduct;
    }

    Ok(plan)
}

/// Applies a plan to an in-memory snapshot, decrementing lot remainders.
///
/// Used by the bill builder so that lines allocated later in the same bill
/// observe the consumption of earlier lines. Deducting more than a lot's
/// remaining (or a negative amount) is an `InvalidDeduction` - a bug in the
/// plan, since `plan_deduction` never emits such steps.
pub fn apply_plan(snapshot: &mut [StockLot], plan: &[LotDeduction]) -> CoreResult<()> {
    for step in plan {
        let lot = snapshot
            .iter_mut()
            .find(|lot| lot.id == step.lot_id)
            .ok_or_else(|| CoreError::LotNotFound(step.lot_id.clone()))?;

        if step.quantity < 0 || step.quantity > lot.remaining {
            return Err(CoreError::InvalidDeduction {
                lot_id: lot.id.clone(),
                remaining: lot.remaining,
                requested: step.quantity,
            });
        }

        lot.remaining -= step.quantity;
    }

    Ok(())
}

fn order_for(policy: DeductionPolicy, a: &StockLot, b: &StockLot) -> Ordering {
    let by_date = match policy {
        DeductionPolicy::Fifo => a.date.cmp(&b.date),
        DeductionPolicy::Lifo => b.date.cmp(&a.date),
    };
    by_date.then_with(|| a.id.cmp(&b.id))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    fn key() -> LotKey {
        LotKey {
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
        }
    }

    fn lot(id: &str, date: &str, remaining: i64, amount_cents: i64) -> StockLot {
        StockLot {
            id: id.to_string(),
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
            quantity: remaining.max(1),
            remaining,
            amount_cents,
            total_cents: remaining.max(1) * amount_cents,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_single_lot_partial_consumption() {
        let lots = vec![lot("a", "2081-01-01", 10, 500)];
        let plan = plan_deduction(&key(), 4, &lots, DeductionPolicy::Fifo).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, "a");
        assert_eq!(plan[0].quantity, 4);
        assert_eq!(plan[0].amount_cents, 500);
    }

    #[test]
    fn test_fifo_spans_lots_oldest_first() {
        let lots = vec![
            lot("b", "2081-02-01", 5, 700),
            lot("a", "2081-01-01", 5, 500),
        ];
        let plan = plan_deduction(&key(), 8, &lots, DeductionPolicy::Fifo).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].lot_id.as_str(), plan[0].quantity), ("a", 5));
        assert_eq!((plan[1].lot_id.as_str(), plan[1].quantity), ("b", 3));
    }

    #[test]
    fn test_lifo_spans_lots_newest_first() {
        let lots = vec![
            lot("a", "2081-01-01", 5, 500),
            lot("b", "2081-02-01", 5, 700),
        ];
        let plan = plan_deduction(&key(), 8, &lots, DeductionPolicy::Lifo).unwrap();

        assert_eq!((plan[0].lot_id.as_str(), plan[0].quantity), ("b", 5));
        assert_eq!((plan[1].lot_id.as_str(), plan[1].quantity), ("a", 3));
    }

    #[test]
    fn test_equal_dates_tie_break_by_id() {
        let lots = vec![
            lot("z", "2081-01-01", 5, 500),
            lot("a", "2081-01-01", 5, 500),
        ];
        let plan = plan_deduction(&key(), 6, &lots, DeductionPolicy::Fifo).unwrap();

        assert_eq!(plan[0].lot_id, "a");
        assert_eq!(plan[1].lot_id, "z");
    }

    #[test]
    fn test_insufficient_stock_reports_shortfall() {
        let lots = vec![lot("a", "2081-01-01", 3, 500)];
        let err = plan_deduction(&key(), 5, &lots, DeductionPolicy::Fifo).unwrap_err();

        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_no_candidates_is_full_shortfall() {
        let err = plan_deduction(&key(), 5, &[], DeductionPolicy::Fifo).unwrap_err();
        assert_eq!(err.shortfall(), Some(5));
    }

    #[test]
    fn test_other_keys_and_drained_lots_ignored() {
        let mut other = lot("x", "2081-01-01", 50, 100);
        other.place = "WarehouseY".to_string();
        let lots = vec![other, lot("d", "2081-01-01", 0, 100)];

        let err = plan_deduction(&key(), 1, &lots, DeductionPolicy::Fifo).unwrap_err();
        assert_eq!(err.shortfall(), Some(1));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let lots = vec![lot("a", "2081-01-01", 10, 500)];
        let err = plan_deduction(&key(), 0, &lots, DeductionPolicy::Fifo).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_deterministic_plans() {
        let lots = vec![
            lot("c", "2081-01-03", 2, 500),
            lot("a", "2081-01-01", 2, 500),
            lot("b", "2081-01-02", 2, 500),
        ];
        let first = plan_deduction(&key(), 5, &lots, DeductionPolicy::Fifo).unwrap();
        let second = plan_deduction(&key(), 5, &lots, DeductionPolicy::Fifo).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_apply_plan_decrements_snapshot() {
        let mut snapshot = vec![lot("a", "2081-01-01", 5, 500)];
        let plan = vec![LotDeduction {
            lot_id: "a".to_string(),
            quantity: 3,
            amount_cents: 500,
        }];

        apply_plan(&mut snapshot, &plan).unwrap();
        assert_eq!(snapshot[0].remaining, 2);
    }

    #[test]
    fn test_apply_plan_guards_over_deduction() {
        let mut snapshot = vec![lot("a", "2081-01-01", 2, 500)];
        let plan = vec![LotDeduction {
            lot_id: "a".to_string(),
            quantity: 3,
            amount_cents: 500,
        }];

        let err = apply_plan(&mut snapshot, &plan).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeduction { .. }));
        assert_eq!(snapshot[0].remaining, 2);
    }
}
