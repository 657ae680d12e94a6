//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Domain Types                          │
//! │                                                             │
//! │  ┌───────────────┐  ┌───────────────┐  ┌────────────────┐   │
//! │  │   StockLot    │  │     Bill      │  │    BillItem    │   │
//! │  │  ───────────  │  │  ───────────  │  │  ────────────  │   │
//! │  │  id (UUID)    │  │  id (UUID)    │  │  id (UUID)     │   │
//! │  │  key fields   │  │  bill_number  │  │  bill_id (FK)  │   │
//! │  │  quantity     │  │  bill_date    │  │  lot_id (FK)   │   │
//! │  │  remaining    │  │  grand_total  │  │  quantity      │   │
//! │  └───────────────┘  └───────────────┘  └────────────────┘   │
//! │                                                             │
//! │  LotKey = (product, type, place, unit)                      │
//! │  Two lots with the same key are interchangeable for         │
//! │  deduction purposes.                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row-shaped types (`StockLot`, `Bill`, `BillItem`) derive `sqlx::FromRow`
//! behind the `sqlx` feature so stockbook-db can map them straight from
//! queries without this crate taking a database dependency by default.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Classification Key
// =============================================================================

/// The (product, type, place, unit) tuple identifying fungible lots.
///
/// Four free-text strings. Lots sharing a key are drawn from interchangeably
/// when a bill line is allocated. `type` is a Rust keyword, so the field is
/// named `kind` internally and renamed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotKey {
    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,
}

impl fmt::Display for LotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) at {} [{}]",
            self.product, self.kind, self.place, self.unit
        )
    }
}

// =============================================================================
// Stock Lot
// =============================================================================

/// One discrete intake record of a product at a given date and price.
///
/// `remaining` starts equal to `quantity` and only decreases as bills
/// consume the lot. Invariant: `0 <= remaining <= quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLot {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product name.
    pub product: String,

    /// Product type/variant.
    #[serde(rename = "type")]
    pub kind: String,

    /// Storage place.
    pub place: String,

    /// Measurement unit.
    pub unit: String,

    /// Original lot size at intake.
    pub quantity: i64,

    /// Unconsumed quantity.
    pub remaining: i64,

    /// Unit price in cents, fixed at intake.
    pub amount_cents: i64,

    /// quantity × amount_cents, stored for display.
    pub total_cents: i64,

    /// Intake date, used only for deduction ordering.
    #[ts(as = "String")]
    pub date: NaiveDate,

    /// When the lot was recorded.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the lot was last edited.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    /// Returns the classification key of this lot.
    pub fn key(&self) -> LotKey {
        LotKey {
            product: self.product.clone(),
            kind: self.kind.clone(),
            place: self.place.clone(),
            unit: self.unit.clone(),
        }
    }

    /// Checks whether this lot belongs to the given classification key.
    pub fn matches(&self, key: &LotKey) -> bool {
        self.product == key.product
            && self.kind == key.kind
            && self.place == key.place
            && self.unit == key.unit
    }

    /// Returns the unit price as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the stored lot total as a Money type.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks whether the lot still has unconsumed stock.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.remaining > 0
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A committed bill. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,

    /// User-assigned identifier. Free text, not required to be unique.
    pub bill_number: String,

    #[ts(as = "String")]
    pub bill_date: NaiveDate,

    /// Sum of the bill's item totals, computed at build time.
    pub grand_total_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Returns the grand total as a Money type.
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line item of a committed bill, tied to the specific lot it drew from.
///
/// The classification key is copied onto the item so display stays stable
/// even if the referenced lot is edited later. One requested bill line may
/// produce several items when it was satisfied from several lots.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub lot_id: String,

    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,

    /// Amount deducted from the referenced lot.
    pub quantity: i64,

    /// Unit price in cents, copied from the lot at deduction time.
    pub amount_cents: i64,

    /// quantity × amount_cents.
    pub total_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the item total as a Money type.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A bill with its resolved line items, as returned to display consumers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillWithItems {
    #[serde(flatten)]
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

// =============================================================================
// Requests
// =============================================================================

/// Stock intake request. `remaining` is not accepted from the caller;
/// a new lot always starts with `remaining = quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLot {
    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,
    pub quantity: i64,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
}

impl NewLot {
    /// Returns the classification key of the lot being created.
    pub fn key(&self) -> LotKey {
        LotKey {
            product: self.product.clone(),
            kind: self.kind.clone(),
            place: self.place.clone(),
            unit: self.unit.clone(),
        }
    }
}

/// Partial lot edit. `None` fields are left unchanged.
///
/// Editing never recomputes `remaining`; the store clamps it to the new
/// `quantity` if the edit would otherwise leave `remaining > quantity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotPatch {
    pub product: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub place: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<i64>,
    pub amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
}

/// One requested bill line: a classification key plus the quantity to draw.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,
    pub quantity: i64,
}

impl LineRequest {
    /// Returns the classification key this line draws from.
    pub fn key(&self) -> LotKey {
        LotKey {
            product: self.product.clone(),
            kind: self.kind.clone(),
            place: self.place.clone(),
            unit: self.unit.clone(),
        }
    }
}

/// A bill submission: header fields plus the requested lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillRequest {
    pub bill_number: String,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub lines: Vec<LineRequest>,
}

// =============================================================================
// Filters & Read-Model
// =============================================================================

/// Display filter for lot listings and stock summaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LotFilter {
    pub product: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub place: Option<String>,
    pub unit: Option<String>,
    /// When true, only lots with `remaining > 0` are returned.
    pub in_stock_only: bool,
}

/// Display filter for bill listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillFilter {
    pub bill_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub from_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to_date: Option<NaiveDate>,
}

/// The canonical "what's left" view over a classification key.
///
/// Every display consumer reads remaining stock through this one shape
/// instead of recomputing it from raw lots.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockSummary {
    pub product: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub place: String,
    pub unit: String,
    /// Total intake quantity across all lots of the key.
    pub quantity: i64,
    /// Total unconsumed quantity across all lots of the key.
    pub remaining: i64,
    /// Total intake value in cents across all lots of the key.
    pub total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(remaining: i64) -> StockLot {
        StockLot {
            id: "lot-1".to_string(),
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
            quantity: 10,
            remaining,
            amount_cents: 500,
            total_cents: 5000,
            date: NaiveDate::from_ymd_opt(2081, 1, 1).unwrap(),
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_lot_key_display() {
        let key = lot(10).key();
        assert_eq!(key.to_string(), "Widget (Std) at WarehouseX [pcs]");
    }

    #[test]
    fn test_lot_helpers() {
        let l = lot(4);
        assert!(l.has_remaining());
        assert_eq!(l.amount().cents(), 500);
        assert_eq!(l.total().cents(), 5000);

        assert!(!lot(0).has_remaining());
    }

    #[test]
    fn test_key_equality_across_types() {
        let l = lot(1);
        let line = LineRequest {
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
            quantity: 3,
        };
        assert_eq!(l.key(), line.key());
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let key = lot(1).key();
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.contains("\"type\":\"Std\""));
    }
}
