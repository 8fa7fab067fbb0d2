//! Stock status models

use serde::{Deserialize, Serialize};

/// Availability of a product, derived from quantity on hand and its reorder threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "stock_status", rename_all = "snake_case")
)]
#[serde(rename_all = "PascalCase")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Derive the status for a quantity and threshold.
    ///
    /// First match wins: nothing on hand is out of stock, anything up to and
    /// including the threshold is low stock, everything above is in stock.
    pub fn evaluate(quantity: i32, threshold: i32) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockStatus::InStock => write!(f, "In stock"),
            StockStatus::LowStock => write!(f, "Low stock"),
            StockStatus::OutOfStock => write!(f, "Out of stock"),
        }
    }
}

/// Stored status of one product, as read by the reconciliation sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSnapshot<Id> {
    pub id: Id,
    pub quantity: i32,
    pub threshold: i32,
    pub status: StockStatus,
}

/// Return the products whose stored status disagrees with the evaluated one,
/// paired with the corrected status.
pub fn drifted_statuses<Id: Clone>(
    snapshots: &[StockSnapshot<Id>],
) -> Vec<(Id, StockStatus)> {
    snapshots
        .iter()
        .filter_map(|s| {
            let fresh = StockStatus::evaluate(s.quantity, s.threshold);
            (fresh != s.status).then(|| (s.id.clone(), fresh))
        })
        .collect()
}
