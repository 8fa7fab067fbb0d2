//! Transaction ledger models
//!
//! The ledger is append-only; every dashboard aggregate is derived from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "transaction_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "PascalCase")]
pub enum TransactionKind {
    /// Stock sold; amount is revenue
    Sale,
    /// Stock brought in; amount is cost
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Purchase => "purchase",
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: TransactionKind,
    /// Cleared when the product is deleted; the name below survives
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub amount: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}
