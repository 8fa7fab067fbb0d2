//! Invoice models and numbering formats

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days between issuing a sale invoice and its due date
pub const INVOICE_DUE_DAYS: i64 = 7;

/// Customer name used when a sale does not name one
pub const DEFAULT_CUSTOMER: &str = "Customer";

/// Payment state of an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invoice_status", rename_all = "snake_case")
)]
#[serde(rename_all = "PascalCase")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
}

impl std::str::FromStr for InvoiceStatus {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Paid" => Ok(InvoiceStatus::Paid),
            "Unpaid" => Ok(InvoiceStatus::Unpaid),
            other => Err(crate::DomainError::InvalidInvoiceStatus(other.to_string())),
        }
    }
}

/// One invoice line, snapshotted at creation and never recomputed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl InvoiceLineItem {
    pub fn new(product_name: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit_price,
            line_total: unit_price * Decimal::from(quantity),
        }
    }
}

/// An invoice issued by a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// `INV-00001` style, unique per owner
    pub invoice_code: String,
    pub reference_number: String,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub due_date: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<InvoiceLineItem>,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Format a per-owner sequence number as an invoice code
pub fn format_invoice_code(sequence: i64) -> String {
    format!("INV-{:05}", sequence)
}

/// Format a cosmetic reference number from six random base-36 characters and a timestamp
pub fn format_reference_number(random: &str, timestamp_millis: u64) -> String {
    let digits = timestamp_millis.to_string();
    let tail = &digits[digits.len().saturating_sub(6)..];
    format!("REF-{}-{}", random.to_ascii_uppercase(), tail)
}

/// Due date for an invoice issued at `issued_at`
pub fn due_date_from(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(INVOICE_DUE_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_invoice_code_is_zero_padded() {
        assert_eq!(format_invoice_code(1), "INV-00001");
        assert_eq!(format_invoice_code(42), "INV-00042");
        assert_eq!(format_invoice_code(99999), "INV-99999");
        assert_eq!(format_invoice_code(123456), "INV-123456");
    }

    #[test]
    fn test_reference_number_uses_timestamp_tail() {
        assert_eq!(
            format_reference_number("a1b2c3", 1_700_000_123_456),
            "REF-A1B2C3-123456"
        );
        assert_eq!(format_reference_number("ZZZZZZ", 42), "REF-ZZZZZZ-42");
    }

    #[test]
    fn test_line_total() {
        let item = InvoiceLineItem::new("Maggi", 6, Decimal::new(1050, 2));
        assert_eq!(item.line_total, Decimal::new(6300, 2));
    }

    #[test]
    fn test_due_date_is_seven_days_out() {
        let issued = Utc.with_ymd_and_hms(2026, 2, 25, 10, 0, 0).unwrap();
        assert_eq!(
            due_date_from(issued),
            Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("paid".parse::<InvoiceStatus>().is_err());
    }
}
