//! Product catalog models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StockStatus;
use crate::validation::{amount_in_range, parse_amount, parse_date, parse_quantity};

/// Prefix of auto-assigned product codes
pub const PRODUCT_CODE_PREFIX: &str = "PRD";

/// A catalog product owned by one tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Human-readable code, unique per owner
    pub product_code: String,
    pub category: String,
    pub sales_price: Decimal,
    pub purchase_price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
    pub threshold: i32,
    pub status: StockStatus,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase price derived from the sales price: 90%, rounded half away from zero to cents
pub fn purchase_price_for(sales_price: Decimal) -> Decimal {
    let mut price = (sales_price * Decimal::new(9, 1))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(2);
    price
}

/// Cost recorded on the ledger when stock is brought in
pub fn purchase_amount(purchase_price: Decimal, quantity: i32) -> Decimal {
    purchase_price * Decimal::from(quantity)
}

/// Encode a non-negative integer in lowercase base 36
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Format an auto-assigned product code, e.g. `PRD-m2k1x9q0-7F2A`
pub fn format_product_code(timestamp_millis: u64, suffix: &str) -> String {
    format!(
        "{}-{}-{}",
        PRODUCT_CODE_PREFIX,
        to_base36(timestamp_millis),
        suffix.to_ascii_uppercase()
    )
}

/// Raw product fields as submitted by a form or an import row
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProductInput {
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub expiry_date: Option<String>,
    pub threshold: Option<String>,
}

/// A validated product ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub product_code: Option<String>,
    pub category: String,
    pub sales_price: Decimal,
    pub quantity: i32,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
    pub threshold: i32,
}

impl ProductDraft {
    /// Validate raw input, collecting every problem rather than stopping at the first
    pub fn parse(raw: &RawProductInput) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let name = non_blank(&raw.name);
        if name.is_none() {
            errors.push("Missing Product Name".to_string());
        }
        let category = non_blank(&raw.category);
        if category.is_none() {
            errors.push("Missing Category".to_string());
        }
        let sales_price = raw
            .price
            .as_deref()
            .and_then(parse_amount)
            .filter(|price| amount_in_range(*price));
        if sales_price.is_none() {
            errors.push("Invalid Price".to_string());
        }
        let quantity = raw.quantity.as_deref().and_then(parse_quantity);
        if quantity.is_none() {
            errors.push("Invalid Quantity".to_string());
        }
        let unit = non_blank(&raw.unit);
        if unit.is_none() {
            errors.push("Missing Unit".to_string());
        }
        let threshold = raw.threshold.as_deref().and_then(parse_quantity);
        if threshold.is_none() {
            errors.push("Invalid Threshold".to_string());
        }
        if let (Some(price), Some(quantity)) = (sales_price, quantity) {
            if !amount_in_range(purchase_amount(purchase_price_for(price), quantity)) {
                errors.push("Amount too large".to_string());
            }
        }
        let expiry_date = match non_blank(&raw.expiry_date) {
            None => None,
            Some(s) => match parse_date(&s) {
                Some(d) => Some(d),
                None => {
                    errors.push("Invalid Expiry Date".to_string());
                    None
                }
            },
        };

        match (name, category, sales_price, quantity, unit, threshold) {
            (Some(name), Some(category), Some(sales_price), Some(quantity), Some(unit), Some(threshold))
                if errors.is_empty() =>
            {
                Ok(ProductDraft {
                    name,
                    product_code: non_blank(&raw.product_code),
                    category,
                    sales_price,
                    quantity,
                    unit,
                    expiry_date,
                    threshold,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn purchase_price(&self) -> Decimal {
        purchase_price_for(self.sales_price)
    }

    pub fn initial_status(&self) -> StockStatus {
        StockStatus::evaluate(self.quantity, self.threshold)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
