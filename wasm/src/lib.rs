//! WebAssembly bindings for the Stockroom client
//!
//! Exposes the server's pure rules so the single-page app can preview
//! status badges, purchase prices and generated codes without a round trip:
//! - Stock status evaluation
//! - Purchase price derivation
//! - Invoice and product code formatting
//! - Card order validation
//! - Dashboard series labels

use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

pub use shared::analytics::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("stockroom-wasm loaded"));
}

/// Stock status wire value (`InStock`, `LowStock`, `OutOfStock`) for a quantity and threshold
#[wasm_bindgen]
pub fn evaluate_stock_status(quantity: i32, threshold: i32) -> String {
    let status = StockStatus::evaluate(quantity, threshold);
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Human-readable badge text for a quantity and threshold
#[wasm_bindgen]
pub fn stock_status_label(quantity: i32, threshold: i32) -> String {
    StockStatus::evaluate(quantity, threshold).to_string()
}

/// Purchase price for a sales price typed into a form, as a two-decimal string
#[wasm_bindgen]
pub fn preview_purchase_price(sales_price: &str) -> Result<String, JsValue> {
    let price = parse_amount(sales_price)
        .ok_or_else(|| JsValue::from_str("Invalid Price"))?;
    Ok(purchase_price_for(price).to_string())
}

/// Line total for a sale preview
#[wasm_bindgen]
pub fn preview_line_total(unit_price: &str, quantity: i32) -> Result<String, JsValue> {
    let price = Decimal::from_str(unit_price.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid price: {}", e)))?;
    Ok(InvoiceLineItem::new("", quantity, price).line_total.to_string())
}

#[wasm_bindgen]
pub fn invoice_code(sequence: f64) -> String {
    format_invoice_code(sequence as i64)
}

#[wasm_bindgen]
pub fn product_code(timestamp_millis: f64, suffix: &str) -> String {
    format_product_code(timestamp_millis as u64, suffix)
}

/// Validate a card order given as a JSON array of keys
#[wasm_bindgen]
pub fn validate_card_order(order_json: &str) -> Result<bool, JsValue> {
    let order: Vec<String> = serde_json::from_str(order_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid order JSON: {}", e)))?;
    Ok(parse_card_order(&order).is_ok())
}

fn labels_for(kind: &str, today: &str) -> Result<Vec<String>, String> {
    let today = parse_date(today).ok_or_else(|| format!("Invalid date: {}", today))?;
    let buckets = match kind {
        "monthly" => monthly_buckets(today),
        "weekly" => weekly_buckets(today),
        other => return Err(format!("Unknown series: {}", other)),
    };
    Ok(buckets.into_iter().map(|b| b.label).collect())
}

/// Chart labels for the `monthly` or `weekly` series ending on `today` (`YYYY-MM-DD`)
#[wasm_bindgen]
pub fn series_labels(kind: &str, today: &str) -> Result<js_sys::Array, JsValue> {
    let labels = labels_for(kind, today).map_err(|e| JsValue::from_str(&e))?;
    Ok(labels.iter().map(|l| JsValue::from_str(l)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_stock_status() {
        assert_eq!(evaluate_stock_status(10, 5), "InStock");
        assert_eq!(evaluate_stock_status(5, 5), "LowStock");
        assert_eq!(evaluate_stock_status(0, 5), "OutOfStock");
        assert_eq!(stock_status_label(3, 5), "Low stock");
    }

    #[test]
    fn test_preview_purchase_price() {
        assert_eq!(preview_purchase_price("100").unwrap(), "90.00");
        assert_eq!(preview_purchase_price("₹2.25").unwrap(), "2.03");
    }

    #[test]
    fn test_preview_line_total() {
        assert_eq!(preview_line_total("10.50", 6).unwrap(), "63.00");
    }

    #[test]
    fn test_codes() {
        assert_eq!(invoice_code(7.0), "INV-00007");
        assert_eq!(product_code(36.0, "ab12"), "PRD-10-AB12");
    }

    #[test]
    fn test_validate_card_order() {
        assert!(validate_card_order(r#"["sold","instock","revenue"]"#).unwrap());
        assert!(!validate_card_order(r#"["sold","sold","revenue"]"#).unwrap());
    }

    #[test]
    fn test_labels_for() {
        let weekly = labels_for("weekly", "2026-10-19").unwrap();
        assert_eq!(weekly.len(), 7);
        assert_eq!(weekly.last().map(String::as_str), Some("Mon"));

        let monthly = labels_for("monthly", "2026-10-19").unwrap();
        assert_eq!(monthly.first().map(String::as_str), Some("Nov"));
        assert_eq!(monthly.last().map(String::as_str), Some("Oct"));

        assert!(labels_for("yearly", "2026-10-19").is_err());
        assert!(labels_for("weekly", "19/10/2026").is_err());
    }
}
