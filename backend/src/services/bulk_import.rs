//! CSV product import parsing
//!
//! Headers are matched loosely: case, spaces, `_`, `-` and `.` are ignored,
//! and each field accepts several common spellings.

use csv::{ByteRecord, ReaderBuilder, Trim};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use shared::models::RawProductInput;

const NAME: &[&str] = &["Product Name", "productName", "name"];
const CODE: &[&str] = &["Product ID", "productId", "productCode", "id", "sku"];
const CATEGORY: &[&str] = &["Category", "category"];
const PRICE: &[&str] = &["Price", "Sales Price", "salesPrice", "salePrice", "mrp"];
const QUANTITY: &[&str] = &["Quantity", "qty", "stock", "available"];
const UNIT: &[&str] = &["Unit", "unit"];
const EXPIRY: &[&str] = &["Expiry Date", "expiryDate", "expiry", "exp"];
const THRESHOLD: &[&str] = &[
    "Threshold Value",
    "threshold",
    "thresholdValue",
    "minStock",
    "minimumStock",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One data row of an import file
#[derive(Debug, Clone)]
pub struct ImportRow {
    /// Spreadsheet line number; the header is row 1
    pub row: usize,
    pub input: RawProductInput,
}

/// A row that was not imported, with every reason found
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    pub row: usize,
    pub product_code: String,
    pub errors: Vec<String>,
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created_count: usize,
    pub rejected: Vec<RejectedRow>,
}

/// Lowercase and drop spaces, `_`, `-` and `.`
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(headers: &ByteRecord) -> Self {
        let mut map = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            // First column wins when two headers normalize the same
            map.entry(normalize_header(&String::from_utf8_lossy(header)))
                .or_insert(idx);
        }
        Self(map)
    }

    fn pick(&self, record: &ByteRecord, aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .find_map(|alias| self.0.get(&normalize_header(alias)))
            .and_then(|&idx| record.get(idx))
            .map(|field| String::from_utf8_lossy(field).into_owned())
    }
}

/// Parse an uploaded CSV into raw product rows.
///
/// Only a malformed file fails as a whole; field problems are left for
/// per-row validation. Fields that are not valid UTF-8 are decoded lossily
/// so a spreadsheet export in another encoding keeps its other rows.
pub fn parse_csv(bytes: &[u8]) -> AppResult<Vec<ImportRow>> {
    let data = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers = reader
        .byte_headers()
        .map_err(|e| AppError::Validation(format!("Invalid CSV header: {}", e)))?
        .clone();
    let index = HeaderIndex::new(&headers);

    let mut rows = Vec::new();
    for (i, record) in reader.byte_records().enumerate() {
        let record =
            record.map_err(|e| AppError::Validation(format!("Invalid CSV on row {}: {}", i + 2, e)))?;

        rows.push(ImportRow {
            row: i + 2,
            input: RawProductInput {
                name: index.pick(&record, NAME),
                product_code: index.pick(&record, CODE),
                category: index.pick(&record, CATEGORY),
                price: index.pick(&record, PRICE),
                quantity: index.pick(&record, QUANTITY),
                unit: index.pick(&record, UNIT),
                expiry_date: index.pick(&record, EXPIRY),
                threshold: index.pick(&record, THRESHOLD),
            },
        });
    }

    Ok(rows)
}
