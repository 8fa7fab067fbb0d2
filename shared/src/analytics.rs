//! Time-bucketed aggregation over the transaction ledger
//!
//! Storage groups ledger amounts by *local* calendar day (see [`local_day`]);
//! this module lays out the fixed bucket grids and folds those daily totals
//! into them. Bucket boundaries and labels are both derived from the same
//! reporting offset, so a label always describes the amounts beneath it.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Product, StockStatus, TransactionKind};

/// Number of monthly buckets, current month included
pub const MONTHLY_BUCKETS: usize = 12;
/// Number of daily buckets, today included
pub const WEEKLY_BUCKETS: usize = 7;
/// Number of entries in the top-selling list
pub const TOP_SELLING_LIMIT: usize = 5;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One slot of a time series: the local days `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Bucket {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day < self.end
    }
}

/// Ledger amounts of one kind on one local day
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Decimal,
}

/// A point on the sales/purchase chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub sales: Decimal,
    pub purchase: Decimal,
}

/// Calendar day of `at` in the reporting timezone
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// UTC instant at which `day` begins in the reporting timezone
pub fn local_midnight_utc(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let midnight = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

/// Shift a `(year, month)` pair by `delta` months
fn add_months(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// The trailing twelve calendar months ending with the month of `today`, oldest first
pub fn monthly_buckets(today: NaiveDate) -> Vec<Bucket> {
    (0..MONTHLY_BUCKETS as i32)
        .rev()
        .map(|back| {
            let (year, month) = add_months(today.year(), today.month(), -back);
            let (next_year, next_month) = add_months(year, month, 1);
            Bucket {
                label: MONTH_LABELS[month as usize - 1].to_string(),
                start: first_of_month(year, month),
                end: first_of_month(next_year, next_month),
            }
        })
        .collect()
}

/// The trailing seven calendar days ending with `today`, oldest first
pub fn weekly_buckets(today: NaiveDate) -> Vec<Bucket> {
    (0..WEEKLY_BUCKETS as i64)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            Bucket {
                label: day.format("%a").to_string(),
                start: day,
                end: day + Duration::days(1),
            }
        })
        .collect()
}

/// First local day covered by a bucket grid
pub fn window_start(buckets: &[Bucket]) -> Option<NaiveDate> {
    buckets.first().map(|b| b.start)
}

/// Fold daily totals into the bucket grid. Every bucket is present; days
/// outside the grid are ignored.
pub fn fill_series(buckets: &[Bucket], totals: &[DailyTotal]) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = buckets
        .iter()
        .map(|b| SeriesPoint {
            label: b.label.clone(),
            sales: Decimal::ZERO,
            purchase: Decimal::ZERO,
        })
        .collect();

    for total in totals {
        if let Some(index) = buckets.iter().position(|b| b.contains(total.day)) {
            let point = &mut points[index];
            match total.kind {
                TransactionKind::Sale => point.sales += total.amount,
                TransactionKind::Purchase => point.purchase += total.amount,
            }
        }
    }

    points
}

/// Summed sales of one product name
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SellerTotal {
    pub product_name: String,
    pub quantity: i64,
    pub amount: Decimal,
}

/// An entry of the top-selling list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSeller {
    pub name: String,
    pub qty: i64,
    pub amount: Decimal,
    pub image_url: Option<String>,
}

/// Order sellers by quantity sold, highest first, breaking ties by name
/// ascending, and keep the first `limit`.
pub fn rank_top_sellers(mut totals: Vec<SellerTotal>, limit: usize) -> Vec<SellerTotal> {
    totals.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    totals.truncate(limit);
    totals
}

/// Annotate ranked sellers with the image of a live product of the same name.
/// Blank image references count as missing.
pub fn attach_images(ranked: Vec<SellerTotal>, images: &HashMap<String, String>) -> Vec<TopSeller> {
    ranked
        .into_iter()
        .map(|s| TopSeller {
            image_url: images
                .get(&s.product_name)
                .filter(|url| !url.is_empty())
                .cloned(),
            name: s.product_name,
            qty: s.quantity,
            amount: s.amount,
        })
        .collect()
}

/// Stock counts from a linear scan over a tenant's products
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCounts {
    pub total_products: i64,
    pub categories: i64,
    /// Units on hand, ignoring negative quantities
    pub units_in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

impl StockCounts {
    pub fn from_products(products: &[Product]) -> Self {
        let mut categories = std::collections::HashSet::new();
        let mut counts = StockCounts::default();

        for p in products {
            counts.total_products += 1;
            categories.insert(p.category.as_str());
            counts.units_in_stock += i64::from(p.quantity.max(0));
            match StockStatus::evaluate(p.quantity, p.threshold) {
                StockStatus::LowStock => counts.low_stock += 1,
                StockStatus::OutOfStock => counts.out_of_stock += 1,
                StockStatus::InStock => {}
            }
        }

        counts.categories = categories.len() as i64;
        counts
    }
}
