//! Ledger aggregation: monthly and weekly series, top sellers and totals
//!
//! Postgres only sums per reporting-timezone day. Bucketing into months and
//! weeks happens in `shared::analytics` with labels from the same offset.

use chrono::{FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use shared::analytics::{
    attach_images, fill_series, local_day, local_midnight_utc, monthly_buckets, rank_top_sellers,
    weekly_buckets, window_start, Bucket, DailyTotal, SellerTotal, SeriesPoint, TopSeller,
    TOP_SELLING_LIMIT,
};
use shared::models::TransactionKind;

#[derive(Clone)]
pub struct AnalyticsService {
    db: PgPool,
    offset: FixedOffset,
}

/// Sum of amounts and quantities for one transaction kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct KindTotals {
    pub amount: Decimal,
    pub quantity: i64,
}

impl AnalyticsService {
    pub fn new(db: PgPool, offset: FixedOffset) -> Self {
        Self { db, offset }
    }

    /// Today in the reporting timezone
    pub fn today(&self) -> NaiveDate {
        local_day(Utc::now(), self.offset)
    }

    pub fn monthly_buckets(&self) -> Vec<Bucket> {
        monthly_buckets(self.today())
    }

    pub fn weekly_buckets(&self) -> Vec<Bucket> {
        weekly_buckets(self.today())
    }

    /// Trailing 12 months including the current one, oldest first
    pub async fn monthly_series(&self, owner_id: Uuid) -> AppResult<Vec<SeriesPoint>> {
        self.series(owner_id, &self.monthly_buckets()).await
    }

    /// Trailing 7 days including today, oldest first
    pub async fn weekly_series(&self, owner_id: Uuid) -> AppResult<Vec<SeriesPoint>> {
        self.series(owner_id, &self.weekly_buckets()).await
    }

    /// Fill `buckets` from the owner's ledger. Every bucket is present, zero when empty.
    pub async fn series(&self, owner_id: Uuid, buckets: &[Bucket]) -> AppResult<Vec<SeriesPoint>> {
        let Some(start) = window_start(buckets) else {
            return Ok(Vec::new());
        };

        let totals = sqlx::query_as::<_, DailyTotal>(
            r#"
            SELECT ((created_at AT TIME ZONE 'UTC') + make_interval(mins => $3))::date AS day,
                   kind,
                   SUM(amount) AS amount
            FROM ledger_transactions
            WHERE owner_id = $1 AND created_at >= $2
            GROUP BY 1, 2
            "#,
        )
        .bind(owner_id)
        .bind(local_midnight_utc(start, self.offset))
        .bind(self.offset.local_minus_utc() / 60)
        .fetch_all(&self.db)
        .await?;

        Ok(fill_series(buckets, &totals))
    }

    /// Best-selling product names by units sold, with a current image where one exists
    pub async fn top_selling(&self, owner_id: Uuid) -> AppResult<Vec<TopSeller>> {
        let totals = sqlx::query_as::<_, SellerTotal>(
            r#"
            SELECT product_name, SUM(quantity)::BIGINT AS quantity, SUM(amount) AS amount
            FROM ledger_transactions
            WHERE owner_id = $1 AND kind = $2
            GROUP BY product_name
            "#,
        )
        .bind(owner_id)
        .bind(TransactionKind::Sale)
        .fetch_all(&self.db)
        .await?;

        let ranked = rank_top_sellers(totals, TOP_SELLING_LIMIT);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = ranked.iter().map(|t| t.product_name.clone()).collect();
        let images: HashMap<String, String> = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT DISTINCT ON (name) name, image_url
            FROM products
            WHERE owner_id = $1 AND name = ANY($2)
            ORDER BY name, updated_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(&names)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        Ok(attach_images(ranked, &images))
    }

    /// All-time totals for one kind of ledger entry
    pub async fn totals(&self, owner_id: Uuid, kind: TransactionKind) -> AppResult<KindTotals> {
        let totals = sqlx::query_as::<_, KindTotals>(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS amount,
                   COALESCE(SUM(quantity), 0)::BIGINT AS quantity
            FROM ledger_transactions
            WHERE owner_id = $1 AND kind = $2
            "#,
        )
        .bind(owner_id)
        .bind(kind)
        .fetch_one(&self.db)
        .await?;

        Ok(totals)
    }
}
