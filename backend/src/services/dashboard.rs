//! Dashboard and statistics assembly
//!
//! Read-side composition only. Sub-fetches run concurrently; a failing
//! section is logged and zeroed, unless storage itself is unreachable.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::analytics::{AnalyticsService, KindTotals};
use crate::services::inventory::PRODUCT_COLUMNS;
use crate::services::settings;
use shared::analytics::{fill_series, SeriesPoint, StockCounts, TopSeller};
use shared::models::{Product, TransactionKind};

// Presentation-only figures the dashboard cards show but nothing tracks yet
const SALES_COST_PLACEHOLDER: i64 = 17_432;
const PURCHASE_CANCEL_PLACEHOLDER: i64 = 5;
const PURCHASE_RETURN_PLACEHOLDER: i64 = 17_432;
const TO_BE_RECEIVED_PLACEHOLDER: i64 = 200;
const SUPPLIERS_PLACEHOLDER: i64 = 31;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOverview {
    pub sales_qty: i64,
    pub revenue: Decimal,
    pub profit: Decimal,
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOverview {
    pub purchase_qty: i64,
    pub cost: Decimal,
    pub cancel: i64,
    #[serde(rename = "return")]
    pub returned: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub in_stock: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub to_be_received: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub suppliers: i64,
    pub categories: i64,
    pub total_products: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub monthly: Vec<SeriesPoint>,
    pub weekly: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub sales_overview: SalesOverview,
    pub purchase_overview: PurchaseOverview,
    pub inventory_summary: InventorySummary,
    pub product_summary: ProductSummary,
    pub series: Series,
    pub top_selling: Vec<TopSeller>,
}

impl Dashboard {
    /// Package the fetched figures into the dashboard payload
    pub fn assemble(
        counts: &StockCounts,
        sales: KindTotals,
        purchases: KindTotals,
        series: Series,
        top_selling: Vec<TopSeller>,
    ) -> Self {
        Self {
            sales_overview: SalesOverview {
                sales_qty: sales.quantity,
                revenue: sales.amount,
                profit: sales.amount - purchases.amount,
                cost: SALES_COST_PLACEHOLDER,
            },
            purchase_overview: PurchaseOverview {
                purchase_qty: purchases.quantity,
                cost: purchases.amount,
                cancel: PURCHASE_CANCEL_PLACEHOLDER,
                returned: PURCHASE_RETURN_PLACEHOLDER,
            },
            inventory_summary: InventorySummary {
                in_stock: counts.units_in_stock,
                low_stock: counts.low_stock,
                out_of_stock: counts.out_of_stock,
                to_be_received: TO_BE_RECEIVED_PLACEHOLDER,
            },
            product_summary: ProductSummary {
                suppliers: SUPPLIERS_PLACEHOLDER,
                categories: counts.categories,
                total_products: counts.total_products,
            },
            series,
            top_selling,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsCards {
    pub revenue: Decimal,
    pub sold: i64,
    pub in_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub cards: StatisticsCards,
    pub series: Vec<SeriesPoint>,
    pub top_selling: Vec<TopSeller>,
    pub card_order: Vec<String>,
}

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
    analytics: AnalyticsService,
}

/// Keep a failed section's fallback, except when storage is unreachable
fn degrade<T>(section: &'static str, result: AppResult<T>, fallback: impl FnOnce() -> T) -> AppResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_storage_unavailable() => Err(e),
        Err(e) => {
            tracing::warn!(section, error = %e, "Dashboard section degraded to zero");
            Ok(fallback())
        }
    }
}

impl DashboardService {
    pub fn new(db: PgPool, analytics: AnalyticsService) -> Self {
        Self { db, analytics }
    }

    pub async fn dashboard(&self, owner_id: Uuid) -> AppResult<Dashboard> {
        let monthly_buckets = self.analytics.monthly_buckets();
        let weekly_buckets = self.analytics.weekly_buckets();

        let (counts, sales, purchases, monthly, weekly, top_selling) = tokio::try_join!(
            async { degrade("products", self.stock_counts(owner_id).await, StockCounts::default) },
            async {
                degrade(
                    "sales",
                    self.analytics.totals(owner_id, TransactionKind::Sale).await,
                    KindTotals::default,
                )
            },
            async {
                degrade(
                    "purchases",
                    self.analytics.totals(owner_id, TransactionKind::Purchase).await,
                    KindTotals::default,
                )
            },
            async {
                degrade(
                    "monthly",
                    self.analytics.series(owner_id, &monthly_buckets).await,
                    || fill_series(&monthly_buckets, &[]),
                )
            },
            async {
                degrade(
                    "weekly",
                    self.analytics.series(owner_id, &weekly_buckets).await,
                    || fill_series(&weekly_buckets, &[]),
                )
            },
            async { degrade("top_selling", self.analytics.top_selling(owner_id).await, Vec::new) },
        )?;

        Ok(Dashboard::assemble(
            &counts,
            sales,
            purchases,
            Series { monthly, weekly },
            top_selling,
        ))
    }

    pub async fn statistics(&self, owner_id: Uuid) -> AppResult<Statistics> {
        let monthly_buckets = self.analytics.monthly_buckets();

        let (counts, sales, series, top_selling, card_order) = tokio::try_join!(
            async { degrade("products", self.stock_counts(owner_id).await, StockCounts::default) },
            async {
                degrade(
                    "sales",
                    self.analytics.totals(owner_id, TransactionKind::Sale).await,
                    KindTotals::default,
                )
            },
            async {
                degrade(
                    "monthly",
                    self.analytics.series(owner_id, &monthly_buckets).await,
                    || fill_series(&monthly_buckets, &[]),
                )
            },
            async { degrade("top_selling", self.analytics.top_selling(owner_id).await, Vec::new) },
            async {
                degrade(
                    "layout",
                    settings::card_order(&self.db, owner_id).await,
                    || shared::models::card_order_or_default(None),
                )
            },
        )?;

        Ok(Statistics {
            cards: StatisticsCards {
                revenue: sales.amount,
                sold: sales.quantity,
                in_stock: counts.units_in_stock,
            },
            series,
            top_selling,
            card_order,
        })
    }

    async fn stock_counts(&self, owner_id: Uuid) -> AppResult<StockCounts> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(StockCounts::from_products(&products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_degrade_falls_back_on_query_errors() {
        let result: AppResult<i64> = Err(AppError::Database(sqlx::Error::RowNotFound));
        assert_eq!(degrade("test", result, || 0).unwrap(), 0);
    }

    #[test]
    fn test_degrade_propagates_unavailable_storage() {
        let result: AppResult<i64> = Err(AppError::Database(sqlx::Error::PoolTimedOut));
        assert!(degrade("test", result, || 0).is_err());
    }

    #[test]
    fn test_assemble_payload() {
        let counts = StockCounts {
            total_products: 4,
            categories: 2,
            units_in_stock: 37,
            low_stock: 1,
            out_of_stock: 1,
        };
        let sales = KindTotals {
            amount: Decimal::new(50000, 2),
            quantity: 6,
        };
        let purchases = KindTotals {
            amount: Decimal::new(90000, 2),
            quantity: 10,
        };
        let series = Series {
            monthly: Vec::new(),
            weekly: Vec::new(),
        };

        let dashboard = Dashboard::assemble(&counts, sales, purchases, series, Vec::new());
        assert_eq!(dashboard.sales_overview.profit, Decimal::new(-40000, 2));
        assert_eq!(dashboard.inventory_summary.in_stock, 37);
        assert_eq!(dashboard.product_summary.total_products, 4);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["purchaseOverview"]["return"], 17_432);
        assert_eq!(json["inventorySummary"]["toBeReceived"], 200);
        assert_eq!(json["productSummary"]["suppliers"], 31);
        assert!(json["series"]["monthly"].is_array());
        assert!(json["topSelling"].is_array());
    }
}
