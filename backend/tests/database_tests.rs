//! Database-backed service tests
//!
//! Run against a disposable Postgres with `DATABASE_URL` set:
//! `cargo test -- --ignored`
//!
//! Tests for:
//! - Sale effects and rollback on insufficient stock
//! - Concurrent invoice sequence allocation
//! - Tenant isolation
//! - Reconciliation sweep idempotence
//! - Purchase price round trip
//! - Money bounds and idempotency key reuse
//! - Reporting-day bucketing, top sellers and the dashboard

use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::Decimal;
use shared::analytics::{local_day, local_midnight_utc};
use shared::models::{InvoiceStatus, RawProductInput, StockStatus, TransactionKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use stockroom::error::AppError;
use stockroom::external::DisabledUploader;
use stockroom::services::{sequence, stock, AnalyticsService, DashboardService, InventoryService};
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

async fn owner(pool: &PgPool) -> Uuid {
    let email = format!("{}@stockroom.test", Uuid::new_v4());
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, email, password_hash) VALUES ('Test', $1, 'x') RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn inventory(pool: &PgPool) -> InventoryService {
    InventoryService::new(pool.clone(), Arc::new(DisabledUploader))
}

fn raw(name: &str, price: &str, quantity: i32, threshold: i32) -> RawProductInput {
    RawProductInput {
        name: Some(name.to_string()),
        product_code: None,
        category: Some("General".to_string()),
        price: Some(price.to_string()),
        quantity: Some(quantity.to_string()),
        unit: Some("pcs".to_string()),
        expiry_date: None,
        threshold: Some(threshold.to_string()),
    }
}

async fn ledger_count(pool: &PgPool, owner_id: Uuid, kind: TransactionKind) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ledger_transactions WHERE owner_id = $1 AND kind = $2")
        .bind(owner_id)
        .bind(kind)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn invoice_count(pool: &PgPool, owner_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn reporting_offset() -> FixedOffset {
    FixedOffset::east_opt(330 * 60).unwrap()
}

async fn record(
    pool: &PgPool,
    owner_id: Uuid,
    kind: TransactionKind,
    product_name: &str,
    amount: i64,
    quantity: i32,
    at: DateTime<Utc>,
) {
    sqlx::query(
        r#"
        INSERT INTO ledger_transactions (owner_id, kind, product_name, amount, quantity, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(owner_id)
    .bind(kind)
    .bind(product_name)
    .bind(Decimal::from(amount))
    .bind(quantity)
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_sell_applies_every_effect() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_id, &raw("Maggi", "12.50", 10, 5), None)
        .await
        .unwrap();
    assert_eq!(product.status, StockStatus::InStock);

    let before = chrono::Utc::now();
    let outcome = service.sell(owner_id, product.id, 6, None).await.unwrap();

    assert_eq!(outcome.product.quantity, 4);
    assert_eq!(outcome.product.status, StockStatus::LowStock);
    assert_eq!(ledger_count(&pool, owner_id, TransactionKind::Sale).await, 1);

    let sale_amount: Decimal = sqlx::query_scalar(
        "SELECT amount FROM ledger_transactions WHERE owner_id = $1 AND kind = 'sale'",
    )
    .bind(owner_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(sale_amount, Decimal::from_str("75.00").unwrap());

    let invoice = outcome.invoice;
    assert_eq!(invoice.invoice_code, "INV-00001");
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    assert_eq!(invoice.amount, sale_amount);
    assert_eq!(invoice.items.len(), 1);
    assert_eq!(invoice.items[0].product_name, "Maggi");
    assert_eq!(invoice.items[0].quantity, 6);
    let due_in = invoice.due_date - before;
    assert!(due_in >= chrono::Duration::days(7) && due_in < chrono::Duration::days(7) + chrono::Duration::minutes(1));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_insufficient_stock_changes_nothing() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_id, &raw("Tea", "40", 3, 1), None)
        .await
        .unwrap();

    let err = service.sell(owner_id, product.id, 4, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 3,
            requested: 4
        }
    ));

    let quantity: i32 = sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
        .bind(product.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(quantity, 3);
    assert_eq!(ledger_count(&pool, owner_id, TransactionKind::Sale).await, 0);
    assert_eq!(invoice_count(&pool, owner_id).await, 0);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_idempotent_sell_replays_invoice() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_id, &raw("Soap", "30", 10, 2), None)
        .await
        .unwrap();

    let first = service.sell(owner_id, product.id, 2, Some("order-42")).await.unwrap();
    let second = service.sell(owner_id, product.id, 2, Some("order-42")).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.invoice.id, second.invoice.id);
    assert_eq!(second.product.quantity, 8);
    assert_eq!(invoice_count(&pool, owner_id).await, 1);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_concurrent_sequences_are_distinct() {
    let pool = pool().await;
    let owner_a = owner(&pool).await;
    let owner_b = owner(&pool).await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let pool = pool.clone();
        let owner_id = if i % 2 == 0 { owner_a } else { owner_b };
        handles.push(tokio::spawn(async move {
            (owner_id, sequence::next_invoice_sequence(&pool, owner_id).await.unwrap())
        }));
    }

    let mut seen_a = HashSet::new();
    let mut seen_b = HashSet::new();
    for handle in handles {
        let (owner_id, seq) = handle.await.unwrap();
        let seen = if owner_id == owner_a { &mut seen_a } else { &mut seen_b };
        assert!(seen.insert(seq), "duplicate sequence {}", seq);
    }

    assert_eq!(seen_a, (1..=20).collect::<HashSet<i64>>());
    assert_eq!(seen_b, (1..=20).collect::<HashSet<i64>>());
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_tenants_cannot_touch_each_other() {
    let pool = pool().await;
    let owner_a = owner(&pool).await;
    let owner_b = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_a, &raw("Rice", "60", 20, 5), None)
        .await
        .unwrap();

    let err = service.sell(owner_b, product.id, 1, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let listed = service
        .list_products(owner_b, Default::default(), None)
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_sweep_is_idempotent() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_id, &raw("Salt", "20", 2, 5), None)
        .await
        .unwrap();
    assert_eq!(product.status, StockStatus::LowStock);

    // Simulate drift
    sqlx::query("UPDATE products SET status = 'in_stock' WHERE id = $1")
        .bind(product.id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(stock::sweep_owner(&pool, owner_id).await.unwrap(), 1);
    assert_eq!(stock::sweep_owner(&pool, owner_id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_purchase_price_round_trip() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let product = service
        .create_product(owner_id, &raw("Oil", "100", 7, 2), None)
        .await
        .unwrap();
    assert_eq!(product.purchase_price.to_string(), "90.00");

    let amount: Decimal = sqlx::query_scalar(
        "SELECT amount FROM ledger_transactions WHERE owner_id = $1 AND kind = 'purchase'",
    )
    .bind(owner_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(amount, Decimal::from_str("630.00").unwrap());
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_bulk_import_reports_duplicates_per_row() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let csv = "name,productCode,category,price,quantity,unit,threshold\n\
               Pen,P-1,Office,10,5,pcs,1\n\
               Pencil,P-1,Office,5,5,pcs,1\n\
               Ink,P-2,Office,oops,5,pcs,1\n";
    let report = service.bulk_create(owner_id, csv.as_bytes()).await.unwrap();

    assert_eq!(report.created_count, 1);
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.rejected[0].row, 3);
    assert_eq!(report.rejected[0].errors, ["Duplicate product code or invalid data"]);
    assert_eq!(report.rejected[1].row, 4);
    assert_eq!(report.rejected[1].errors, ["Invalid Price"]);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_out_of_range_amounts_are_validation_errors() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let err = service
        .create_product(owner_id, &raw("Gold", "1000000", 2_000_000, 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let product = service
        .create_product(owner_id, &raw("Gold", "1000000", 1_050_000, 1), None)
        .await
        .unwrap();
    let err = service.sell(owner_id, product.id, 1_050_000, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let quantity: i32 = sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
        .bind(product.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(quantity, 1_050_000);
    assert_eq!(invoice_count(&pool, owner_id).await, 0);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_reused_key_for_another_sale_conflicts() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let service = inventory(&pool);

    let soap = service
        .create_product(owner_id, &raw("Soap", "30", 10, 2), None)
        .await
        .unwrap();
    let comb = service
        .create_product(owner_id, &raw("Comb", "15", 10, 2), None)
        .await
        .unwrap();

    service.sell(owner_id, soap.id, 2, Some("order-7")).await.unwrap();

    let err = service.sell(owner_id, comb.id, 2, Some("order-7")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = service.sell(owner_id, soap.id, 5, Some("order-7")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(invoice_count(&pool, owner_id).await, 1);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_series_keys_on_reporting_day() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let offset = reporting_offset();
    let analytics = AnalyticsService::new(pool.clone(), offset);

    let today = local_day(Utc::now(), offset);
    let just_after_midnight = local_midnight_utc(today, offset) + Duration::minutes(1);
    let week_ago_late = local_midnight_utc(today - Duration::days(7), offset)
        + Duration::hours(23)
        + Duration::minutes(59);

    record(&pool, owner_id, TransactionKind::Sale, "Tea", 120, 1, just_after_midnight).await;
    record(&pool, owner_id, TransactionKind::Sale, "Tea", 80, 1, week_ago_late).await;

    let weekly = analytics.weekly_series(owner_id).await.unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6].sales, Decimal::from(120));
    let week_total: Decimal = weekly.iter().map(|p| p.sales).sum();
    assert_eq!(week_total, Decimal::from(120));

    let monthly = analytics.monthly_series(owner_id).await.unwrap();
    assert_eq!(monthly.len(), 12);
    let month_total: Decimal = monthly.iter().map(|p| p.sales).sum();
    assert_eq!(month_total, Decimal::from(200));
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_single_sale_sums_across_months() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let analytics = AnalyticsService::new(pool.clone(), reporting_offset());

    record(&pool, owner_id, TransactionKind::Sale, "Rice", 500, 5, Utc::now()).await;

    let monthly = analytics.monthly_series(owner_id).await.unwrap();
    let sales: Decimal = monthly.iter().map(|p| p.sales).sum();
    let purchases: Decimal = monthly.iter().map(|p| p.purchase).sum();
    assert_eq!(sales, Decimal::from(500));
    assert_eq!(purchases, Decimal::ZERO);

    let totals = analytics.totals(owner_id, TransactionKind::Sale).await.unwrap();
    assert_eq!(totals.amount, Decimal::from(500));
    assert_eq!(totals.quantity, 5);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_top_selling_ties_break_by_name() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let analytics = AnalyticsService::new(pool.clone(), reporting_offset());
    let now = Utc::now();

    record(&pool, owner_id, TransactionKind::Sale, "Beta", 30, 3, now).await;
    record(&pool, owner_id, TransactionKind::Sale, "Alpha", 10, 1, now).await;
    record(&pool, owner_id, TransactionKind::Sale, "Alpha", 20, 2, now).await;
    record(&pool, owner_id, TransactionKind::Sale, "Gamma", 90, 9, now).await;
    record(&pool, owner_id, TransactionKind::Purchase, "Delta", 900, 90, now).await;

    let top = analytics.top_selling(owner_id).await.unwrap();
    let names: Vec<&str> = top.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Gamma", "Alpha", "Beta"]);
    assert_eq!(top[1].qty, 3);
    assert_eq!(top[1].amount, Decimal::from(30));
    assert_eq!(top[1].image_url, None);
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_dashboard_for_empty_tenant() {
    let pool = pool().await;
    let owner_id = owner(&pool).await;
    let analytics = AnalyticsService::new(pool.clone(), reporting_offset());
    let dashboard = DashboardService::new(pool.clone(), analytics)
        .dashboard(owner_id)
        .await
        .unwrap();

    assert_eq!(dashboard.series.monthly.len(), 12);
    assert_eq!(dashboard.series.weekly.len(), 7);
    assert!(dashboard
        .series
        .monthly
        .iter()
        .chain(&dashboard.series.weekly)
        .all(|p| p.sales.is_zero() && p.purchase.is_zero()));
    assert!(dashboard.top_selling.is_empty());
    assert_eq!(dashboard.sales_overview.sales_qty, 0);
    assert!(dashboard.sales_overview.revenue.is_zero());
    assert_eq!(dashboard.inventory_summary.low_stock, 0);
    assert_eq!(dashboard.product_summary.total_products, 0);
}
