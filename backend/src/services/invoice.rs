//! Invoice service

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::inventory::INVOICE_COLUMNS;
use shared::models::{Invoice, InvoiceStatus, LedgerTransaction};
use shared::types::{Page, Pagination};
use shared::validation::contains_pattern;

/// Window for the "recent" figures on the invoice summary
const RECENT_DAYS: i64 = 7;
const RECENT_ROWS: i64 = 5;

#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
}

/// Headline figures for the invoice page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCards {
    pub recent_transactions_count: i64,
    pub total_invoices: i64,
    pub processed_invoices: i64,
    pub paid_amount: Decimal,
    pub paid_customers: i64,
    pub unpaid_amount: Decimal,
    pub unpaid_customers: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub cards: InvoiceCards,
    pub recent_transactions: Vec<LedgerTransaction>,
    pub recent_invoices: Vec<Invoice>,
}

impl InvoiceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List invoices newest first; `search` matches the invoice code or reference number literally
    pub async fn list(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
        search: Option<&str>,
    ) -> AppResult<Page<Invoice>> {
        let pattern = contains_pattern(search);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR invoice_code ILIKE $2 ESCAPE '\' OR reference_number ILIKE $2 ESCAPE '\')
            "#,
        )
        .bind(owner_id)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR invoice_code ILIKE $2 ESCAPE '\' OR reference_number ILIKE $2 ESCAPE '\')
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(owner_id)
        .bind(&pattern)
        .bind(pagination.limit)
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(Page::new(items, total, pagination))
    }

    pub async fn get(&self, owner_id: Uuid, invoice_id: Uuid) -> AppResult<Invoice> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND owner_id = $2"
        ))
        .bind(invoice_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))
    }

    /// Set the payment status; only `Paid` and `Unpaid` are accepted
    pub async fn update_status(
        &self,
        owner_id: Uuid,
        invoice_id: Uuid,
        status: &str,
    ) -> AppResult<Invoice> {
        let status: InvoiceStatus = status
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Invalid status".to_string()))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices SET status = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(owner_id)
        .bind(status)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        tracing::info!(
            owner_id = %owner_id,
            invoice_code = %invoice.invoice_code,
            status = ?invoice.status,
            "Invoice status updated"
        );

        Ok(invoice)
    }

    pub async fn delete(&self, owner_id: Uuid, invoice_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND owner_id = $2")
            .bind(invoice_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Invoice".to_string()));
        }

        tracing::info!(owner_id = %owner_id, invoice_id = %invoice_id, "Invoice deleted");
        Ok(())
    }

    pub async fn summary(&self, owner_id: Uuid) -> AppResult<InvoiceSummary> {
        let since = Utc::now() - Duration::days(RECENT_DAYS);

        let recent_transactions_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM ledger_transactions WHERE owner_id = $1 AND created_at >= $2",
        )
        .bind(owner_id)
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        let (total_invoices, processed_invoices) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'paid')
            FROM invoices WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        let (paid_amount, paid_customers) = sqlx::query_as::<_, (Decimal, i64)>(
            r#"
            SELECT COALESCE(SUM(amount), 0), COUNT(DISTINCT customer_name)
            FROM invoices
            WHERE owner_id = $1 AND status = $2 AND created_at >= $3
            "#,
        )
        .bind(owner_id)
        .bind(InvoiceStatus::Paid)
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        let (unpaid_amount, unpaid_customers) = sqlx::query_as::<_, (Decimal, i64)>(
            r#"
            SELECT COALESCE(SUM(amount), 0), COUNT(DISTINCT customer_name)
            FROM invoices
            WHERE owner_id = $1 AND status = $2
            "#,
        )
        .bind(owner_id)
        .bind(InvoiceStatus::Unpaid)
        .fetch_one(&self.db)
        .await?;

        let recent_transactions = sqlx::query_as::<_, LedgerTransaction>(
            r#"
            SELECT id, owner_id, kind, product_id, product_name, amount, quantity, created_at
            FROM ledger_transactions
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(RECENT_ROWS)
        .fetch_all(&self.db)
        .await?;

        let recent_invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE owner_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(owner_id)
        .bind(RECENT_ROWS)
        .fetch_all(&self.db)
        .await?;

        Ok(InvoiceSummary {
            cards: InvoiceCards {
                recent_transactions_count,
                total_invoices,
                processed_invoices,
                paid_amount,
                paid_customers,
                unpaid_amount,
                unpaid_customers,
            },
            recent_transactions,
            recent_invoices,
        })
    }
}
