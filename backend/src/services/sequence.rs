//! Per-owner invoice sequence allocation
//!
//! The counter row is incremented and read in one statement, so concurrent
//! sales for the same owner never observe the same value. Sequences may skip
//! numbers when the enclosing transaction rolls back.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Allocate the next invoice sequence number for `owner_id`, creating the
/// counter at 1 on first use.
///
/// Accepts a pool or an open transaction.
pub async fn next_invoice_sequence<'e, E>(executor: E, owner_id: Uuid) -> AppResult<i64>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO invoice_counters (owner_id, seq)
        VALUES ($1, 1)
        ON CONFLICT (owner_id) DO UPDATE SET seq = invoice_counters.seq + 1
        RETURNING seq
        "#,
    )
    .bind(owner_id)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        tracing::error!(owner_id = %owner_id, error = %e, "Invoice sequence increment failed");
        AppError::Dependency(format!("invoice sequence unavailable: {}", e))
    })
}
