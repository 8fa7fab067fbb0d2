//! Stock status reconciliation
//!
//! `products.status` is a cached copy of [`StockStatus::evaluate`]. Every write
//! path refreshes it; the sweep here is the scan-and-diff safety net that
//! rewrites only rows whose stored value has drifted.

use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppResult;
use shared::models::{drifted_statuses, StockSnapshot, StockStatus};

type SnapshotRow = (Uuid, i32, i32, StockStatus);

/// A status correction, valid only while quantity and threshold are unchanged
struct Correction {
    id: Uuid,
    quantity: i32,
    threshold: i32,
    status: StockStatus,
}

fn corrections_for(rows: Vec<SnapshotRow>) -> Vec<Correction> {
    let snapshots: Vec<StockSnapshot<Uuid>> = rows
        .into_iter()
        .map(|(id, quantity, threshold, status)| StockSnapshot {
            id,
            quantity,
            threshold,
            status,
        })
        .collect();
    let inputs: HashMap<Uuid, (i32, i32)> = snapshots
        .iter()
        .map(|s| (s.id, (s.quantity, s.threshold)))
        .collect();

    drifted_statuses(&snapshots)
        .into_iter()
        .filter_map(|(id, status)| {
            let (quantity, threshold) = *inputs.get(&id)?;
            Some(Correction {
                id,
                quantity,
                threshold,
                status,
            })
        })
        .collect()
}

/// Correct drifted statuses for one owner. Returns the number of rows rewritten.
pub async fn sweep_owner(db: &PgPool, owner_id: Uuid) -> AppResult<u64> {
    let mut conn = db.acquire().await?;
    sweep_owner_on(&mut conn, owner_id).await
}

/// [`sweep_owner`] on an existing connection or transaction
pub async fn sweep_owner_on(conn: &mut PgConnection, owner_id: Uuid) -> AppResult<u64> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, quantity, threshold, status FROM products WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await?;

    apply_corrections(conn, corrections_for(rows)).await
}

/// Correct drifted statuses across every tenant
pub async fn sweep_all(db: &PgPool) -> AppResult<u64> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, quantity, threshold, status FROM products",
    )
    .fetch_all(db)
    .await?;

    let corrections = corrections_for(rows);
    if corrections.is_empty() {
        return Ok(0);
    }

    let mut conn = db.acquire().await?;
    apply_corrections(&mut conn, corrections).await
}

async fn apply_corrections(conn: &mut PgConnection, corrections: Vec<Correction>) -> AppResult<u64> {
    let mut updated = 0;
    for c in corrections {
        // Skip rows a concurrent write has changed since the scan
        let result = sqlx::query(
            r#"
            UPDATE products SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status <> $2 AND quantity = $3 AND threshold = $4
            "#,
        )
        .bind(c.id)
        .bind(c.status)
        .bind(c.quantity)
        .bind(c.threshold)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() > 0 {
            tracing::debug!(product_id = %c.id, status = c.status.as_str(), "Stock status corrected");
        }
        updated += result.rows_affected();
    }
    Ok(updated)
}

/// Run [`sweep_all`] every `interval` in the background.
///
/// Failures are logged and the next tick proceeds as normal.
pub fn spawn_reconciliation(db: PgPool, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = interval.as_secs(), "Stock reconciliation scheduled");

        loop {
            ticker.tick().await;
            match sweep_all(&db).await {
                Ok(0) => tracing::debug!("Stock reconciliation: no drift"),
                Ok(updated) => tracing::info!(updated, "Stock reconciliation corrected statuses"),
                Err(e) => tracing::error!(error = %e, "Stock reconciliation failed"),
            }
        }
    })
}
