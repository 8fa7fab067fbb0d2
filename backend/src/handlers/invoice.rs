//! HTTP handlers for invoices

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::invoice::InvoiceSummary;
use crate::services::InvoiceService;
use crate::AppState;
use shared::models::Invoice;
use shared::types::{Page, Pagination};

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Serialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListInvoicesQuery>,
) -> AppResult<Json<Page<Invoice>>> {
    let service = InvoiceService::new(state.db);
    let page = service
        .list(
            current_user.0.user_id,
            Pagination::new(query.page, query.limit),
            query.search.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

pub async fn invoice_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<InvoiceSummary>> {
    let service = InvoiceService::new(state.db);
    let summary = service.summary(current_user.0.user_id).await?;
    Ok(Json(summary))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<InvoiceResponse>> {
    let service = InvoiceService::new(state.db);
    let invoice = service.get(current_user.0.user_id, invoice_id).await?;
    Ok(Json(InvoiceResponse { invoice }))
}

/// Mark an invoice `Paid` or `Unpaid`
pub async fn update_invoice_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    let service = InvoiceService::new(state.db);
    let invoice = service
        .update_status(current_user.0.user_id, invoice_id, &body.status)
        .await?;
    Ok(Json(InvoiceResponse { invoice }))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let service = InvoiceService::new(state.db);
    service.delete(current_user.0.user_id, invoice_id).await?;
    Ok(Json(DeleteResponse { ok: true }))
}
