//! HTTP handlers for products, sales and stock reconciliation

use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::bulk_import::ImportReport;
use crate::services::inventory::{ImageUpload, SaleOutcome};
use crate::services::InventoryService;
use crate::AppState;
use shared::models::{Product, RawProductInput};
use shared::types::{Page, Pagination};
use shared::validation::parse_quantity;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub updated: u64,
}

fn service(state: &AppState) -> InventoryService {
    InventoryService::new(state.db.clone(), state.images.clone())
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload: {}", e))
}

/// Create a product from a multipart form with an optional `image` file
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ProductResponse>> {
    let mut raw = RawProductInput::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or("product").to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            image = Some(ImageUpload {
                bytes: bytes.to_vec(),
                file_name,
            });
            continue;
        }

        let value = Some(field.text().await.map_err(multipart_error)?);
        match name.as_str() {
            "name" => raw.name = value,
            "productCode" | "productId" => raw.product_code = value,
            "category" => raw.category = value,
            "price" => raw.price = value,
            "quantity" => raw.quantity = value,
            "unit" => raw.unit = value,
            "expiryDate" => raw.expiry_date = value,
            "threshold" => raw.threshold = value,
            _ => {}
        }
    }

    let product = service(&state)
        .create_product(current_user.0.user_id, &raw, image)
        .await?;
    Ok(Json(ProductResponse { product }))
}

/// List the caller's products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Page<Product>>> {
    let pagination = Pagination::new(query.page, query.limit);
    let page = service(&state)
        .list_products(current_user.0.user_id, pagination, query.q.as_deref())
        .await?;
    Ok(Json(page))
}

/// Bulk-create products from the multipart `file` field
pub async fn upload_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            file = Some(field.bytes().await.map_err(multipart_error)?);
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("CSV file required".to_string()))?;
    let report = service(&state)
        .bulk_create(current_user.0.user_id, &file)
        .await?;
    Ok(Json(report))
}

/// Pull the sale quantity from `{qty}` or `{quantity}`, as a number or numeric string
fn sale_quantity(body: &Value) -> Option<i32> {
    let raw = body.get("qty").or_else(|| body.get("quantity"))?;
    match raw {
        Value::Number(n) => parse_quantity(&n.to_string()),
        Value::String(s) => parse_quantity(s),
        _ => None,
    }
}

/// Sell units of a product and issue the invoice
pub async fn sell_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> AppResult<Json<SaleOutcome>> {
    let quantity = sale_quantity(&body)
        .filter(|q| *q > 0)
        .ok_or_else(|| AppError::Validation("Invalid quantity".to_string()))?;

    let idempotency_key = match headers.get(IDEMPOTENCY_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AppError::Validation("Invalid idempotency key".to_string()))?,
        ),
        None => None,
    };

    let outcome = service(&state)
        .sell(current_user.0.user_id, product_id, quantity, idempotency_key)
        .await?;
    Ok(Json(outcome))
}

/// Recompute stock statuses for the caller's products
pub async fn reconcile_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ReconcileResponse>> {
    let updated = service(&state).reconcile(current_user.0.user_id).await?;
    Ok(Json(ReconcileResponse { updated }))
}
