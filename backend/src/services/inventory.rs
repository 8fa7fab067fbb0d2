//! Inventory service for the product catalog and stock movements
//!
//! Every quantity change writes the product, its refreshed status and the
//! ledger entry in one transaction. A sale also issues its invoice inside
//! that transaction.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use sqlx::{types::Json, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::ImageUploader;
use crate::services::bulk_import::{parse_csv, ImportReport, RejectedRow};
use crate::services::{sequence, stock};
use shared::models::{
    due_date_from, format_invoice_code, format_product_code, format_reference_number,
    purchase_amount, to_base36, Invoice, InvoiceLineItem, InvoiceStatus, Product, ProductDraft,
    RawProductInput, StockStatus, TransactionKind, DEFAULT_CUSTOMER,
};
use shared::types::{Page, Pagination};
use shared::validation::{amount_in_range, contains_pattern, validate_idempotency_key};

/// Attempts at drawing a free product code before giving up
const PRODUCT_CODE_ATTEMPTS: usize = 3;

pub(crate) const PRODUCT_COLUMNS: &str = "id, owner_id, name, product_code, category, sales_price, \
     purchase_price, quantity, unit, expiry_date, threshold, status, image_url, created_at, updated_at";

pub(crate) const INVOICE_COLUMNS: &str = "id, owner_id, invoice_code, reference_number, amount, status, \
     due_date, items, customer_name, created_at, updated_at";

/// Inventory service for products, sales and imports
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    images: Arc<dyn ImageUploader>,
}

/// An image attached to a new product
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Result of a sale
#[derive(Debug, Clone, Serialize)]
pub struct SaleOutcome {
    pub ok: bool,
    pub product: Product,
    pub invoice: Invoice,
    /// True when an idempotency key matched an earlier sale
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| to_base36(rng.gen_range(0..36)))
        .collect()
}

fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Fresh auto-assigned product code
pub fn generate_product_code() -> String {
    format_product_code(now_millis(), &random_base36(4))
}

/// Fresh cosmetic invoice reference number
pub fn generate_reference_number() -> String {
    format_reference_number(&random_base36(6), now_millis())
}

impl InventoryService {
    pub fn new(db: PgPool, images: Arc<dyn ImageUploader>) -> Self {
        Self { db, images }
    }

    /// Validate and store a product, recording its opening stock as a purchase
    pub async fn create_product(
        &self,
        owner_id: Uuid,
        raw: &RawProductInput,
        image: Option<ImageUpload>,
    ) -> AppResult<Product> {
        let draft = ProductDraft::parse(raw).map_err(|errors| AppError::Validation(errors.join(", ")))?;

        let image_url = match image {
            Some(upload) if !upload.bytes.is_empty() => {
                self.images.upload(upload.bytes, &upload.file_name).await?
            }
            _ => String::new(),
        };

        let mut tx = self.db.begin().await?;
        let product = insert_product(&mut tx, owner_id, &draft, &image_url).await?;
        tx.commit().await?;

        tracing::info!(
            owner_id = %owner_id,
            product_id = %product.id,
            product_code = %product.product_code,
            "Product created"
        );

        self.sweep_after_write(owner_id).await;
        Ok(product)
    }

    /// List products newest first, optionally filtered by name or product code
    pub async fn list_products(
        &self,
        owner_id: Uuid,
        pagination: Pagination,
        q: Option<&str>,
    ) -> AppResult<Page<Product>> {
        let pattern = contains_pattern(q);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE $2 ESCAPE '\' OR product_code ILIKE $2 ESCAPE '\')
            "#,
        )
        .bind(owner_id)
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE owner_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE $2 ESCAPE '\' OR product_code ILIKE $2 ESCAPE '\')
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

    /// Import products from a CSV file. Each row stands alone: invalid or
    /// conflicting rows are reported and the rest are still created.
    pub async fn bulk_create(&self, owner_id: Uuid, csv_bytes: &[u8]) -> AppResult<ImportReport> {
        let rows = parse_csv(csv_bytes)?;
        let mut report = ImportReport::default();

        for row in rows {
            let product_code = row.input.product_code.clone().unwrap_or_default();

            let draft = match ProductDraft::parse(&row.input) {
                Ok(draft) => draft,
                Err(errors) => {
                    report.rejected.push(RejectedRow {
                        row: row.row,
                        product_code,
                        errors,
                    });
                    continue;
                }
            };

            let result = async {
                let mut tx = self.db.begin().await?;
                insert_product(&mut tx, owner_id, &draft, "").await?;
                tx.commit().await?;
                Ok::<_, AppError>(())
            }
            .await;

            match result {
                Ok(()) => report.created_count += 1,
                Err(e) if e.is_storage_unavailable() => return Err(e),
                Err(e) => {
                    tracing::debug!(row = row.row, error = %e, "Import row rejected by storage");
                    report.rejected.push(RejectedRow {
                        row: row.row,
                        product_code,
                        errors: vec!["Duplicate product code or invalid data".to_string()],
                    });
                }
            }
        }

        tracing::info!(
            owner_id = %owner_id,
            created = report.created_count,
            rejected = report.rejected.len(),
            "Bulk import finished"
        );

        self.sweep_after_write(owner_id).await;
        Ok(report)
    }

    /// Sell `quantity` units of a product.
    ///
    /// The stock decrement, status refresh, ledger entry, invoice number and
    /// invoice are committed together or not at all. With an idempotency key,
    /// a repeated request returns the original invoice instead of selling again.
    pub async fn sell(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        idempotency_key: Option<&str>,
    ) -> AppResult<SaleOutcome> {
        if quantity <= 0 {
            return Err(AppError::Validation("Invalid quantity".to_string()));
        }
        if let Some(key) = idempotency_key {
            validate_idempotency_key(key).map_err(|m| AppError::Validation(m.to_string()))?;
        }

        let mut tx = self.db.begin().await?;

        if let Some(key) = idempotency_key {
            // Blocks on a concurrent request with the same key until it finishes
            let claimed = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO sale_requests (owner_id, idempotency_key, product_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (owner_id, idempotency_key) DO NOTHING
                RETURNING owner_id
                "#,
            )
            .bind(owner_id)
            .bind(key)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

            if claimed.is_none() {
                tx.rollback().await?;
                return self.replay_sale(owner_id, key, product_id, quantity).await;
            }
        }

        let mut product = decrement_stock(&mut tx, owner_id, product_id, quantity).await?;

        let fresh = StockStatus::evaluate(product.quantity, product.threshold);
        if fresh != product.status {
            sqlx::query("UPDATE products SET status = $2 WHERE id = $1")
                .bind(product.id)
                .bind(fresh)
                .execute(&mut *tx)
                .await?;
            product.status = fresh;
        }

        let line = InvoiceLineItem::new(product.name.clone(), quantity, product.sales_price);
        let amount = line.line_total;
        if !amount_in_range(amount) {
            return Err(AppError::Validation("Amount too large".to_string()));
        }

        insert_ledger_entry(
            &mut tx,
            owner_id,
            TransactionKind::Sale,
            Some(product.id),
            &product.name,
            amount,
            quantity,
        )
        .await?;

        let seq = sequence::next_invoice_sequence(&mut *tx, owner_id).await?;
        let now = Utc::now();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (owner_id, invoice_code, reference_number, amount, status,
                                  due_date, items, customer_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(format_invoice_code(seq))
        .bind(generate_reference_number())
        .bind(amount)
        .bind(InvoiceStatus::Unpaid)
        .bind(due_date_from(now))
        .bind(Json(vec![line]))
        .bind(DEFAULT_CUSTOMER)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(key) = idempotency_key {
            sqlx::query(
                "UPDATE sale_requests SET invoice_id = $3 WHERE owner_id = $1 AND idempotency_key = $2",
            )
            .bind(owner_id)
            .bind(key)
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            owner_id = %owner_id,
            product_id = %product.id,
            quantity,
            remaining = product.quantity,
            invoice_code = %invoice.invoice_code,
            "Sale recorded"
        );

        self.sweep_after_write(owner_id).await;

        Ok(SaleOutcome {
            ok: true,
            product,
            invoice,
            replayed: false,
        })
    }

    /// Run the owner sweep on demand
    pub async fn reconcile(&self, owner_id: Uuid) -> AppResult<u64> {
        let updated = stock::sweep_owner(&self.db, owner_id).await?;
        tracing::info!(owner_id = %owner_id, updated, "Owner stock statuses reconciled");
        Ok(updated)
    }

    async fn replay_sale(
        &self,
        owner_id: Uuid,
        key: &str,
        requested_product: Uuid,
        quantity: i32,
    ) -> AppResult<SaleOutcome> {
        let (invoice_id, product_id) = sqlx::query_as::<_, (Option<Uuid>, Uuid)>(
            "SELECT invoice_id, product_id FROM sale_requests WHERE owner_id = $1 AND idempotency_key = $2",
        )
        .bind(owner_id)
        .bind(key)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let invoice_id = invoice_id.ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 AND owner_id = $2"
        ))
        .bind(invoice_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        if !replay_matches(product_id, &invoice.items, requested_product, quantity) {
            return Err(AppError::Conflict(
                "Idempotency key already used for a different sale".to_string(),
            ));
        }

        let product = find_product(&self.db, owner_id, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        tracing::info!(owner_id = %owner_id, invoice_code = %invoice.invoice_code, "Sale replayed");

        Ok(SaleOutcome {
            ok: true,
            product,
            invoice,
            replayed: true,
        })
    }

    /// Cleanup pass after a committed write; failure only logs
    async fn sweep_after_write(&self, owner_id: Uuid) {
        if let Err(e) = stock::sweep_owner(&self.db, owner_id).await {
            tracing::warn!(owner_id = %owner_id, error = %e, "Post-write stock sweep failed");
        }
    }
}

/// Whether a repeated request asks for the same sale that its key recorded
fn replay_matches(
    recorded_product: Uuid,
    recorded_items: &[InvoiceLineItem],
    requested_product: Uuid,
    quantity: i32,
) -> bool {
    recorded_product == requested_product
        && recorded_items.iter().map(|item| item.quantity).sum::<i32>() == quantity
}

pub(crate) async fn find_product(
    db: &PgPool,
    owner_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND owner_id = $2"
    ))
    .bind(product_id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;

    Ok(product)
}

/// Take `quantity` off the shelf only if that much is on hand
async fn decrement_stock(
    conn: &mut PgConnection,
    owner_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<Product> {
    let updated = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products SET quantity = quantity - $3, updated_at = NOW()
        WHERE id = $1 AND owner_id = $2 AND quantity >= $3
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(product_id)
    .bind(owner_id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(product) = updated {
        return Ok(product);
    }

    let available = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM products WHERE id = $1 AND owner_id = $2",
    )
    .bind(product_id)
    .bind(owner_id)
    .fetch_optional(&mut *conn)
    .await?;

    match available {
        None => Err(AppError::NotFound("Product".to_string())),
        Some(available) => Err(AppError::InsufficientStock {
            available,
            requested: quantity,
        }),
    }
}

/// Insert a validated product with its opening purchase entry
async fn insert_product(
    conn: &mut PgConnection,
    owner_id: Uuid,
    draft: &ProductDraft,
    image_url: &str,
) -> AppResult<Product> {
    let purchase_price = draft.purchase_price();
    let attempts = if draft.product_code.is_some() { 1 } else { PRODUCT_CODE_ATTEMPTS };

    let mut inserted = None;
    for _ in 0..attempts {
        let code = draft
            .product_code
            .clone()
            .unwrap_or_else(generate_product_code);

        inserted = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (owner_id, name, product_code, category, sales_price, purchase_price,
                                  quantity, unit, expiry_date, threshold, status, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (owner_id, product_code) DO NOTHING
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&code)
        .bind(&draft.category)
        .bind(draft.sales_price)
        .bind(purchase_price)
        .bind(draft.quantity)
        .bind(&draft.unit)
        .bind(draft.expiry_date)
        .bind(draft.threshold)
        .bind(draft.initial_status())
        .bind(image_url)
        .fetch_optional(&mut *conn)
        .await?;

        if inserted.is_some() {
            break;
        }
    }

    let product =
        inserted.ok_or_else(|| AppError::Conflict("Product code already exists".to_string()))?;

    insert_ledger_entry(
        conn,
        owner_id,
        TransactionKind::Purchase,
        Some(product.id),
        &product.name,
        purchase_amount(purchase_price, product.quantity),
        product.quantity,
    )
    .await?;

    Ok(product)
}

async fn insert_ledger_entry(
    conn: &mut PgConnection,
    owner_id: Uuid,
    kind: TransactionKind,
    product_id: Option<Uuid>,
    product_name: &str,
    amount: rust_decimal::Decimal,
    quantity: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO ledger_transactions (owner_id, kind, product_id, product_name, amount, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(owner_id)
    .bind(kind)
    .bind(product_id)
    .bind(product_name)
    .bind(amount)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(())
}
