//! Route definitions for the Stockroom API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Largest accepted upload (product image or CSV)
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/products", product_routes(state.clone()))
        .nest("/invoices", invoice_routes(state.clone()))
        .nest("/stats", stats_routes(state.clone()))
        .nest("/settings", settings_routes(state.clone()))
        .route(
            "/sell/:product_id",
            post(handlers::sell_product)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/verify-otp", post(handlers::verify_otp))
        .route("/reset-password", post(handlers::reset_password))
}

/// Product and stock routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/create", post(handlers::create_product))
        .route("/upload-csv", post(handlers::upload_csv))
        .route("/sell/:product_id", post(handlers::sell_product))
        .route("/buy/:product_id", post(handlers::sell_product))
        .route("/reconcile", post(handlers::reconcile_stock))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Invoice routes (protected)
fn invoice_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_invoices))
        .route("/summary", get(handlers::invoice_summary))
        .route(
            "/:invoice_id",
            get(handlers::get_invoice)
                .patch(handlers::update_invoice_status)
                .delete(handlers::delete_invoice),
        )
        .route("/:invoice_id/status", patch(handlers::update_invoice_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dashboard and statistics routes (protected)
fn stats_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/statistics", get(handlers::get_statistics))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Account settings routes (protected)
fn settings_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_me))
        .route("/profile", patch(handlers::update_profile))
        .route("/password", patch(handlers::change_password))
        .route(
            "/layout",
            get(handlers::get_layout).put(handlers::update_layout),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
