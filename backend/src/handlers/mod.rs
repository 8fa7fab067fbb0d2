//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod inventory;
pub mod invoice;
pub mod settings;
pub mod stats;

pub use auth::{forgot_password, login, reset_password, signup, verify_otp};
pub use health::health_check;
pub use inventory::{create_product, list_products, reconcile_stock, sell_product, upload_csv};
pub use invoice::{delete_invoice, get_invoice, invoice_summary, list_invoices, update_invoice_status};
pub use settings::{change_password, get_layout, get_me, update_layout, update_profile};
pub use stats::{get_dashboard, get_statistics};
