//! Business logic services for the Stockroom server

pub mod analytics;
pub mod auth;
pub mod bulk_import;
pub mod dashboard;
pub mod inventory;
pub mod invoice;
pub mod sequence;
pub mod settings;
pub mod stock;

pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use inventory::InventoryService;
pub use invoice::InvoiceService;
pub use settings::SettingsService;
