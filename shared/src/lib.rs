//! Shared types and logic for the Stockroom inventory platform
//!
//! This crate contains the pure domain rules (stock status, pricing, invoice
//! numbering, time-bucketed aggregation) shared between the backend and the
//! frontend (via WASM). It performs no I/O.

pub mod analytics;
pub mod models;
pub mod types;
pub mod validation;

pub use analytics::*;
pub use models::*;
pub use types::*;
pub use validation::*;

/// Errors raised by pure domain parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid invoice status: {0}")]
    InvalidInvoiceStatus(String),

    #[error("card order must contain revenue, sold and instock exactly once")]
    InvalidCardOrder,
}
