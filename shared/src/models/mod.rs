//! Domain models for the Stockroom inventory platform

mod invoice;
mod layout;
mod ledger;
mod product;
mod stock;
mod user;

pub use invoice::*;
pub use layout::*;
pub use ledger::*;
pub use product::*;
pub use stock::*;
pub use user::*;
