//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Smallest page size a client may request
pub const MIN_PAGE_SIZE: i64 = 5;
/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 50;
/// Page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Pagination parameters, already clamped to the accepted range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!((p.page, p.limit, p.offset()), (1, 10, 0));
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Pagination::new(Some(0), Some(1)), Pagination { page: 1, limit: 5 });
        assert_eq!(Pagination::new(Some(-4), Some(500)), Pagination { page: 1, limit: 50 });
        assert_eq!(Pagination::new(Some(3), Some(20)).offset(), 40);
    }
}
