//! Request and pagination types
//!
//! List endpoints take `page` (1-based) and `limit` query parameters and
//! answer with a [`PaginatedResponse`].

use serde::{Deserialize, Serialize};

/// Upper bound for `limit` on every list endpoint
pub const MAX_PAGE_SIZE: u32 = 100;

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Resolve optional query values; page is at least 1, limit is clamped to 1..=100
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Get the offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) as u64 * self.limit as u64
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let limit = pagination.limit.max(1);
        let total_pages = total.div_ceil(limit as u64) as u32;
        Self {
            data,
            total,
            page: pagination.page,
            limit,
            total_pages,
        }
    }

    /// Slice an in-memory result set into this page
    pub fn from_vec(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let data = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .collect();
        Self::new(data, total, pagination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamp() {
        let p = Pagination::new(None, None, 20);
        assert_eq!(p, Pagination { page: 1, limit: 20 });

        let p = Pagination::new(Some(0), Some(500), 10);
        assert_eq!(p, Pagination { page: 1, limit: 100 });
        assert_eq!(Pagination::new(Some(3), Some(10), 20).offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PaginatedResponse::new(vec![1, 2], 21, Pagination::new(Some(1), Some(10), 10));
        assert_eq!(page.total_pages, 3);

        let empty: PaginatedResponse<i32> =
            PaginatedResponse::new(vec![], 0, Pagination::new(None, None, 10));
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_from_vec_slices_page() {
        let page = PaginatedResponse::from_vec((1..=25).collect(), Pagination::new(Some(3), Some(10), 10));
        assert_eq!(page.data, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }
}
