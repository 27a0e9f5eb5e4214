//! Page/limit handling for list endpoints.

use serde::Serialize;

/// Default page size when none is requested.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 100;

/// Errors for out-of-range paging parameters.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1")]
    PageTooSmall,
    #[error("limit must be between 1 and {MAX_LIMIT}")]
    LimitOutOfRange,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    /// Validate optional `page` and `limit` values, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when `page < 1` or `limit` is outside `1..=100`.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(PaginationError::PageTooSmall);
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PaginationError::LimitOutOfRange);
        }

        Ok(Self { page, limit })
    }

    /// A fixed-size first page, used for "latest N" queries.
    #[must_use]
    pub const fn first(limit: i64) -> Self {
        Self { page: 1, limit }
    }

    #[must_use]
    pub const fn page(&self) -> i64 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip: `(page - 1) * limit`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Build the response metadata for a total row count.
    #[must_use]
    pub const fn meta(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: pages_for(total, self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

const fn pages_for(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.limit(), 10);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(20)).unwrap();
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(
            PageRequest::new(Some(0), None),
            Err(PaginationError::PageTooSmall)
        );
        assert_eq!(
            PageRequest::new(None, Some(0)),
            Err(PaginationError::LimitOutOfRange)
        );
        assert_eq!(
            PageRequest::new(None, Some(101)),
            Err(PaginationError::LimitOutOfRange)
        );
        assert!(PageRequest::new(None, Some(100)).is_ok());
    }

    #[test]
    fn test_pages_round_up() {
        let req = PageRequest::new(None, Some(10)).unwrap();
        assert_eq!(req.meta(0).pages, 0);
        assert_eq!(req.meta(1).pages, 1);
        assert_eq!(req.meta(10).pages, 1);
        assert_eq!(req.meta(11).pages, 2);
    }
}
