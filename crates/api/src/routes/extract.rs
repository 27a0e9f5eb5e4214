//! Request extractors whose rejections render as `VALIDATION_ERROR`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use emporium_core::pagination::{PageRequest, PaginationError};

use crate::error::AppError;

/// JSON body extractor.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ValidQuery<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected path parameter");
        Self::Validation("Invalid ID format".to_string())
    }
}

impl From<PaginationError> for AppError {
    fn from(e: PaginationError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Validate into a [`PageRequest`] (page >= 1, limit 1..=100).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when either value is out of range.
    pub fn to_request(self) -> Result<PageRequest, AppError> {
        Ok(PageRequest::new(self.page, self.limit)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_bounds() {
        let page = PageQuery::default().to_request().unwrap();
        assert_eq!((page.page(), page.limit()), (1, 10));

        let err = PageQuery {
            page: Some(0),
            limit: None,
        }
        .to_request()
        .unwrap_err();
        assert_eq!(err.parts().1, "VALIDATION_ERROR");

        assert!(
            PageQuery {
                page: None,
                limit: Some(101),
            }
            .to_request()
            .is_err()
        );
    }
}
