//! Pagination strategies for list operations
//!
//! Two strategies are provided:
//!
//! - [`LimitOffset`]: `?limit=4&offset=8`
//! - [`PageNumber`]: `?page=2&page_size=20` (or `?p=2&s=20`)
//!
//! A strategy slices the query and records the total number of rows the
//! unsliced filtered query matches. [`PaginationStrategy::describe`] then
//! yields the metadata attached to the [`PaginatedResult`]. When no paging
//! parameters were supplied the metadata is empty and the `pagination` key is
//! left out of the response.
//!
//! # Example
//!
//! ```rust
//! use moneta::domain::Tag;
//! use moneta::entity::Entity;
//! use moneta::pagination::{LimitOffset, PaginationStrategy};
//! use moneta::query::Query;
//!
//! let mut strategy = LimitOffset::new(Some(4), Some(8));
//! let query = strategy.paginate(Query::select(Tag::meta()), 10);
//!
//! assert_eq!(query.get_offset(), Some(8));
//! assert_eq!(query.get_limit(), Some(4));
//! assert_eq!(strategy.describe().count, Some(10));
//! ```

mod params;
mod strategy;

pub use params::{LimitOffsetParams, PageNumberParams, DEFAULT_MAX_PAGE_SIZE};
pub use strategy::{LimitOffset, PageNumber};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::query::Query;

/// Slices a query and describes the slice
pub trait PaginationStrategy: Send + Sync {
    /// Apply the slice to `query`
    ///
    /// `count` is the number of rows matched by the filtered query before
    /// slicing. It is recorded for [`describe`](Self::describe).
    fn paginate(&mut self, query: Query, count: u64) -> Query;

    /// Metadata for the last paginated query
    ///
    /// Empty when no paging parameters were supplied.
    fn describe(&self) -> PaginationMeta;
}

/// Pagination metadata attached to list responses
///
/// Absent fields are omitted from the serialized form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    /// Rows matched by the filtered query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Limit applied (limit/offset strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Offset applied (limit/offset strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Current page (page number strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Page size (page number strategy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    /// Previous page, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_page: Option<u64>,
    /// Next page, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u64>,
    /// Number of pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
}

impl PaginationMeta {
    /// Whether any field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// List payload: rows plus optional pagination metadata
///
/// Serializes as `{"data": [...], "pagination": {...}}` with `pagination`
/// omitted when no paging was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The rows of this page
    pub data: Vec<T>,
    /// Pagination metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T> PaginatedResult<T> {
    /// Wrap rows with metadata, dropping the metadata when it is empty
    pub fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            data,
            pagination: (!pagination.is_empty()).then_some(pagination),
        }
    }

    /// Map each row to a new type
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

impl<T: Serialize> IntoResponse for PaginatedResult<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
