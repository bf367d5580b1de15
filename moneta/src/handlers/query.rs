//! Query-string parsing for list endpoints
//!
//! A list request's query string carries three things side by side: filter
//! keys (`name__icontains=foo`), `ordering` terms and the pagination pair of
//! the configured style. [`ListQuery`] splits them apart and validates each
//! against the entity's [`FilterSchema`].
//!
//! # Example
//!
//! ```rust
//! use axum::http::Uri;
//! use moneta::config::PaginationConfig;
//! use moneta::domain::Tag;
//! use moneta::filters::Filterable;
//! use moneta::handlers::ListQuery;
//!
//! let uri: Uri = "/tag/?name__icontains=foo&ordering=-name&limit=10&offset=0"
//!     .parse()
//!     .unwrap();
//! let query = ListQuery::from_uri(&uri, Tag::filter_schema(), &PaginationConfig::default())
//!     .unwrap();
//!
//! assert_eq!(query.filters.len(), 1);
//! assert_eq!(query.ordering.unwrap().to_string(), "-name");
//! ```

use std::fmt;

use axum::{extract::Query, http::Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{PaginationConfig, PaginationStyle};
use crate::entity::Record;
use crate::error::ValidationError;
use crate::filters::{FilterSchema, FilterSpec, OrderSpec};
use crate::pagination::{LimitOffsetParams, PageNumberParams, PaginationStrategy};

/// Query-string key holding ordering terms
pub const ORDERING_KEY: &str = "ordering";

/// Validated list parameters
pub struct ListQuery {
    /// Validated filter entries
    pub filters: FilterSpec,
    /// Requested ordering, if any
    pub ordering: Option<OrderSpec>,
    /// Pagination strategy of the configured style
    pub pagination: Box<dyn PaginationStrategy>,
}

impl fmt::Debug for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListQuery")
            .field("filters", &self.filters)
            .field("ordering", &self.ordering)
            .field("pagination", &self.pagination.describe())
            .finish()
    }
}

impl ListQuery {
    /// Split and validate a request URI's query string
    ///
    /// # Errors
    ///
    /// A `ValidationError` for unknown or malformed filter keys, orderings
    /// outside the schema, or pagination values breaking the pair and bound
    /// rules.
    pub fn from_uri(
        uri: &Uri,
        schema: &FilterSchema,
        pagination: &PaginationConfig,
    ) -> Result<Self, ValidationError> {
        let Query(pairs) = parse::<Vec<(String, String)>>(uri)?;

        let pagination_keys = match pagination.style {
            PaginationStyle::LimitOffset => LimitOffsetParams::KEYS,
            PaginationStyle::PageNumber => PageNumberParams::KEYS,
        };

        let mut ordering = Vec::new();
        let mut params = Record::new();
        for (key, value) in pairs {
            if key == ORDERING_KEY {
                ordering.push(value);
            } else if !pagination_keys.contains(&key.as_str()) {
                params.insert(key, Value::String(value));
            }
        }

        let filters = schema.validate(&params)?;
        let ordering = schema.ordering(&ordering)?;
        let pagination: Box<dyn PaginationStrategy> = match pagination.style {
            PaginationStyle::LimitOffset => Box::new(
                parse::<LimitOffsetParams>(uri)?
                    .0
                    .validate(pagination.max_page_size)?,
            ),
            PaginationStyle::PageNumber => Box::new(
                parse::<PageNumberParams>(uri)?
                    .0
                    .validate(pagination.max_page_size)?,
            ),
        };

        Ok(Self {
            filters,
            ordering,
            pagination,
        })
    }
}

fn parse<T: DeserializeOwned>(uri: &Uri) -> Result<Query<T>, ValidationError> {
    Query::<T>::try_from_uri(uri).map_err(|rejection| ValidationError::new(rejection.body_text()))
}
