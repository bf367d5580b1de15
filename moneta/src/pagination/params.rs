//! Query-string pagination parameters

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::{LimitOffset, PageNumber};

/// Upper bound on `limit` and `page_size` unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

/// `?limit=..&offset=..`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitOffsetParams {
    /// Maximum rows to return
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip
    #[serde(default)]
    pub offset: Option<u64>,
}

impl LimitOffsetParams {
    /// Query-string keys consumed by these parameters
    pub const KEYS: &'static [&'static str] = &["limit", "offset"];

    /// Check pair presence and bounds, producing a strategy
    ///
    /// # Errors
    ///
    /// Fails when only one of the pair is supplied or `limit` is outside
    /// `1..=max_page_size`.
    pub fn validate(self, max_page_size: u64) -> Result<LimitOffset, ValidationError> {
        match (self.limit, self.offset) {
            (Some(limit), Some(_)) => check_size("limit", limit, max_page_size)?,
            (None, None) => {}
            (Some(_), None) => {
                return Err(ValidationError::for_key(
                    "offset",
                    "offset is required when limit is given",
                ))
            }
            (None, Some(_)) => {
                return Err(ValidationError::for_key(
                    "limit",
                    "limit is required when offset is given",
                ))
            }
        }
        Ok(LimitOffset::new(self.limit, self.offset))
    }
}

/// `?page=..&page_size=..` (short forms `p` and `s`)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageNumberParams {
    /// 1-indexed page
    #[serde(default, alias = "p")]
    pub page: Option<u64>,
    /// Rows per page
    #[serde(default, alias = "s")]
    pub page_size: Option<u64>,
}

impl PageNumberParams {
    /// Query-string keys consumed by these parameters
    pub const KEYS: &'static [&'static str] = &["page", "page_size", "p", "s"];

    /// Check pair presence and bounds, producing a strategy
    ///
    /// # Errors
    ///
    /// Fails when only one of the pair is supplied, `page` is zero, or
    /// `page_size` is outside `1..=max_page_size`.
    pub fn validate(self, max_page_size: u64) -> Result<PageNumber, ValidationError> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) => {
                if page < 1 {
                    return Err(ValidationError::for_key(
                        "page",
                        "page must be greater than or equal to 1",
                    ));
                }
                check_size("page_size", size, max_page_size)?;
            }
            (None, None) => {}
            (Some(_), None) => {
                return Err(ValidationError::for_key(
                    "page_size",
                    "page_size is required when page is given",
                ))
            }
            (None, Some(_)) => {
                return Err(ValidationError::for_key(
                    "page",
                    "page is required when page_size is given",
                ))
            }
        }
        Ok(PageNumber::new(self.page, self.page_size))
    }
}

fn check_size(key: &str, value: u64, max: u64) -> Result<(), ValidationError> {
    if value < 1 || value > max {
        return Err(ValidationError::for_key(
            key,
            format!("{key} must be between 1 and {max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PaginationStrategy;
    use serde_json::json;

    #[test]
    fn test_limit_offset_pair_required() {
        let err = LimitOffsetParams {
            limit: Some(10),
            offset: None,
        }
        .validate(DEFAULT_MAX_PAGE_SIZE)
        .unwrap_err();
        assert_eq!(err.key.as_deref(), Some("offset"));

        let err = LimitOffsetParams {
            limit: None,
            offset: Some(10),
        }
        .validate(DEFAULT_MAX_PAGE_SIZE)
        .unwrap_err();
        assert_eq!(err.key.as_deref(), Some("limit"));
    }

    #[test]
    fn test_limit_bounds() {
        let params = |limit| LimitOffsetParams {
            limit: Some(limit),
            offset: Some(0),
        };
        assert!(params(0).validate(100).is_err());
        assert!(params(101).validate(100).is_err());
        assert!(params(100).validate(100).is_ok());
        assert!(params(1).validate(100).is_ok());
    }

    #[test]
    fn test_absent_pair_is_unpaginated() {
        let strategy = LimitOffsetParams::default().validate(100).unwrap();
        assert!(strategy.describe().is_empty());

        let strategy = PageNumberParams::default().validate(100).unwrap();
        assert!(strategy.describe().is_empty());
    }

    #[test]
    fn test_page_number_pair_required() {
        let err = PageNumberParams {
            page: Some(2),
            page_size: None,
        }
        .validate(100)
        .unwrap_err();
        assert_eq!(err.key.as_deref(), Some("page_size"));
    }

    #[test]
    fn test_page_number_bounds() {
        let params = |page, page_size| PageNumberParams {
            page: Some(page),
            page_size: Some(page_size),
        };
        assert!(params(0, 10).validate(100).is_err());
        assert!(params(1, 0).validate(100).is_err());
        assert!(params(1, 101).validate(100).is_err());
        assert!(params(5, 100).validate(100).is_ok());
    }

    #[test]
    fn test_page_number_aliases() {
        let params: PageNumberParams = serde_json::from_value(json!({"p": 2, "s": 20})).unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.page_size, Some(20));
    }
}
