//! Limit/offset and page-number strategies

use crate::query::Query;

use super::{PaginationMeta, PaginationStrategy};

/// Offset-then-limit slicing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitOffset {
    limit: Option<u64>,
    offset: Option<u64>,
    count: Option<u64>,
}

impl LimitOffset {
    /// Create a strategy; either value may be absent
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            limit,
            offset,
            count: None,
        }
    }

    /// Whether any slicing was requested
    pub fn is_requested(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }
}

impl PaginationStrategy for LimitOffset {
    fn paginate(&mut self, query: Query, count: u64) -> Query {
        self.count = Some(count);

        let query = match self.offset {
            Some(offset) => query.offset(offset),
            None => query,
        };
        match self.limit {
            Some(limit) => query.limit(limit),
            None => query,
        }
    }

    fn describe(&self) -> PaginationMeta {
        if !self.is_requested() {
            return PaginationMeta::default();
        }
        PaginationMeta {
            count: self.count,
            limit: self.limit,
            offset: self.offset,
            ..Default::default()
        }
    }
}

/// Page-number slicing
///
/// Pages are 1-indexed. Computed metadata fields equal to zero are dropped:
/// a `count` of zero is omitted along with `total_pages`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageNumber {
    page: Option<u64>,
    page_size: Option<u64>,
    count: Option<u64>,
}

impl PageNumber {
    /// Create a strategy; slicing only happens when both values are present
    pub fn new(page: Option<u64>, page_size: Option<u64>) -> Self {
        Self {
            page,
            page_size,
            count: None,
        }
    }

    fn slice(&self) -> Option<(u64, u64)> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) if size > 0 => Some((page, size)),
            _ => None,
        }
    }
}

impl PaginationStrategy for PageNumber {
    fn paginate(&mut self, query: Query, count: u64) -> Query {
        self.count = Some(count);

        match self.slice() {
            Some((page, size)) => query
                .offset(page.saturating_sub(1).saturating_mul(size))
                .limit(size),
            None => query,
        }
    }

    fn describe(&self) -> PaginationMeta {
        if self.page.is_none() && self.page_size.is_none() {
            return PaginationMeta::default();
        }

        let count = self.count.unwrap_or(0);
        let total_pages = match self.page_size {
            Some(size) if size > 0 => (count as f64 / size as f64).ceil() as u64,
            _ => 0,
        };
        let page = self.page.unwrap_or(0);
        let truthy = |n: u64| (n != 0).then_some(n);

        PaginationMeta {
            count: truthy(count),
            page: self.page.and_then(truthy),
            page_size: self.page_size.and_then(truthy),
            previous_page: (page > 1).then(|| page - 1),
            next_page: (page < total_pages).then(|| page + 1),
            total_pages: truthy(total_pages),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMeta, FieldDef};

    static FIELDS: &[FieldDef] = &[FieldDef::id()];
    static META: EntityMeta = EntityMeta::new("Row", "rows", FIELDS);

    #[test]
    fn test_limit_offset_slices_offset_then_limit() {
        let mut strategy = LimitOffset::new(Some(4), Some(8));
        let query = strategy.paginate(Query::select(&META), 10);

        assert_eq!(query.get_offset(), Some(8));
        assert_eq!(query.get_limit(), Some(4));
        assert_eq!(
            strategy.describe(),
            PaginationMeta {
                count: Some(10),
                limit: Some(4),
                offset: Some(8),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_limit_offset_unset_describes_nothing() {
        let mut strategy = LimitOffset::default();
        let query = strategy.paginate(Query::select(&META), 10);
        assert_eq!(query, Query::select(&META));
        assert!(strategy.describe().is_empty());
    }

    #[test]
    fn test_limit_offset_keeps_zero_count() {
        let mut strategy = LimitOffset::new(Some(5), Some(0));
        strategy.paginate(Query::select(&META), 0);
        let meta = strategy.describe();
        assert_eq!(meta.count, Some(0));
        assert_eq!(meta.offset, Some(0));
    }

    #[test]
    fn test_page_number_offsets() {
        let mut strategy = PageNumber::new(Some(3), Some(2));
        let query = strategy.paginate(Query::select(&META), 6);
        assert_eq!(query.get_offset(), Some(4));
        assert_eq!(query.get_limit(), Some(2));
    }

    #[test]
    fn test_page_number_first_page() {
        let mut strategy = PageNumber::new(Some(1), Some(2));
        strategy.paginate(Query::select(&META), 6);
        let meta = strategy.describe();

        assert_eq!(meta.total_pages, Some(3));
        assert_eq!(meta.previous_page, None);
        assert_eq!(meta.next_page, Some(2));
        assert_eq!(meta.count, Some(6));
        assert_eq!(meta.page, Some(1));
        assert_eq!(meta.page_size, Some(2));
    }

    #[test]
    fn test_page_number_last_page() {
        let mut strategy = PageNumber::new(Some(3), Some(2));
        strategy.paginate(Query::select(&META), 6);
        let meta = strategy.describe();

        assert_eq!(meta.total_pages, Some(3));
        assert_eq!(meta.previous_page, Some(2));
        assert_eq!(meta.next_page, None);
    }

    #[test]
    fn test_page_number_rounds_up() {
        let mut strategy = PageNumber::new(Some(1), Some(4));
        strategy.paginate(Query::select(&META), 9);
        assert_eq!(strategy.describe().total_pages, Some(3));
    }

    #[test]
    fn test_page_number_drops_zero_fields() {
        let mut strategy = PageNumber::new(Some(1), Some(10));
        strategy.paginate(Query::select(&META), 0);
        let meta = strategy.describe();

        assert_eq!(meta.count, None);
        assert_eq!(meta.total_pages, None);
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.page, Some(1));
    }

    #[test]
    fn test_page_number_unset_leaves_query_alone() {
        let mut strategy = PageNumber::default();
        let query = strategy.paginate(Query::select(&META), 6);
        assert_eq!(query, Query::select(&META));
        assert!(strategy.describe().is_empty());
    }
}
