//! Backend-neutral select description
//!
//! A [`Query`] is what the filter manager, the pagination strategies and the
//! repository compose: a bound entity, AND-ed predicates, sort keys and an
//! optional slice. Stores render it into their own query language.

use std::fmt;
use std::str::FromStr;

use crate::entity::{EntityMeta, FieldDef, FieldValue};

/// Attribute lookup applied by a filter key such as `name__icontains`
///
/// # Example
///
/// ```rust
/// use moneta::query::Lookup;
///
/// assert_eq!("icontains".parse::<Lookup>(), Ok(Lookup::IContains));
/// assert!("startswith".parse::<Lookup>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
    /// Equal to
    Eq,
    /// Case-insensitive full equality
    IEq,
    /// Case-sensitive substring match
    Contains,
    /// Case-insensitive substring match
    IContains,
}

impl Lookup {
    /// Every supported lookup, in the order they are reported to clients
    pub const ALL: [Lookup; 8] = [
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Eq,
        Self::IEq,
        Self::Contains,
        Self::IContains,
    ];

    /// Suffix used in filter keys
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::IEq => "ieq",
            Self::Contains => "contains",
            Self::IContains => "icontains",
        }
    }

    /// Comma-separated list of valid suffixes
    pub fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(Lookup::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the lookup only applies to textual fields
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::IEq | Self::Contains | Self::IContains)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lookup| lookup.as_str() == s)
            .ok_or_else(|| format!("unknown lookup '{}'", s))
    }
}

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A single resolved condition: `field <lookup> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Resolved field
    pub field: &'static FieldDef,
    /// Comparison applied
    pub lookup: Lookup,
    /// Typed right-hand side
    pub value: FieldValue,
}

impl Predicate {
    /// Create a predicate on a resolved field
    pub fn new(field: &'static FieldDef, lookup: Lookup, value: FieldValue) -> Self {
        Self {
            field,
            lookup,
            value,
        }
    }

    /// Exact equality predicate
    pub fn eq(field: &'static FieldDef, value: FieldValue) -> Self {
        Self::new(field, Lookup::Eq, value)
    }
}

/// A resolved sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Resolved field
    pub field: &'static FieldDef,
    /// Sort direction
    pub direction: OrderDirection,
}

impl SortKey {
    /// Ascending sort on a field
    pub fn asc(field: &'static FieldDef) -> Self {
        Self {
            field,
            direction: OrderDirection::Ascending,
        }
    }

    /// Descending sort on a field
    pub fn desc(field: &'static FieldDef) -> Self {
        Self {
            field,
            direction: OrderDirection::Descending,
        }
    }
}

/// Select description for one entity
///
/// Builder methods consume and return the query.
///
/// # Example
///
/// ```rust
/// use moneta::domain::Tag;
/// use moneta::entity::Entity;
/// use moneta::query::{Predicate, Query, SortKey};
///
/// let meta = Tag::meta();
/// let query = Query::select(meta)
///     .filter(Predicate::eq(meta.field("name").unwrap(), "food".into()))
///     .order_by(SortKey::desc(meta.field("id").unwrap()))
///     .offset(10)
///     .limit(5);
///
/// assert_eq!(query.predicates().len(), 1);
/// assert_eq!(query.get_limit(), Some(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    meta: &'static EntityMeta,
    predicates: Vec<Predicate>,
    ordering: Vec<SortKey>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl Query {
    /// Base query selecting every row of an entity
    pub fn select(meta: &'static EntityMeta) -> Self {
        Self {
            meta,
            predicates: Vec::new(),
            ordering: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// AND a predicate onto the query
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// AND several predicates onto the query
    #[must_use]
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Append a sort key with lower precedence than existing ones
    #[must_use]
    pub fn order_by(mut self, key: SortKey) -> Self {
        self.ordering.push(key);
        self
    }

    /// Skip the first `offset` rows
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return at most `limit` rows
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The same selection without ordering or slicing, used for counts
    #[must_use]
    pub fn unsliced(&self) -> Self {
        Self {
            meta: self.meta,
            predicates: self.predicates.clone(),
            ordering: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Bound entity
    pub fn meta(&self) -> &'static EntityMeta {
        self.meta
    }

    /// AND-ed predicates
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Sort keys in precedence order
    pub fn ordering(&self) -> &[SortKey] {
        &self.ordering
    }

    /// Row offset, if any
    pub fn get_offset(&self) -> Option<u64> {
        self.offset
    }

    /// Row limit, if any
    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::FieldKind;

    static FIELDS: &[FieldDef] = &[FieldDef::id(), FieldDef::new("name", FieldKind::Text)];
    static META: EntityMeta = EntityMeta::new("Thing", "things", FIELDS);

    #[test]
    fn test_lookup_parse_all() {
        for lookup in Lookup::ALL {
            assert_eq!(lookup.as_str().parse::<Lookup>(), Ok(lookup));
        }
        assert!("like".parse::<Lookup>().is_err());
    }

    #[test]
    fn test_valid_list_order() {
        assert_eq!(
            Lookup::valid_list(),
            "gt, gte, lt, lte, eq, ieq, contains, icontains"
        );
    }

    #[test]
    fn test_builder_accumulates() {
        let name = META.field("name").unwrap();
        let query = Query::select(&META)
            .filter(Predicate::eq(name, "a".into()))
            .filter(Predicate::new(name, Lookup::IContains, "b".into()))
            .order_by(SortKey::desc(name))
            .offset(3)
            .limit(2);

        assert_eq!(query.predicates().len(), 2);
        assert_eq!(query.ordering()[0].direction, OrderDirection::Descending);
        assert_eq!(query.get_offset(), Some(3));
        assert_eq!(query.get_limit(), Some(2));
    }

    #[test]
    fn test_unsliced_keeps_predicates_only() {
        let name = META.field("name").unwrap();
        let query = Query::select(&META)
            .filter(Predicate::eq(name, "a".into()))
            .order_by(SortKey::asc(name))
            .offset(3)
            .limit(2);

        let count_query = query.unsliced();
        assert_eq!(count_query.predicates(), query.predicates());
        assert!(count_query.ordering().is_empty());
        assert_eq!(count_query.get_offset(), None);
        assert_eq!(count_query.get_limit(), None);
    }

    #[test]
    fn test_order_direction_display() {
        assert_eq!(OrderDirection::Ascending.to_string(), "asc");
        assert_eq!(OrderDirection::Descending.to_string(), "desc");
    }
}
