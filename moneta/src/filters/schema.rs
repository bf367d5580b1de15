//! Filter and ordering input validation
//!
//! Untrusted `field__lookup` parameters are checked here before any value
//! reaches a query. Validation runs in a fixed order over the whole input:
//! 1. every key with one `__` must end in a known lookup
//! 2. keys with more than one `__` are rejected
//! 3. keys not declared by the entity's [`FilterSchema`] are rejected

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::entity::{Entity, Record};
use crate::error::ValidationError;
use crate::query::{Lookup, OrderDirection};

/// Separator between field name and lookup in a filter key
pub const LOOKUP_SEPARATOR: &str = "__";

/// One validated `field__lookup = value` entry
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    /// Original key, e.g. `date__gte`
    pub key: String,
    /// Field part of the key
    pub field: String,
    /// Lookup part of the key
    pub lookup: Lookup,
    /// Raw value as received
    pub value: Value,
}

/// Validated mapping of filter keys to values
///
/// # Example
///
/// ```rust
/// use moneta::filters::FilterSpec;
/// use serde_json::json;
///
/// let params = json!({"name__icontains": "foo", "date__gte": "2024-01-01"});
/// let spec = FilterSpec::parse(params.as_object().unwrap()).unwrap();
/// assert_eq!(spec.len(), 2);
///
/// let params = json!({"name__startswith": "foo"});
/// assert!(FilterSpec::parse(params.as_object().unwrap()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    /// An empty spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate lookup suffixes and build a spec
    ///
    /// Keys without a separator are not lookups and are skipped, as are
    /// null values (omitted optional filters).
    pub fn parse(params: &Record) -> Result<Self, ValidationError> {
        check_lookups(params.keys().map(String::as_str))?;

        let entries = params
            .iter()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(key, value)| {
                let (field, lookup) = split_key(key)?;
                Some(FilterEntry {
                    key: key.clone(),
                    field: field.to_string(),
                    lookup,
                    value: value.clone(),
                })
            })
            .collect();

        Ok(Self { entries })
    }

    /// Whether no filters were supplied
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = &FilterEntry> {
        self.entries.iter()
    }
}

fn split_key(key: &str) -> Option<(&str, Lookup)> {
    let (field, suffix) = key.split_once(LOOKUP_SEPARATOR)?;
    if suffix.contains(LOOKUP_SEPARATOR) {
        return None;
    }
    suffix.parse().ok().map(|lookup| (field, lookup))
}

/// Lookup-suffix check followed by the multi-separator check
fn check_lookups<'a>(keys: impl Iterator<Item = &'a str> + Clone) -> Result<(), ValidationError> {
    for key in keys.clone() {
        if key.matches(LOOKUP_SEPARATOR).count() == 1 {
            let suffix = key.rsplit(LOOKUP_SEPARATOR).next().unwrap_or_default();
            if suffix.parse::<Lookup>().is_err() {
                return Err(ValidationError::for_key(
                    key,
                    format!(
                        "Filter attribute {} should be a valid lookup: {}",
                        key,
                        Lookup::valid_list()
                    ),
                ));
            }
        }
    }

    if let Some(key) = keys
        .into_iter()
        .find(|key| key.matches(LOOKUP_SEPARATOR).count() > 1)
    {
        return Err(ValidationError::for_key(
            key,
            format!(
                "Filter attribute {} has more than one '{}' separator; nested lookups are not supported",
                key, LOOKUP_SEPARATOR
            ),
        ));
    }
    Ok(())
}

/// One ordering term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Field name with the sign stripped
    pub field: String,
    /// Requested direction
    pub direction: OrderDirection,
}

/// Ordered sequence of sort terms; position is precedence
///
/// # Example
///
/// ```rust
/// use moneta::filters::OrderSpec;
/// use moneta::query::OrderDirection;
///
/// let spec = OrderSpec::parse(["-name", "+age", "id"]).unwrap();
/// let terms: Vec<_> = spec.terms().iter().map(|t| (t.field.as_str(), t.direction)).collect();
/// assert_eq!(
///     terms,
///     vec![
///         ("name", OrderDirection::Descending),
///         ("age", OrderDirection::Ascending),
///         ("id", OrderDirection::Ascending),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec {
    terms: Vec<OrderTerm>,
}

impl OrderSpec {
    /// Parse ordering items; each item may itself be comma-separated
    pub fn parse<I, S>(items: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms = Vec::new();
        for item in items {
            for raw in item.as_ref().split(',') {
                terms.push(parse_term(raw)?);
            }
        }
        Ok(Self { terms })
    }

    /// Terms in precedence order
    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    /// Whether no terms were given
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl FromStr for OrderSpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse([s])
    }
}

impl fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .terms
            .iter()
            .map(|t| match t.direction {
                OrderDirection::Ascending => t.field.clone(),
                OrderDirection::Descending => format!("-{}", t.field),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

fn parse_term(raw: &str) -> Result<OrderTerm, ValidationError> {
    let raw = raw.trim();
    let (field, direction) = match raw.strip_prefix('-') {
        Some(rest) => (rest, OrderDirection::Descending),
        None => (raw.strip_prefix('+').unwrap_or(raw), OrderDirection::Ascending),
    };

    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ValidationError::for_key(
            "ordering",
            format!("Invalid ordering term '{}'", raw),
        ));
    }

    Ok(OrderTerm {
        field: field.to_string(),
        direction,
    })
}

/// Closed set of filter keys and orderable fields accepted for one entity
///
/// # Example
///
/// ```rust
/// use moneta::filters::FilterSchema;
/// use serde_json::json;
///
/// static TAG_FILTERS: FilterSchema =
///     FilterSchema::new(&["name__ieq", "name__icontains"], &["name", "id"]);
///
/// let ok = json!({"name__icontains": "foo"});
/// assert!(TAG_FILTERS.validate(ok.as_object().unwrap()).is_ok());
///
/// let undeclared = json!({"description__icontains": "foo"});
/// assert!(TAG_FILTERS.validate(undeclared.as_object().unwrap()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSchema {
    keys: &'static [&'static str],
    orderable: &'static [&'static str],
}

impl FilterSchema {
    /// Declare the accepted filter keys and orderable fields
    pub const fn new(keys: &'static [&'static str], orderable: &'static [&'static str]) -> Self {
        Self { keys, orderable }
    }

    /// Accepted filter keys
    pub fn keys(&self) -> &'static [&'static str] {
        self.keys
    }

    /// Orderable field names
    pub fn orderable(&self) -> &'static [&'static str] {
        self.orderable
    }

    /// Validate filter parameters against this schema
    pub fn validate(&self, params: &Record) -> Result<FilterSpec, ValidationError> {
        check_lookups(params.keys().map(String::as_str))?;

        if let Some(key) = params.keys().find(|k| !self.keys.contains(&k.as_str())) {
            return Err(ValidationError::for_key(
                key.as_str(),
                format!(
                    "Unknown filter attribute {}; accepted: {}",
                    key,
                    self.keys.join(", ")
                ),
            ));
        }

        FilterSpec::parse(params)
    }

    /// Parse and validate raw `ordering` parameters
    ///
    /// Returns `None` when no ordering was requested.
    pub fn ordering<S: AsRef<str>>(&self, raw: &[S]) -> Result<Option<OrderSpec>, ValidationError> {
        if raw.is_empty() {
            return Ok(None);
        }

        let spec = OrderSpec::parse(raw)?;
        if let Some(term) = spec
            .terms()
            .iter()
            .find(|t| !self.orderable.contains(&t.field.as_str()))
        {
            return Err(ValidationError::for_key(
                "ordering",
                format!(
                    "Cannot order by {}; orderable fields: {}",
                    term.field,
                    self.orderable.join(", ")
                ),
            ));
        }
        Ok(Some(spec))
    }
}

/// An entity that exposes a filter schema to list endpoints
pub trait Filterable: Entity {
    /// Accepted filter keys and orderable fields for this entity
    fn filter_schema() -> &'static FilterSchema;
}
