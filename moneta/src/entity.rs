//! Entity field registry and typed field values
//!
//! Every persisted type describes itself with a `'static` [`EntityMeta`]: the table
//! it lives in and the typed fields that may be addressed by name. Filters,
//! ordering and equality lookups all resolve field names through this registry,
//! so an unknown name surfaces as [`Error::ImproperlyConfigured`] instead of an
//! invalid query.
//!
//! # Example
//!
//! ```rust
//! use moneta::entity::{EntityMeta, FieldDef, FieldKind};
//!
//! static FIELDS: &[FieldDef] = &[
//!     FieldDef::id(),
//!     FieldDef::new("name", FieldKind::Text),
//! ];
//! static META: EntityMeta = EntityMeta::new("Tag", "tags", FIELDS);
//!
//! assert!(META.field("name").is_ok());
//! assert!(META.field("colour").is_err());
//! ```

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result, ValidationError};

/// A stored row: field name to JSON value
pub type Record = Map<String, Value>;

/// Name of the identifier field every entity carries
pub const ID_FIELD: &str = "id";

/// Timestamp columns stamped by the repository
pub const CREATED_AT_FIELD: &str = "created_at";
/// Timestamp column refreshed on every update
pub const UPDATED_AT_FIELD: &str = "updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 64-bit integer (identifiers, foreign keys)
    Integer,
    /// Double precision number (amounts, balances)
    Float,
    /// Free text
    Text,
    /// Boolean flag
    Bool,
    /// Calendar date without time
    Date,
    /// Naive UTC timestamp
    DateTime,
    /// Text restricted to a fixed set of values (database enum)
    Choice(&'static [&'static str]),
}

impl FieldKind {
    /// Whether substring lookups make sense for this kind
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Choice(_))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Bool => write!(f, "bool"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "datetime"),
            Self::Choice(values) => write!(f, "choice({})", values.join("|")),
        }
    }
}

/// One addressable field of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name
    pub name: &'static str,
    /// Declared type
    pub kind: FieldKind,
    /// Whether NULL is an acceptable stored value
    pub nullable: bool,
    /// Whether values must be unique across the table
    pub unique: bool,
    /// Whether a value is supplied (by the store or as a stamped timestamp) when none is given
    pub defaulted: bool,
    /// Table whose `id` a non-null value must name
    pub references: Option<&'static str>,
}

impl FieldDef {
    /// A required, non-unique field
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            defaulted: false,
            references: None,
        }
    }

    /// The integer primary key
    pub const fn id() -> Self {
        Self {
            name: ID_FIELD,
            kind: FieldKind::Integer,
            nullable: false,
            unique: true,
            defaulted: true,
            references: None,
        }
    }

    /// Mark the field as nullable
    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Mark the field as unique
    #[must_use]
    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Mark the field as a foreign key to `table`
    #[must_use]
    pub const fn references(self, table: &'static str) -> Self {
        Self {
            references: Some(table),
            ..self
        }
    }

    /// Mark the field as supplied when absent
    #[must_use]
    pub const fn defaulted(self) -> Self {
        Self {
            defaulted: true,
            ..self
        }
    }

    /// Coerce an inbound JSON scalar to this field's type
    ///
    /// Query-string values arrive as strings, so every kind also accepts its
    /// textual form (`"10"`, `"true"`, `"2024-12-01"`).
    pub fn coerce(&self, value: &Value) -> std::result::Result<FieldValue, String> {
        FieldValue::coerce(self.kind, value)
    }
}

/// Static description of an entity type
#[derive(Debug, PartialEq, Eq)]
pub struct EntityMeta {
    /// Entity name used in error context
    pub name: &'static str,
    /// Backing table
    pub table: &'static str,
    /// Addressable fields
    pub fields: &'static [FieldDef],
    /// Whether `created_at`/`updated_at` are stamped on write
    pub timestamps: bool,
}

impl EntityMeta {
    /// Describe an entity without timestamp columns
    pub const fn new(name: &'static str, table: &'static str, fields: &'static [FieldDef]) -> Self {
        Self {
            name,
            table,
            fields,
            timestamps: false,
        }
    }

    /// Enable `created_at`/`updated_at` stamping
    ///
    /// The timestamp fields must be declared in `fields` as well.
    #[must_use]
    pub const fn with_timestamps(self) -> Self {
        Self {
            timestamps: true,
            ..self
        }
    }

    /// Resolve a field by name
    pub fn field(&self, name: &str) -> Result<&'static FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                Error::ImproperlyConfigured(format!(
                    "{} has no field named '{}'",
                    self.name, name
                ))
            })
    }

    /// Whether a field with this name is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Resolve and coerce a mapping of equality filters
    ///
    /// Unknown fields fail with `ImproperlyConfigured`, values that do not fit
    /// the field type fail with a `ValidationError` naming the key.
    pub fn resolve_equalities(
        &self,
        filters: &Record,
    ) -> Result<Vec<(&'static FieldDef, FieldValue)>> {
        filters
            .iter()
            .map(|(key, raw)| {
                let field = self.field(key)?;
                let value = field
                    .coerce(raw)
                    .map_err(|msg| ValidationError::invalid_value(key.as_str(), msg))?;
                Ok((field, value))
            })
            .collect()
    }
}

/// A persisted entity type
///
/// Construction from a mapping is deserialisation of the stored record.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Field registry for this entity
    fn meta() -> &'static EntityMeta;

    /// Identifier of this instance
    fn id(&self) -> i64;

    /// Values filled in on create for fields the payload leaves out
    fn defaults() -> Record {
        Record::new()
    }

    /// Build an entity from a stored record
    fn from_record(record: Record) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Typed scalar used in predicates and comparisons
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL NULL / JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Date
    Date(NaiveDate),
    /// Timestamp
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Coerce a JSON scalar against a declared field kind
    pub fn coerce(kind: FieldKind, value: &Value) -> std::result::Result<Self, String> {
        if value.is_null() {
            return Ok(Self::Null);
        }
        match kind {
            FieldKind::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(Self::Integer)
                    .ok_or_else(|| format!("expected an integer, got {}", n)),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Self::Integer)
                    .map_err(|_| format!("expected an integer, got '{}'", s)),
                other => Err(format!("expected an integer, got {}", other)),
            },
            FieldKind::Float => match value {
                Value::Number(n) => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| format!("expected a number, got {}", n)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(Self::Float)
                    .ok_or_else(|| format!("expected a number, got '{}'", s)),
                other => Err(format!("expected a number, got {}", other)),
            },
            FieldKind::Text | FieldKind::Choice(_) => match value {
                Value::String(s) => Ok(Self::Text(s.clone())),
                other => Err(format!("expected a string, got {}", other)),
            },
            FieldKind::Bool => match value {
                Value::Bool(b) => Ok(Self::Bool(*b)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Self::Bool(true)),
                    "false" | "0" => Ok(Self::Bool(false)),
                    _ => Err(format!("expected a boolean, got '{}'", s)),
                },
                other => Err(format!("expected a boolean, got {}", other)),
            },
            FieldKind::Date => match value {
                Value::String(s) => parse_date(s)
                    .map(Self::Date)
                    .ok_or_else(|| format!("expected a date (YYYY-MM-DD), got '{}'", s)),
                other => Err(format!("expected a date, got {}", other)),
            },
            FieldKind::DateTime => match value {
                Value::String(s) => parse_datetime(s)
                    .map(Self::DateTime)
                    .ok_or_else(|| format!("expected a timestamp, got '{}'", s)),
                other => Err(format!("expected a timestamp, got {}", other)),
            },
        }
    }

    /// JSON form as stored in a [`Record`]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(n) => Value::Number((*n).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            Self::DateTime(dt) => Value::String(dt.format(DATETIME_FORMATS[0]).to_string()),
        }
    }

    /// Whether this is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text content, if textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Compare two values of compatible types
    ///
    /// Integers and floats compare numerically. NULL and mismatched types are
    /// incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::DateTime(b)) => a.and_hms_opt(0, 0, 0).map(|a| a.cmp(b)),
            (Self::DateTime(a), Self::Date(b)) => b.and_hms_opt(0, 0, 0).map(|b| a.cmp(&b)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMATS[0])),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_end_matches('Z');
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Current naive UTC timestamp as stored in timestamp columns
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static FIELDS: &[FieldDef] = &[
        FieldDef::id(),
        FieldDef::new("name", FieldKind::Text).unique(),
        FieldDef::new("age", FieldKind::Integer).nullable(),
    ];
    static META: EntityMeta = EntityMeta::new("Person", "people", FIELDS);

    #[test]
    fn test_field_lookup() {
        assert_eq!(META.field("name").unwrap().kind, FieldKind::Text);
        assert!(META.field("name").unwrap().unique);
        assert!(META.field("age").unwrap().nullable);
        assert!(META.has_field("id"));
    }

    #[test]
    fn test_unknown_field_is_improperly_configured() {
        let err = META.field("height").unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(ref msg) if msg.contains("height")));
    }

    #[test]
    fn test_coerce_from_query_strings() {
        assert_eq!(
            FieldValue::coerce(FieldKind::Integer, &json!("10")),
            Ok(FieldValue::Integer(10))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Bool, &json!("true")),
            Ok(FieldValue::Bool(true))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Date, &json!("2024-12-01")),
            Ok(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()))
        );
        assert_eq!(
            FieldValue::coerce(FieldKind::Float, &json!(12.5)),
            Ok(FieldValue::Float(12.5))
        );
    }

    #[test]
    fn test_coerce_rejects_mismatched_values() {
        assert!(FieldValue::coerce(FieldKind::Integer, &json!("ten")).is_err());
        assert!(FieldValue::coerce(FieldKind::Date, &json!("12/01/2024")).is_err());
        assert!(FieldValue::coerce(FieldKind::Text, &json!(3)).is_err());
        assert!(FieldValue::coerce(FieldKind::Float, &json!("NaN")).is_err());
    }

    #[test]
    fn test_datetime_accepts_date_only() {
        let value = FieldValue::coerce(FieldKind::DateTime, &json!("2024-01-02")).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(value, FieldValue::DateTime(expected));
    }

    #[test]
    fn test_json_round_trip_through_kind() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(date.to_json(), json!("2024-03-09"));
        assert_eq!(FieldValue::coerce(FieldKind::Date, &date.to_json()), Ok(date));
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(FieldValue::Null.compare(&FieldValue::Integer(1)), None);
        assert_eq!(FieldValue::Text("a".into()).compare(&FieldValue::Integer(1)), None);
    }

    #[test]
    fn test_resolve_equalities() {
        let filters = json!({"name": "Test", "age": "30"});
        let resolved = META
            .resolve_equalities(filters.as_object().unwrap())
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved
            .iter()
            .any(|(f, v)| f.name == "age" && *v == FieldValue::Integer(30)));
    }

    #[test]
    fn test_resolve_equalities_bad_value_names_key() {
        let filters = json!({"age": "old"});
        let err = META
            .resolve_equalities(filters.as_object().unwrap())
            .unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.key.as_deref(), Some("age")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
