//! Filter manager: validated filters and ordering turned into query operations
//!
//! A [`FilterManager`] is bound to one entity type through its type parameter.
//! All field names and values are resolved when the manager is built, so a
//! manager that exists can always be applied.

use std::marker::PhantomData;

use crate::entity::Entity;
use crate::error::{Error, Result, ValidationError};
use crate::query::{OrderDirection, Predicate, Query, SortKey};

use super::schema::{FilterSpec, OrderSpec};

/// Predicates and sort keys resolved against one entity
///
/// # Example
///
/// ```rust
/// use moneta::domain::Tag;
/// use moneta::entity::Entity;
/// use moneta::filters::{FilterManager, FilterSpec, OrderSpec};
/// use moneta::query::Query;
/// use serde_json::json;
///
/// let params = json!({"name__icontains": "foo"});
/// let spec = FilterSpec::parse(params.as_object().unwrap()).unwrap();
/// let ordering: OrderSpec = "-name".parse().unwrap();
///
/// let manager = FilterManager::<Tag>::new(&spec, Some(&ordering)).unwrap();
/// let query = manager.order(manager.filter(Query::select(Tag::meta())));
/// assert_eq!(query.predicates().len(), 1);
/// assert_eq!(query.ordering().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FilterManager<E: Entity> {
    predicates: Vec<Predicate>,
    ordering: Option<Vec<SortKey>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FilterManager<E> {
    /// Bind a filter spec and optional ordering to `E`
    ///
    /// # Errors
    ///
    /// - `ImproperlyConfigured` when a key or ordering term names a field `E`
    ///   does not have, or a text lookup targets a non-text field
    /// - `ValidationError` when a value cannot be coerced to its field type
    pub fn new(filters: &FilterSpec, ordering: Option<&OrderSpec>) -> Result<Self> {
        let meta = E::meta();

        let predicates = filters
            .iter()
            .map(|entry| {
                let field = meta.field(&entry.field)?;
                if entry.lookup.is_textual() && !field.kind.is_textual() {
                    return Err(Error::ImproperlyConfigured(format!(
                        "Lookup '{}' requires a text field but {}.{} is {}",
                        entry.lookup, meta.name, field.name, field.kind
                    )));
                }
                let value = field
                    .coerce(&entry.value)
                    .map_err(|reason| ValidationError::invalid_value(entry.key.as_str(), reason))?;
                Ok(Predicate::new(field, entry.lookup, value))
            })
            .collect::<Result<Vec<_>>>()?;

        let ordering = ordering
            .map(|spec| {
                spec.terms()
                    .iter()
                    .map(|term| {
                        let field = meta.field(&term.field)?;
                        Ok(match term.direction {
                            OrderDirection::Ascending => SortKey::asc(field),
                            OrderDirection::Descending => SortKey::desc(field),
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        tracing::debug!(
            entity = meta.name,
            predicates = predicates.len(),
            ordering = ordering.as_ref().map_or(0, Vec::len),
            "Filter manager bound"
        );

        Ok(Self {
            predicates,
            ordering,
            _entity: PhantomData,
        })
    }

    /// A manager that neither filters nor orders
    pub fn empty() -> Self {
        Self {
            predicates: Vec::new(),
            ordering: None,
            _entity: PhantomData,
        }
    }

    /// AND every resolved predicate onto the query
    ///
    /// Identity when no filters were supplied.
    pub fn filter(&self, query: Query) -> Query {
        if self.predicates.is_empty() {
            return query;
        }
        query.filter_all(self.predicates.iter().cloned())
    }

    /// Append the resolved sort keys in input order
    ///
    /// Identity when no ordering was supplied.
    pub fn order(&self, query: Query) -> Query {
        match &self.ordering {
            None => query,
            Some(keys) => keys.iter().fold(query, |q, key| q.order_by(*key)),
        }
    }

    /// Resolved predicates
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Resolved sort keys, if ordering was requested
    pub fn sort_keys(&self) -> Option<&[SortKey]> {
        self.ordering.as_deref()
    }
}

impl<E: Entity> Default for FilterManager<E> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityMeta, FieldDef, FieldKind, FieldValue};
    use crate::query::Lookup;
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};

    static FIELDS: &[FieldDef] = &[
        FieldDef::id(),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("age", FieldKind::Integer),
    ];
    static META: EntityMeta = EntityMeta::new("Person", "people", FIELDS);

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Person {
        id: i64,
        name: String,
        age: i64,
    }

    impl Entity for Person {
        fn meta() -> &'static EntityMeta {
            &META
        }

        fn id(&self) -> i64 {
            self.id
        }
    }

    fn spec(value: Value) -> FilterSpec {
        FilterSpec::parse(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let manager = FilterManager::<Person>::new(&FilterSpec::new(), None).unwrap();
        let base = Query::select(&META).limit(3);
        assert_eq!(manager.filter(base.clone()), base);
    }

    #[test]
    fn test_absent_ordering_is_identity() {
        let manager = FilterManager::<Person>::new(&spec(json!({"name__eq": "a"})), None).unwrap();
        let base = Query::select(&META);
        assert_eq!(manager.order(base.clone()), base);
        assert!(manager.sort_keys().is_none());
    }

    #[test]
    fn test_order_precedence() {
        let ordering = OrderSpec::parse(["-name", "+age", "id"]).unwrap();
        let manager = FilterManager::<Person>::new(&FilterSpec::new(), Some(&ordering)).unwrap();
        let query = manager.order(Query::select(&META));

        let keys: Vec<(&str, OrderDirection)> = query
            .ordering()
            .iter()
            .map(|k| (k.field.name, k.direction))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("name", OrderDirection::Descending),
                ("age", OrderDirection::Ascending),
                ("id", OrderDirection::Ascending),
            ]
        );
    }

    #[test]
    fn test_predicates_are_anded_and_coerced() {
        let manager = FilterManager::<Person>::new(
            &spec(json!({"age__gte": "18", "name__icontains": "ann"})),
            None,
        )
        .unwrap();
        let query = manager.filter(Query::select(&META));

        assert_eq!(query.predicates().len(), 2);
        assert!(query
            .predicates()
            .iter()
            .any(|p| p.lookup == Lookup::Gte && p.value == FieldValue::Integer(18)));
    }

    #[test]
    fn test_filter_keeps_existing_predicates() {
        let manager =
            FilterManager::<Person>::new(&spec(json!({"age__lt": 40})), None).unwrap();
        let base = Query::select(&META).filter(Predicate::eq(
            META.field("name").unwrap(),
            FieldValue::Text("Test".into()),
        ));
        assert_eq!(manager.filter(base).predicates().len(), 2);
    }

    #[test]
    fn test_unknown_field_is_improperly_configured() {
        let err = FilterManager::<Person>::new(&spec(json!({"height__gt": 2})), None).unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));

        let ordering: OrderSpec = "-height".parse().unwrap();
        let err = FilterManager::<Person>::new(&FilterSpec::new(), Some(&ordering)).unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_text_lookup_on_number_is_improperly_configured() {
        let err =
            FilterManager::<Person>::new(&spec(json!({"age__icontains": "1"})), None).unwrap_err();
        assert!(matches!(err, Error::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_bad_value_is_validation_error_naming_key() {
        let err =
            FilterManager::<Person>::new(&spec(json!({"age__gt": "old"})), None).unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(e.key.as_deref(), Some("age__gt")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
