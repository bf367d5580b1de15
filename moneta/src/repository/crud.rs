//! Session-backed repository

use std::marker::PhantomData;

use serde_json::Value;

use crate::entity::{
    self, Entity, EntityMeta, FieldValue, Record, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::error::{Result, ValidationError};
use crate::filters::FilterManager;
use crate::pagination::PaginationStrategy;
use crate::query::{Predicate, Query};
use crate::store::{Session, StoreError};

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::Crud;

/// Generic repository for one entity type over a borrowed session
///
/// The repository never commits. Several repositories may share one session
/// in turn (via [`Repository::session`]) and the caller commits once.
pub struct Repository<'s, E, S> {
    session: &'s mut S,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity, S: Session> Repository<'s, E, S> {
    /// Bind a repository for `E` to a session
    pub fn new(session: &'s mut S) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// The underlying session
    pub fn session(&mut self) -> &mut S {
        self.session
    }

    fn meta() -> &'static EntityMeta {
        E::meta()
    }

    fn base_query(equalities: &Record) -> Result<Query> {
        let predicates = Self::meta()
            .resolve_equalities(equalities)?
            .into_iter()
            .map(|(field, value)| Predicate::eq(field, value));
        Ok(Query::select(Self::meta()).filter_all(predicates))
    }

    fn decode(operation: RepositoryOperation, record: Record) -> Result<E> {
        E::from_record(record).map_err(|err| {
            RepositoryError::store_failure(
                operation,
                format!("could not decode {} row: {}", Self::meta().name, err),
            )
            .into()
        })
    }

    /// Fetch at most two rows and enforce the one-row contract
    async fn resolve_one(
        &mut self,
        operation: RepositoryOperation,
        query: Query,
        described: String,
    ) -> Result<Record> {
        let name = Self::meta().name;
        let mut rows = self
            .session
            .fetch(&query.limit(2))
            .await
            .map_err(store_error(operation, name, described.clone()))?;

        match rows.len() {
            0 => Err(RepositoryError::not_found(name, described)
                .with_operation(operation)
                .into()),
            1 => Ok(rows.swap_remove(0)),
            n => {
                tracing::error!(
                    entity = name,
                    key = %described,
                    rows = n,
                    "One-row lookup matched several rows"
                );
                Err(RepositoryError::multiple_results(name, described)
                    .with_operation(operation)
                    .into())
            }
        }
    }

    fn id_query(id: i64) -> Result<Query> {
        let field = Self::meta().field(ID_FIELD)?;
        Ok(Query::select(Self::meta()).filter(Predicate::eq(field, FieldValue::Integer(id))))
    }

    fn check_known_fields(record: &Record) -> Result<()> {
        let meta = Self::meta();
        if let Some(unknown) = record.keys().find(|key| !meta.has_field(key)) {
            return Err(ValidationError::for_key(
                unknown.as_str(),
                format!("Unknown field {} for {}", unknown, meta.name),
            )
            .into());
        }
        Ok(())
    }

    fn stamp(record: &mut Record, field: &str) {
        if Self::meta().timestamps {
            record.insert(field.to_string(), FieldValue::DateTime(entity::now()).to_json());
        }
    }
}

fn store_error(
    operation: RepositoryOperation,
    entity: &'static str,
    key: String,
) -> impl FnOnce(StoreError) -> RepositoryError {
    move |err| RepositoryError::from_store(operation, err).with_entity(entity, key)
}

fn describe_equalities(equalities: &Record) -> String {
    equalities
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl<'s, E: Entity, S: Session> Crud<E> for Repository<'s, E, S> {
    async fn list(
        &mut self,
        filters: Option<&FilterManager<E>>,
        pagination: Option<&mut dyn PaginationStrategy>,
        equalities: &Record,
    ) -> Result<Vec<E>> {
        let mut query = Self::base_query(equalities)?;
        if let Some(manager) = filters {
            query = manager.order(manager.filter(query));
        }
        if let Some(strategy) = pagination {
            let count = self
                .session
                .count(&query)
                .await
                .map_err(store_error(
                    RepositoryOperation::Count,
                    Self::meta().name,
                    describe_equalities(equalities),
                ))?;
            query = strategy.paginate(query, count);
        }

        tracing::debug!(
            entity = Self::meta().name,
            predicates = query.predicates().len(),
            sort_keys = query.ordering().len(),
            offset = ?query.get_offset(),
            limit = ?query.get_limit(),
            "Listing entities"
        );

        let rows = self
            .session
            .fetch(&query)
            .await
            .map_err(store_error(
                RepositoryOperation::List,
                Self::meta().name,
                describe_equalities(equalities),
            ))?;
        rows.into_iter()
            .map(|row| Self::decode(RepositoryOperation::List, row))
            .collect()
    }

    async fn retrieve_by_id(&mut self, id: i64) -> Result<E> {
        let query = Self::id_query(id)?;
        let row = self
            .resolve_one(RepositoryOperation::RetrieveById, query, id.to_string())
            .await?;
        Self::decode(RepositoryOperation::RetrieveById, row)
    }

    async fn retrieve(&mut self, equalities: &Record) -> Result<E> {
        let query = Self::base_query(equalities)?;
        let row = self
            .resolve_one(RepositoryOperation::Retrieve, query, describe_equalities(equalities))
            .await?;
        Self::decode(RepositoryOperation::Retrieve, row)
    }

    async fn create(&mut self, mut entity: Record) -> Result<E> {
        let meta = Self::meta();
        Self::check_known_fields(&entity)?;
        for (key, value) in E::defaults() {
            entity.entry(key).or_insert(value);
        }
        Self::stamp(&mut entity, CREATED_AT_FIELD);
        Self::stamp(&mut entity, UPDATED_AT_FIELD);

        if let Some(missing) = meta.fields.iter().find(|field| {
            !field.nullable && !field.defaulted && entity.get(field.name).map_or(true, Value::is_null)
        }) {
            return Err(ValidationError::for_key(
                missing.name,
                format!("Field {} is required", missing.name),
            )
            .into());
        }

        let row = self
            .session
            .insert(meta, entity)
            .await
            .map_err(store_error(RepositoryOperation::Create, meta.name, "new".to_string()))?;
        let created = Self::decode(RepositoryOperation::Create, row)?;
        tracing::debug!(entity = meta.name, id = created.id(), "Staged new entity");
        Ok(created)
    }

    async fn update(&mut self, id: i64, mut entity: Record) -> Result<E> {
        let meta = Self::meta();

        if let Some(raw) = entity.remove(ID_FIELD) {
            if !raw.is_null() {
                let given = meta
                    .field(ID_FIELD)?
                    .coerce(&raw)
                    .map_err(|reason| ValidationError::invalid_value(ID_FIELD, reason))?;
                if given != FieldValue::Integer(id) {
                    return Err(RepositoryError::identity_mismatch(meta.name, id).into());
                }
            }
        }
        Self::check_known_fields(&entity)?;

        let query = Self::id_query(id)?;
        self.resolve_one(RepositoryOperation::Update, query, id.to_string())
            .await?;

        entity.remove(CREATED_AT_FIELD);
        Self::stamp(&mut entity, UPDATED_AT_FIELD);

        let row = self
            .session
            .update(meta, id, entity)
            .await
            .map_err(store_error(RepositoryOperation::Update, meta.name, id.to_string()))?;
        tracing::debug!(entity = meta.name, id, "Staged entity update");
        Self::decode(RepositoryOperation::Update, row)
    }

    async fn destroy(&mut self, id: i64) -> Result<()> {
        let meta = Self::meta();
        let query = Self::id_query(id)?;
        self.resolve_one(RepositoryOperation::Destroy, query, id.to_string())
            .await?;

        self.session
            .delete(meta, id)
            .await
            .map_err(store_error(RepositoryOperation::Destroy, meta.name, id.to_string()))?;
        tracing::debug!(entity = meta.name, id, "Staged entity deletion");
        Ok(())
    }
}
