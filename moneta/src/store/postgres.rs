//! PostgreSQL store backend
//!
//! Each [`PgSession`] owns at most one transaction, begun on first use. Rows
//! travel as `jsonb` in both directions: selects return `to_jsonb(t)` and
//! writes go through `jsonb_populate_record`, so column types (including
//! enum columns) are converted by PostgreSQL itself.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{Session, Store, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::database::create_pool;
use crate::entity::{EntityMeta, FieldDef, FieldKind, FieldValue, Record, ID_FIELD};
use crate::query::{Lookup, OrderDirection, Predicate, Query};

/// Pooled PostgreSQL store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    statement_timeout: Option<Duration>,
}

impl PgStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// Connect using the database configuration, retrying per its settings
    pub async fn connect(config: &DatabaseConfig) -> crate::error::Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self {
            pool,
            statement_timeout: config.statement_timeout(),
        })
    }

    /// Cancel statements running longer than `timeout` in every session
    #[must_use]
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    type Session = PgSession;

    fn session(&self) -> PgSession {
        PgSession {
            pool: self.pool.clone(),
            statement_timeout: self.statement_timeout,
            tx: None,
        }
    }
}

/// A unit of work against a [`PgStore`]
///
/// Dropping the session rolls back an open transaction.
pub struct PgSession {
    pool: PgPool,
    statement_timeout: Option<Duration>,
    tx: Option<Transaction<'static, Postgres>>,
}

impl fmt::Debug for PgSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSession")
            .field("statement_timeout", &self.statement_timeout)
            .field("in_transaction", &self.tx.is_some())
            .finish()
    }
}

impl PgSession {
    async fn transaction(&mut self) -> StoreResult<&mut Transaction<'static, Postgres>> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
                if let Some(timeout) = self.statement_timeout {
                    sqlx::query(&format!(
                        "SET LOCAL statement_timeout = {}",
                        timeout.as_millis()
                    ))
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                }
                tx
            }
        };
        Ok(self.tx.insert(tx))
    }
}

impl Session for PgSession {
    async fn fetch(&mut self, query: &Query) -> StoreResult<Vec<Record>> {
        let mut builder = select_sql(query);
        let tx = self.transaction().await?;
        let rows = builder
            .build_query_scalar::<Value>()
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(into_record).collect()
    }

    async fn count(&mut self, query: &Query) -> StoreResult<u64> {
        let mut builder = count_sql(query);
        let tx = self.transaction().await?;
        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert(&mut self, meta: &'static EntityMeta, record: Record) -> StoreResult<Record> {
        let mut builder = insert_sql(meta, record)?;
        let tx = self.transaction().await?;
        let row = builder
            .build_query_scalar::<Value>()
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        into_record(row)
    }

    async fn update(
        &mut self,
        meta: &'static EntityMeta,
        id: i64,
        changes: Record,
    ) -> StoreResult<Record> {
        let mut builder = update_sql(meta, id, changes)?;
        let tx = self.transaction().await?;
        let row = builder
            .build_query_scalar::<Value>()
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        match row {
            Some(row) => into_record(row),
            None => Err(StoreError::query(format!(
                "no row in \"{}\" with id {}",
                meta.table, id
            ))),
        }
    }

    async fn delete(&mut self, meta: &'static EntityMeta, id: i64) -> StoreResult<()> {
        let mut builder = delete_sql(meta, id);
        let tx = self.transaction().await?;
        builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(map_sqlx_error)?;
            tracing::debug!("PostgreSQL session committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            tracing::debug!("PostgreSQL session rolled back");
        }
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn into_record(row: Value) -> StoreResult<Record> {
    match row {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::decode(format!(
            "expected a row object, got {}",
            other
        ))),
    }
}

fn select_sql(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT to_jsonb(t) FROM {} AS t",
        quote_ident(query.meta().table)
    ));
    push_where(&mut builder, query.predicates());

    for (i, key) in query.ordering().iter().enumerate() {
        builder.push(if i == 0 { " ORDER BY " } else { ", " });
        builder.push(format!("t.{}", quote_ident(key.field.name)));
        builder.push(match key.direction {
            OrderDirection::Ascending => " ASC",
            OrderDirection::Descending => " DESC",
        });
    }

    if let Some(offset) = query.get_offset() {
        builder.push(" OFFSET ");
        builder.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
    }
    if let Some(limit) = query.get_limit() {
        builder.push(" LIMIT ");
        builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    builder
}

fn count_sql(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT COUNT(*) FROM {} AS t",
        quote_ident(query.meta().table)
    ));
    push_where(&mut builder, query.predicates());
    builder
}

fn writable_columns(meta: &'static EntityMeta, record: &Record) -> StoreResult<Vec<String>> {
    record
        .keys()
        .map(|key| {
            if meta.has_field(key) {
                Ok(quote_ident(key))
            } else {
                Err(StoreError::query(format!(
                    "column \"{}\" of relation \"{}\" does not exist",
                    key, meta.table
                )))
            }
        })
        .collect()
}

fn insert_sql(
    meta: &'static EntityMeta,
    record: Record,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table = quote_ident(meta.table);
    if record.is_empty() {
        return Ok(QueryBuilder::new(format!(
            "INSERT INTO {table} AS t DEFAULT VALUES RETURNING to_jsonb(t)"
        )));
    }

    let columns = writable_columns(meta, &record)?.join(", ");
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {table} AS t ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{table}, "
    ));
    builder.push_bind(Value::Object(record));
    builder.push(") RETURNING to_jsonb(t)");
    Ok(builder)
}

fn update_sql(
    meta: &'static EntityMeta,
    id: i64,
    changes: Record,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table = quote_ident(meta.table);
    let id_column = quote_ident(ID_FIELD);
    if changes.is_empty() {
        let mut builder = QueryBuilder::new(format!(
            "SELECT to_jsonb(t) FROM {table} AS t WHERE t.{id_column} = "
        ));
        builder.push_bind(id);
        return Ok(builder);
    }

    let columns = writable_columns(meta, &changes)?.join(", ");
    let mut builder = QueryBuilder::new(format!(
        "UPDATE {table} AS t SET ({columns}) = (SELECT {columns} FROM jsonb_populate_record(NULL::{table}, "
    ));
    builder.push_bind(Value::Object(changes));
    builder.push(format!(")) WHERE t.{id_column} = "));
    builder.push_bind(id);
    builder.push(" RETURNING to_jsonb(t)");
    Ok(builder)
}

fn delete_sql(meta: &'static EntityMeta, id: i64) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "DELETE FROM {} AS t WHERE t.{} = ",
        quote_ident(meta.table),
        quote_ident(ID_FIELD)
    ));
    builder.push_bind(id);
    builder
}

fn push_where(builder: &mut QueryBuilder<'static, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(builder, predicate);
    }
}

/// Column reference, cast to text for enum columns so text parameters compare
fn column_ref(field: &FieldDef) -> String {
    match field.kind {
        FieldKind::Choice(_) => format!("t.{}::text", quote_ident(field.name)),
        _ => format!("t.{}", quote_ident(field.name)),
    }
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
    let column = column_ref(predicate.field);
    match (predicate.lookup, &predicate.value) {
        (Lookup::Eq, FieldValue::Null) => {
            builder.push(format!("{column} IS NULL"));
        }
        (Lookup::IEq, value) => {
            builder.push(format!("LOWER(t.{}::text) = LOWER(", quote_ident(predicate.field.name)));
            builder.push_bind(value.to_string());
            builder.push(")");
        }
        (Lookup::Contains, value) => {
            builder.push(format!("t.{}::text LIKE ", quote_ident(predicate.field.name)));
            builder.push_bind(like_pattern(&value.to_string()));
            builder.push(" ESCAPE '\\'");
        }
        (Lookup::IContains, value) => {
            builder.push(format!("t.{}::text ILIKE ", quote_ident(predicate.field.name)));
            builder.push_bind(like_pattern(&value.to_string()));
            builder.push(" ESCAPE '\\'");
        }
        (lookup, value) => {
            let operator = match lookup {
                Lookup::Gt => ">",
                Lookup::Gte => ">=",
                Lookup::Lt => "<",
                Lookup::Lte => "<=",
                _ => "=",
            };
            builder.push(format!("{column} {operator} "));
            push_value(builder, value);
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Null => {
            builder.push("NULL");
        }
        FieldValue::Bool(b) => {
            builder.push_bind(*b);
        }
        FieldValue::Integer(n) => {
            builder.push_bind(*n);
        }
        FieldValue::Float(f) => {
            builder.push_bind(*f);
        }
        FieldValue::Text(s) => {
            builder.push_bind(s.clone());
        }
        FieldValue::Date(d) => {
            builder.push_bind(*d);
        }
        FieldValue::DateTime(dt) => {
            builder.push_bind(*dt);
        }
    }
}

/// Substring pattern with LIKE metacharacters escaped
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Classify a driver error
///
/// Lock and statement timeouts (`55P03`, `57014`) and pool acquisition
/// timeouts map to [`StoreErrorKind::Timeout`](super::StoreErrorKind::Timeout).
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut => StoreError::timeout(err.to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("57014") | Some("55P03") => StoreError::timeout(db.message()),
            Some(code) if code.starts_with("23") => StoreError::integrity(db.message()),
            _ => StoreError::query(db.message()),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::connection(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::decode(err.to_string())
        }
        _ => StoreError::query(err.to_string()),
    }
}
