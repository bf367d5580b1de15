//! In-memory store backend
//!
//! Tables live behind a shared `tokio::sync::RwLock`. A session reads from a
//! private snapshot taken on first use and records its writes as a change log.
//! Commit replays the log against the current shared state under the write
//! lock, re-checking constraints, and publishes the result atomically.
//!
//! Identifiers come from per-table sequences shared by every session, so
//! concurrent inserts never hand out the same id. Like a `BIGSERIAL`, a value
//! drawn by a session that later rolls back is not reused.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Session, Store, StoreError, StoreResult};
use crate::entity::{EntityMeta, FieldDef, FieldKind, FieldValue, Record, ID_FIELD};
use crate::query::{Lookup, OrderDirection, Predicate, Query, SortKey};

type Tables = HashMap<&'static str, Vec<Record>>;

/// Shared in-memory tables
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use moneta::store::{MemoryStore, Store};
///
/// let store = MemoryStore::new().with_lock_timeout(Duration::from_secs(2));
/// let session = store.session();
/// # drop(session);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Mutex<HashMap<&'static str, i64>>>,
    lock_timeout: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store with no lock-wait deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a timeout when the table lock cannot be taken in time
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Insert raw fixture rows, bypassing every constraint
    ///
    /// The table's id sequence moves past the highest seeded id.
    pub async fn seed(&self, meta: &'static EntityMeta, rows: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write().await;
        let table = tables.entry(meta.table).or_default();
        table.extend(rows);
        if let Some(max) = table.iter().filter_map(row_id).max() {
            self.advance_sequence(meta.table, max);
        }
    }

    /// Committed rows of a table
    pub async fn rows(&self, meta: &'static EntityMeta) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables.get(meta.table).cloned().unwrap_or_default()
    }

    /// Draw the next id of a table's sequence
    fn next_id(&self, table: &'static str) -> i64 {
        let mut sequences = self.sequences.lock().unwrap_or_else(PoisonError::into_inner);
        let current = sequences.entry(table).or_insert(0);
        *current += 1;
        *current
    }

    /// Make sure the sequence never draws `id` or anything below it
    fn advance_sequence(&self, table: &'static str, id: i64) {
        let mut sequences = self.sequences.lock().unwrap_or_else(PoisonError::into_inner);
        let current = sequences.entry(table).or_insert(0);
        *current = (*current).max(id);
    }

    /// Hold the table lock so every other access waits
    #[cfg(test)]
    pub(crate) async fn hold_lock(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }

    async fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        match self.lock_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.tables.read())
                .await
                .map_err(|_| {
                    StoreError::timeout(format!("could not obtain read lock within {:?}", deadline))
                }),
            None => Ok(self.tables.read().await),
        }
    }

    async fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        match self.lock_timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.tables.write())
                .await
                .map_err(|_| {
                    StoreError::timeout(format!("could not obtain write lock within {:?}", deadline))
                }),
            None => Ok(self.tables.write().await),
        }
    }
}

impl Store for MemoryStore {
    type Session = MemorySession;

    fn session(&self) -> MemorySession {
        MemorySession {
            store: self.clone(),
            working: None,
            changes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
enum Change {
    Insert {
        meta: &'static EntityMeta,
        record: Record,
    },
    Update {
        meta: &'static EntityMeta,
        id: i64,
        changes: Record,
    },
    Delete {
        meta: &'static EntityMeta,
        id: i64,
    },
}

/// A unit of work against a [`MemoryStore`]
#[derive(Debug)]
pub struct MemorySession {
    store: MemoryStore,
    working: Option<Tables>,
    changes: Vec<Change>,
}

impl MemorySession {
    async fn tables(&mut self) -> StoreResult<&mut Tables> {
        let tables = match self.working.take() {
            Some(tables) => tables,
            None => self.store.read().await?.clone(),
        };
        Ok(self.working.insert(tables))
    }

    fn reset(&mut self) {
        self.working = None;
        self.changes.clear();
    }
}

impl Session for MemorySession {
    async fn fetch(&mut self, query: &Query) -> StoreResult<Vec<Record>> {
        let tables = self.tables().await?;
        let mut rows: Vec<Record> = matching(tables, query).cloned().collect();

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, query.ordering()));
        }

        let offset = query.get_offset().unwrap_or(0);
        let rows = rows.into_iter().skip(usize::try_from(offset).unwrap_or(usize::MAX));
        Ok(match query.get_limit() {
            Some(limit) => rows
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => rows.collect(),
        })
    }

    async fn count(&mut self, query: &Query) -> StoreResult<u64> {
        let tables = self.tables().await?;
        Ok(matching(tables, query).count() as u64)
    }

    async fn insert(&mut self, meta: &'static EntityMeta, mut record: Record) -> StoreResult<Record> {
        match record.get(ID_FIELD).filter(|v| !v.is_null()) {
            Some(explicit) => {
                if let Ok(FieldValue::Integer(id)) = FieldValue::coerce(FieldKind::Integer, explicit) {
                    self.store.advance_sequence(meta.table, id);
                }
            }
            None => {
                let id = self.store.next_id(meta.table);
                record.insert(ID_FIELD.to_string(), Value::from(id));
            }
        }

        let tables = self.tables().await?;
        let stored = apply_insert(tables, meta, record)?;
        self.changes.push(Change::Insert {
            meta,
            record: stored.clone(),
        });
        Ok(stored)
    }

    async fn update(
        &mut self,
        meta: &'static EntityMeta,
        id: i64,
        changes: Record,
    ) -> StoreResult<Record> {
        let tables = self.tables().await?;
        let stored = apply_update(tables, meta, id, changes.clone())?;
        self.changes.push(Change::Update { meta, id, changes });
        Ok(stored)
    }

    async fn delete(&mut self, meta: &'static EntityMeta, id: i64) -> StoreResult<()> {
        let tables = self.tables().await?;
        apply_delete(tables, meta, id);
        self.changes.push(Change::Delete { meta, id });
        Ok(())
    }

    async fn commit(&mut self) -> StoreResult<()> {
        if self.changes.is_empty() {
            self.reset();
            return Ok(());
        }

        let mut guard = self.store.write().await?;
        let mut next = guard.clone();
        for change in &self.changes {
            match change {
                Change::Insert { meta, record } => {
                    apply_insert(&mut next, *meta, record.clone())?;
                }
                Change::Update { meta, id, changes } => {
                    apply_update(&mut next, *meta, *id, changes.clone())?;
                }
                Change::Delete { meta, id } => apply_delete(&mut next, *meta, *id),
            }
        }
        *guard = next;
        drop(guard);

        tracing::debug!(changes = self.changes.len(), "Memory session committed");
        self.reset();
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        if !self.changes.is_empty() {
            tracing::debug!(changes = self.changes.len(), "Memory session rolled back");
        }
        self.reset();
        Ok(())
    }
}

fn matching<'a>(tables: &'a Tables, query: &'a Query) -> impl Iterator<Item = &'a Record> + 'a {
    tables
        .get(query.meta().table)
        .into_iter()
        .flatten()
        .filter(move |row| query.predicates().iter().all(|p| evaluate(row, p)))
}

fn stored_value(row: &Record, field: &FieldDef) -> FieldValue {
    row.get(field.name)
        .and_then(|raw| field.coerce(raw).ok())
        .unwrap_or(FieldValue::Null)
}

fn evaluate(row: &Record, predicate: &Predicate) -> bool {
    let left = stored_value(row, predicate.field);
    let right = &predicate.value;

    match predicate.lookup {
        Lookup::Eq if right.is_null() => left.is_null(),
        Lookup::Eq => left.compare(right) == Some(Ordering::Equal),
        Lookup::Gt => left.compare(right) == Some(Ordering::Greater),
        Lookup::Gte => matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Lookup::Lt => left.compare(right) == Some(Ordering::Less),
        Lookup::Lte => matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal)),
        Lookup::IEq => match (left.as_text(), right.as_text()) {
            (Some(l), Some(r)) => l.to_lowercase() == r.to_lowercase(),
            _ => false,
        },
        Lookup::Contains => match (left.as_text(), right.as_text()) {
            (Some(l), Some(r)) => l.contains(r),
            _ => false,
        },
        Lookup::IContains => match (left.as_text(), right.as_text()) {
            (Some(l), Some(r)) => l.to_lowercase().contains(&r.to_lowercase()),
            _ => false,
        },
    }
}

/// Row comparison matching PostgreSQL defaults: NULLs sort last ascending
/// and first descending.
fn compare_rows(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = stored_value(a, key.field);
        let right = stored_value(b, key.field);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => left.compare(&right).unwrap_or(Ordering::Equal),
        };
        let ordering = match key.direction {
            OrderDirection::Ascending => ordering,
            OrderDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn row_id(row: &Record) -> Option<i64> {
    row.get(ID_FIELD).and_then(Value::as_i64)
}

/// Validate and normalise every column of a full row
fn check_row(
    tables: &Tables,
    meta: &'static EntityMeta,
    row: &mut Record,
    skip_id: Option<i64>,
) -> StoreResult<()> {
    if let Some(unknown) = row.keys().find(|k| !meta.has_field(k)) {
        return Err(StoreError::query(format!(
            "column \"{}\" of relation \"{}\" does not exist",
            unknown, meta.table
        )));
    }

    for field in meta.fields {
        let value = match row.get(field.name) {
            Some(raw) => field.coerce(raw).map_err(|reason| {
                StoreError::query(format!(
                    "invalid input for column \"{}\": {}",
                    field.name, reason
                ))
            })?,
            None => FieldValue::Null,
        };

        if value.is_null() {
            if !field.nullable {
                return Err(StoreError::integrity(format!(
                    "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                    field.name, meta.table
                )));
            }
            row.insert(field.name.to_string(), Value::Null);
            continue;
        }

        if let (FieldKind::Choice(allowed), Some(text)) = (field.kind, value.as_text()) {
            if !allowed.contains(&text) {
                return Err(StoreError::integrity(format!(
                    "invalid input value for enum {}: \"{}\"",
                    field.name, text
                )));
            }
        }

        if let (Some(target), FieldValue::Integer(key)) = (field.references, &value) {
            let exists = tables
                .get(target)
                .into_iter()
                .flatten()
                .any(|other| row_id(other) == Some(*key));
            if !exists {
                return Err(StoreError::integrity(format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\": ({})=({}) is not present in table \"{}\"",
                    meta.table, meta.table, field.name, field.name, key, target
                )));
            }
        }

        if field.unique {
            let clash = tables
                .get(meta.table)
                .into_iter()
                .flatten()
                .filter(|other| skip_id.is_none() || row_id(other) != skip_id)
                .any(|other| stored_value(other, field).compare(&value) == Some(Ordering::Equal));
            if clash {
                return Err(StoreError::integrity(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\": ({})=({})",
                    meta.table, field.name, field.name, value
                )));
            }
        }

        row.insert(field.name.to_string(), value.to_json());
    }
    Ok(())
}

fn apply_insert(
    tables: &mut Tables,
    meta: &'static EntityMeta,
    mut record: Record,
) -> StoreResult<Record> {
    check_row(tables, meta, &mut record, None)?;
    tables.entry(meta.table).or_default().push(record.clone());
    Ok(record)
}

fn apply_update(
    tables: &mut Tables,
    meta: &'static EntityMeta,
    id: i64,
    changes: Record,
) -> StoreResult<Record> {
    let position = tables
        .get(meta.table)
        .and_then(|rows| rows.iter().position(|row| row_id(row) == Some(id)))
        .ok_or_else(|| {
            StoreError::query(format!("no row in \"{}\" with id {}", meta.table, id))
        })?;

    let mut row = tables
        .get(meta.table)
        .and_then(|rows| rows.get(position))
        .cloned()
        .unwrap_or_default();
    row.extend(changes);
    check_row(tables, meta, &mut row, Some(id))?;

    if let Some(slot) = tables.get_mut(meta.table).and_then(|rows| rows.get_mut(position)) {
        *slot = row.clone();
    }
    Ok(row)
}

fn apply_delete(tables: &mut Tables, meta: &'static EntityMeta, id: i64) {
    if let Some(rows) = tables.get_mut(meta.table) {
        rows.retain(|row| row_id(row) != Some(id));
    }
}
