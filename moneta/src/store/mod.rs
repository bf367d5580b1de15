//! Persistence backends
//!
//! A [`Store`] hands out [`Session`]s. A session is one unit of work: reads see
//! the session's own staged writes, and nothing is visible to other sessions
//! until [`Session::commit`]. Dropping a session without committing discards
//! its staged work.
//!
//! Backends:
//! - [`MemoryStore`]: always available, used by tests and local runs
//! - `PgStore`: PostgreSQL via `sqlx` (requires the `database` feature)

use std::fmt;
use std::future::Future;

use crate::entity::{EntityMeta, Record};
use crate::query::Query;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::{PgSession, PgStore};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Category of store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Deadline or lock wait exceeded
    Timeout,
    /// Constraint violation (unique, not null, foreign key, check)
    Integrity,
    /// Could not reach the store
    Connection,
    /// The store rejected the statement
    Query,
    /// A stored row could not be decoded
    Decode,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Integrity => write!(f, "integrity"),
            Self::Connection => write!(f, "connection"),
            Self::Query => write!(f, "query"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// Failure reported by a store backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The category of error
    pub kind: StoreErrorKind,
    /// Backend diagnostic
    pub message: String,
}

impl StoreError {
    /// Create a new store error
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Deadline or lock wait exceeded
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Timeout, message)
    }

    /// Constraint violation
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Integrity, message)
    }

    /// Store unreachable
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connection, message)
    }

    /// Statement rejected
    pub fn query(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Query, message)
    }

    /// Undecodable row
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Decode, message)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store {} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for StoreError {}

/// One transaction against a store
///
/// Uses RPITIT so implementations can be written with plain `async fn`.
pub trait Session: Send {
    /// Rows matching the query, ordered and sliced
    fn fetch(&mut self, query: &Query) -> impl Future<Output = StoreResult<Vec<Record>>> + Send;

    /// Number of rows matching the query's predicates
    ///
    /// Ordering and slicing are ignored.
    fn count(&mut self, query: &Query) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Stage a new row, returning it with store-assigned values filled in
    fn insert(
        &mut self,
        meta: &'static EntityMeta,
        record: Record,
    ) -> impl Future<Output = StoreResult<Record>> + Send;

    /// Stage changes to the row with this id, returning the updated row
    fn update(
        &mut self,
        meta: &'static EntityMeta,
        id: i64,
        changes: Record,
    ) -> impl Future<Output = StoreResult<Record>> + Send;

    /// Stage deletion of the row with this id
    fn delete(
        &mut self,
        meta: &'static EntityMeta,
        id: i64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Make staged work visible and durable
    fn commit(&mut self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Discard staged work
    fn rollback(&mut self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Session factory shared across requests
pub trait Store: Clone + Send + Sync + 'static {
    /// Session type handed out by this store
    type Session: Session + 'static;

    /// Open a new session
    ///
    /// Backends acquire connections lazily, so opening a session never fails.
    fn session(&self) -> Self::Session;
}
