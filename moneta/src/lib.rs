//! # moneta
//!
//! Personal-finance bookkeeping backend built on a generic data-access core:
//! declarative filtering, two pagination strategies, a non-committing
//! repository, an auto-committing service and a single error translation
//! boundary.
//!
//! ## Features
//!
//! - **Filtering**: closed per-entity filter schemas with `field__lookup` keys
//!   (`gt`, `gte`, `lt`, `lte`, `eq`, `ieq`, `contains`, `icontains`) and
//!   multi-key ordering
//! - **Pagination**: limit/offset and page-number strategies with metadata
//! - **Persistence**: in-memory store, PostgreSQL via `sqlx` (`database` feature)
//! - **REST**: axum routers for users, accounts, categories, transactions and tags
//! - **Errors**: fixed status/code/detail taxonomy, raw diagnostics in debug mode
//!
//! ## Example
//!
//! ```rust,no_run
//! use moneta::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::new(config.clone(), MemoryStore::new());
//!     let app = build_router(state);
//!
//!     Server::new(config).serve(app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod domain;
pub mod entity;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, PaginationConfig, PaginationStyle};
    pub use crate::domain::{Account, Category, EntryKind, Tag, Transaction, User};
    pub use crate::entity::{Entity, EntityMeta, FieldDef, FieldKind, FieldValue, Record};
    pub use crate::error::{Error, ErrorTranslator, Result, ValidationError};
    pub use crate::filters::{FilterManager, FilterSchema, FilterSpec, Filterable, OrderSpec};
    pub use crate::handlers::crud_routes;
    pub use crate::health::health;
    pub use crate::ids::{MakeTypedRequestId, RequestId};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::{
        LimitOffset, PageNumber, PaginatedResult, PaginationMeta, PaginationStrategy,
    };
    pub use crate::query::{Lookup, OrderDirection, Query};
    pub use crate::repository::{Crud, Repository, RepositoryError, RepositoryErrorKind};
    pub use crate::server::{build_router, Server};
    pub use crate::service::Service;
    pub use crate::state::AppState;
    pub use crate::store::{MemoryStore, Session, Store, StoreError};

    #[cfg(feature = "database")]
    pub use crate::store::PgStore;

    pub use axum::{
        routing::{delete, get, post, put},
        Json, Router,
    };
    pub use tokio;
}
