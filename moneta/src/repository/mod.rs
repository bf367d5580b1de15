//! Generic data access over one entity type
//!
//! [`Repository`] implements the five CRUD operations of [`Crud`] against a
//! borrowed store [`Session`](crate::store::Session). It stages writes but
//! never commits; committing is the job of the caller or of
//! [`Service`](crate::service::Service).
//!
//! # Features
//!
//! - **List**: equality filters, [`FilterManager`](crate::filters::FilterManager)
//!   filters and ordering, then a [`PaginationStrategy`](crate::pagination::PaginationStrategy)
//! - **One-row contract**: `retrieve_by_id` and `retrieve` fail distinctly for
//!   zero rows ([`RepositoryErrorKind::NotFound`]) and several rows
//!   ([`RepositoryErrorKind::MultipleResults`])
//! - **Identity guard**: `update` refuses a payload whose `id` differs from the
//!   addressed one
//!
//! # Example
//!
//! ```rust
//! use moneta::domain::Tag;
//! use moneta::repository::{Crud, Repository};
//! use moneta::store::{MemoryStore, Session, Store};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! let mut session = store.session();
//!
//! let mut tags = Repository::<Tag, _>::new(&mut session);
//! let payload = json!({"name": "groceries"});
//! let tag = tags.create(payload.as_object().cloned().unwrap()).await.unwrap();
//! assert_eq!(tags.retrieve_by_id(tag.id).await.unwrap().name, "groceries");
//!
//! session.commit().await.unwrap();
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod crud;
mod error;
mod traits;

pub use crud::Repository;
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use traits::Crud;
