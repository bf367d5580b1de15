//! The CRUD interface shared by [`Repository`](super::Repository) and
//! [`Service`](crate::service::Service)
//!
//! Methods use RPITIT (Return Position Impl Trait In Traits) so implementations
//! are written with plain `async fn`.

use std::future::Future;

use crate::entity::{Entity, Record};
use crate::error::Result;
use crate::filters::FilterManager;
use crate::pagination::PaginationStrategy;

/// List, one-row resolution and staged mutations over one entity type
///
/// # Example
///
/// ```rust,ignore
/// use moneta::repository::{Crud, Repository};
///
/// let mut session = store.session();
/// let mut repo = Repository::<Tag, _>::new(&mut session);
/// let tag = repo.retrieve_by_id(1).await?;
/// ```
pub trait Crud<E: Entity>: Send {
    /// Entities matching the equality filters and the filter manager, paginated
    ///
    /// Application order is fixed: equality filters, filter-manager filters,
    /// filter-manager ordering, then pagination.
    fn list(
        &mut self,
        filters: Option<&FilterManager<E>>,
        pagination: Option<&mut dyn PaginationStrategy>,
        equalities: &Record,
    ) -> impl Future<Output = Result<Vec<E>>> + Send;

    /// The one entity with this identifier
    ///
    /// # Errors
    ///
    /// `NotFound` for zero rows, `MultipleResults` for more than one.
    fn retrieve_by_id(&mut self, id: i64) -> impl Future<Output = Result<E>> + Send;

    /// The one entity matching all equality filters
    ///
    /// # Errors
    ///
    /// `NotFound` for zero rows, `MultipleResults` for more than one.
    fn retrieve(&mut self, equalities: &Record) -> impl Future<Output = Result<E>> + Send;

    /// Stage a new entity built from `entity`
    fn create(&mut self, entity: Record) -> impl Future<Output = Result<E>> + Send;

    /// Stage a partial update of the entity with this identifier
    ///
    /// # Errors
    ///
    /// `IdentityMismatch` when `entity` carries a different `id`; nothing is
    /// staged in that case.
    fn update(&mut self, id: i64, entity: Record) -> impl Future<Output = Result<E>> + Send;

    /// Stage deletion of the entity with this identifier
    fn destroy(&mut self, id: i64) -> impl Future<Output = Result<()>> + Send;
}
