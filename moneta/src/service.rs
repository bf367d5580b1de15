//! Service layer: repository operations with a commit after each mutation
//!
//! Reads pass straight through. `create`, `update` and `destroy` call the
//! repository and then commit the session. Errors are propagated unchanged;
//! staged work from a failed call is discarded when the session is dropped.
//!
//! To make several mutations atomic, use [`Repository`] directly on one
//! session and commit once.

use crate::entity::{Entity, Record};
use crate::error::Result;
use crate::filters::FilterManager;
use crate::pagination::PaginationStrategy;
use crate::repository::{Crud, Repository, RepositoryError, RepositoryOperation};
use crate::store::Session;

/// Auto-committing facade over a [`Repository`]
pub struct Service<'s, E, S> {
    repository: Repository<'s, E, S>,
}

impl<'s, E: Entity, S: Session> Service<'s, E, S> {
    /// Bind a service for `E` to a session
    pub fn new(session: &'s mut S) -> Self {
        Self {
            repository: Repository::new(session),
        }
    }

    /// The wrapped repository
    pub fn repository(&mut self) -> &mut Repository<'s, E, S> {
        &mut self.repository
    }

    async fn commit(&mut self, operation: RepositoryOperation) -> Result<()> {
        let entity = E::meta().name;
        self.repository.session().commit().await.map_err(|err| {
            RepositoryError::from_store(RepositoryOperation::Commit, err)
                .with_entity(entity, operation.to_string())
        })?;
        tracing::info!(entity, %operation, "Committed");
        Ok(())
    }
}

impl<'s, E: Entity, S: Session> Crud<E> for Service<'s, E, S> {
    async fn list(
        &mut self,
        filters: Option<&FilterManager<E>>,
        pagination: Option<&mut dyn PaginationStrategy>,
        equalities: &Record,
    ) -> Result<Vec<E>> {
        self.repository.list(filters, pagination, equalities).await
    }

    async fn retrieve_by_id(&mut self, id: i64) -> Result<E> {
        self.repository.retrieve_by_id(id).await
    }

    async fn retrieve(&mut self, equalities: &Record) -> Result<E> {
        self.repository.retrieve(equalities).await
    }

    async fn create(&mut self, entity: Record) -> Result<E> {
        let created = self.repository.create(entity).await?;
        self.commit(RepositoryOperation::Create).await?;
        Ok(created)
    }

    async fn update(&mut self, id: i64, entity: Record) -> Result<E> {
        let updated = self.repository.update(id, entity).await?;
        self.commit(RepositoryOperation::Update).await?;
        Ok(updated)
    }

    async fn destroy(&mut self, id: i64) -> Result<()> {
        self.repository.destroy(id).await?;
        self.commit(RepositoryOperation::Destroy).await
    }
}
