//! Repository error types
//!
//! Structured errors for repository operations. Every failure carries the
//! operation that raised it and, where known, the entity involved.
//!
//! # Example
//!
//! ```rust
//! use moneta::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Account", "42");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

use crate::store::{StoreError, StoreErrorKind};

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Listing entities with filters and pagination
    List,
    /// Resolving one entity by identifier
    RetrieveById,
    /// Resolving one entity by equality filters
    Retrieve,
    /// Counting matches for pagination
    Count,
    /// Staging a new entity
    Create,
    /// Staging a partial update
    Update,
    /// Staging a deletion
    Destroy,
    /// Committing the session
    Commit,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::RetrieveById => write!(f, "retrieve_by_id"),
            Self::Retrieve => write!(f, "retrieve"),
            Self::Count => write!(f, "count"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// One-row resolution matched zero rows
    NotFound,
    /// One-row resolution matched more than one row
    MultipleResults,
    /// Payload identifier differs from the addressed identifier
    IdentityMismatch,
    /// Store deadline or lock wait exceeded
    Timeout,
    /// Any other store failure
    StoreFailure,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::MultipleResults => write!(f, "multiple_results"),
            Self::IdentityMismatch => write!(f, "identity_mismatch"),
            Self::Timeout => write!(f, "timeout"),
            Self::StoreFailure => write!(f, "store_failure"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use moneta::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::not_found("Tag", "7").with_operation(RepositoryOperation::Destroy);
/// assert_eq!(
///     error.to_string(),
///     "Repository not_found error during destroy: Entity not found [Tag: 7]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Account", "Tag")
    pub entity_type: Option<String>,
    /// The ID or filter description of the entity involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Message used when a payload tries to change an entity's identity
    pub const IDENTITY_MISMATCH: &'static str = "ID in the entity does not match the given ID.";

    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::RetrieveById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create a "multiple results" error with entity context
    pub fn multiple_results(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::RetrieveById,
            RepositoryErrorKind::MultipleResults,
            "Multiple rows were found when exactly one was required",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an identity mismatch error for an update
    pub fn identity_mismatch(entity_type: impl Into<String>, id: i64) -> Self {
        Self::new(
            RepositoryOperation::Update,
            RepositoryErrorKind::IdentityMismatch,
            Self::IDENTITY_MISMATCH,
        )
        .with_entity(entity_type, id.to_string())
    }

    /// Create a timeout error
    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    /// Create a generic store failure
    pub fn store_failure(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::StoreFailure, message)
    }

    /// Classify a store-level failure raised during `operation`
    pub fn from_store(operation: RepositoryOperation, err: StoreError) -> Self {
        match err.kind {
            StoreErrorKind::Timeout => Self::timeout(operation, err.to_string()),
            _ => Self::store_failure(operation, err.to_string()),
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::List), "list");
        assert_eq!(
            format!("{}", RepositoryOperation::RetrieveById),
            "retrieve_by_id"
        );
        assert_eq!(format!("{}", RepositoryOperation::Retrieve), "retrieve");
        assert_eq!(format!("{}", RepositoryOperation::Destroy), "destroy");
        assert_eq!(format!("{}", RepositoryOperation::Commit), "commit");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(format!("{}", RepositoryErrorKind::NotFound), "not_found");
        assert_eq!(
            format!("{}", RepositoryErrorKind::MultipleResults),
            "multiple_results"
        );
        assert_eq!(
            format!("{}", RepositoryErrorKind::IdentityMismatch),
            "identity_mismatch"
        );
        assert_eq!(format!("{}", RepositoryErrorKind::Timeout), "timeout");
        assert_eq!(
            format!("{}", RepositoryErrorKind::StoreFailure),
            "store_failure"
        );
    }

    #[test]
    fn test_not_found_convenience() {
        let error = RepositoryError::not_found("Tag", "12");
        assert_eq!(error.operation, RepositoryOperation::RetrieveById);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type, Some("Tag".to_string()));
        assert_eq!(error.entity_id, Some("12".to_string()));
    }

    #[test]
    fn test_identity_mismatch_message() {
        let error = RepositoryError::identity_mismatch("Account", 1);
        assert_eq!(error.kind, RepositoryErrorKind::IdentityMismatch);
        assert_eq!(error.operation, RepositoryOperation::Update);
        assert_eq!(error.message, "ID in the entity does not match the given ID.");
    }

    #[test]
    fn test_from_store_classifies_timeout() {
        let err = RepositoryError::from_store(
            RepositoryOperation::Update,
            StoreError::timeout("lock wait exceeded"),
        );
        assert_eq!(err.kind, RepositoryErrorKind::Timeout);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert!(err.message.contains("lock wait exceeded"));
    }

    #[test]
    fn test_from_store_classifies_everything_else() {
        for store_err in [
            StoreError::integrity("duplicate key"),
            StoreError::connection("refused"),
            StoreError::query("syntax"),
            StoreError::decode("bad json"),
        ] {
            let err = RepositoryError::from_store(RepositoryOperation::Create, store_err);
            assert_eq!(err.kind, RepositoryErrorKind::StoreFailure);
        }
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::store_failure(RepositoryOperation::Commit, "broken pipe");
        let display = error.to_string();
        assert!(display.contains("store_failure"));
        assert!(display.contains("commit"));
        assert!(!display.contains('['));
    }

    #[test]
    fn test_display_with_entity() {
        let display = RepositoryError::multiple_results("Tag", "name=food").to_string();
        assert!(display.contains("multiple_results"));
        assert!(display.contains("[Tag: name=food]"));
    }

    #[test]
    fn test_error_is_error_trait() {
        let error: Box<dyn std::error::Error> = Box::new(RepositoryError::not_found("Tag", "1"));
        assert!(error.to_string().contains("not_found"));
    }
}
