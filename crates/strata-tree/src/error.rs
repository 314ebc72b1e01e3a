use strata_types::ResourceName;
use thiserror::Error;

/// Errors produced by topology construction and write resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceName),

    #[error("invalid resource tree at {resource}: {reason}")]
    ResourceTreeInvalid {
        resource: ResourceName,
        reason: String,
    },

    #[error("duplicate resource name: {0}")]
    DuplicateResource(ResourceName),

    #[error("resource {child} already has parent {parent}")]
    ParentConflict {
        child: ResourceName,
        parent: ResourceName,
    },
}
