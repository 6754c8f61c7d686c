//! Generic use-case service behind every resource controller.
//!
//! # Responsibility
//! - Provide create/list/get/update/delete entry points for one entity.
//! - Parse caller filters and enforce id rules before touching storage.
//!
//! # Invariants
//! - `update` rejects a body whose id differs from the addressed id before
//!   any lookup happens.
//! - `update` never changes the stored id; it copies every other field.
//! - `create` assigns a fresh id when the caller leaves it nil.

use crate::filter::{build_filter, FilterError};
use crate::model::entity::{Entity, EntityId, ValidationError};
use crate::repo::entity_repo::{EntityRepository, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for entity use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Addressed id and body id disagree on update.
    MismatchedId {
        path_id: EntityId,
        body_id: EntityId,
    },
    NotFound {
        resource: &'static str,
        id: EntityId,
    },
    Validation(ValidationError),
    Filter(FilterError),
    Conflict {
        resource: &'static str,
        id: EntityId,
    },
    Repo(RepoError),
    /// Write succeeded but read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MismatchedId { .. } => write!(f, "Mismatched Id"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Filter(err) => write!(f, "{err}"),
            Self::Conflict { resource, id } => write!(f, "{resource} already exists: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Filter(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { resource, id } => Self::NotFound { resource, id },
            RepoError::Conflict { resource, id } => Self::Conflict { resource, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<FilterError> for ServiceError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

/// Entity service facade over a repository implementation.
pub struct EntityService<E, R> {
    repo: R,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, R: EntityRepository<E>> EntityService<E, R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    /// Persists a new entity and returns the stored record.
    pub fn create(&self, mut entity: E) -> ServiceResult<E> {
        if entity.id().is_nil() {
            entity.set_id(Uuid::new_v4());
        }

        let id = self.repo.create(&entity)?;
        debug!(
            "event=entity_create module=service status=ok resource={} id={id}",
            E::RESOURCE
        );
        self.repo
            .get(id)?
            .ok_or(ServiceError::InconsistentState("created entity not found in read-back"))
    }

    /// Lists entities matching the raw JSON `filters` value.
    pub fn list(&self, filters: Option<&str>) -> ServiceResult<Vec<E>> {
        let filter = build_filter::<E>(filters)?;
        let entities = self.repo.list(&filter)?;
        debug!(
            "event=entity_list module=service status=ok resource={} count={}",
            E::RESOURCE,
            entities.len()
        );
        Ok(entities)
    }

    pub fn get(&self, id: EntityId) -> ServiceResult<Option<E>> {
        Ok(self.repo.get(id)?)
    }

    /// Replaces every non-id field of the entity addressed by `id`.
    pub fn update(&self, id: EntityId, updated: &E) -> ServiceResult<E> {
        if updated.id() != id {
            return Err(ServiceError::MismatchedId {
                path_id: id,
                body_id: updated.id(),
            });
        }

        let mut stored = self.repo.get(id)?.ok_or(ServiceError::NotFound {
            resource: E::RESOURCE,
            id,
        })?;
        stored.copy_from(updated);
        self.repo.update(&stored)?;
        debug!(
            "event=entity_update module=service status=ok resource={} id={id}",
            E::RESOURCE
        );
        Ok(stored)
    }

    pub fn delete(&self, id: EntityId) -> ServiceResult<()> {
        self.repo.delete(id)?;
        debug!(
            "event=entity_delete module=service status=ok resource={} id={id}",
            E::RESOURCE
        );
        Ok(())
    }
}
