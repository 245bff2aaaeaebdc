//! Storage contracts implemented by the host application
//!
//! Every operation has a default body that fails with
//! [`AdapterError::NotImplemented`], so a host only writes what it needs.
//! [`Adapter::filter`] always returns a list, in the order the backend
//! yields it; orchestration preserves that order.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    DockerImage, Entity, Identifier, Lab, LabDockerImage, LabInstance, User, ValidationError,
};

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("{operation} is not implemented for {entity}")]
    NotImplemented {
        entity: &'static str,
        operation: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AdapterError {
    pub fn not_implemented<E: Entity>(operation: &'static str) -> Self {
        AdapterError::NotImplemented {
            entity: E::KIND,
            operation,
        }
    }

    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        AdapterError::Backend(Box::new(err))
    }
}

/// Attribute equality criteria, all of which must hold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    criteria: Vec<(String, Identifier)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, name: impl Into<String>, value: impl Into<Identifier>) -> Self {
        self.criteria.push((name.into(), value.into()));
        self
    }

    pub fn criteria(&self) -> &[(String, Identifier)] {
        &self.criteria
    }

    pub fn get(&self, name: &str) -> Option<&Identifier> {
        self.criteria
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// An unknown attribute never matches
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.criteria
            .iter()
            .all(|(name, value)| entity.attr(name).as_ref() == Some(value))
    }
}

#[async_trait]
pub trait Adapter<E: Entity>: Send + Sync {
    /// Store a new entity; the adapter assigns its id
    async fn create(&self, _draft: E::Draft) -> Result<E, AdapterError> {
        Err(AdapterError::not_implemented::<E>("create"))
    }

    async fn get_all(&self) -> Result<Vec<E>, AdapterError> {
        Err(AdapterError::not_implemented::<E>("get_all"))
    }

    async fn get(&self, _id: &Identifier) -> Result<Option<E>, AdapterError> {
        Err(AdapterError::not_implemented::<E>("get"))
    }

    async fn get_by_attr(
        &self,
        _name: &str,
        _value: &Identifier,
    ) -> Result<Option<E>, AdapterError> {
        Err(AdapterError::not_implemented::<E>("get_by_attr"))
    }

    async fn delete(&self, _id: &Identifier) -> Result<(), AdapterError> {
        Err(AdapterError::not_implemented::<E>("delete"))
    }

    async fn save(&self, _entity: E) -> Result<E, AdapterError> {
        Err(AdapterError::not_implemented::<E>("save"))
    }

    async fn filter(&self, _filter: &Filter) -> Result<Vec<E>, AdapterError> {
        Err(AdapterError::not_implemented::<E>("filter"))
    }
}

/// Read-only access to the host's users
#[async_trait]
pub trait UserAdapter: Send + Sync {
    async fn get_all(&self) -> Result<Vec<User>, AdapterError> {
        Err(AdapterError::not_implemented::<User>("get_all"))
    }

    async fn get(&self, _id: &Identifier) -> Result<Option<User>, AdapterError> {
        Err(AdapterError::not_implemented::<User>("get"))
    }
}

pub type DockerImageAdapter = dyn Adapter<DockerImage>;
pub type LabAdapter = dyn Adapter<Lab>;
pub type LabDockerImageAdapter = dyn Adapter<LabDockerImage>;
pub type LabInstanceAdapter = dyn Adapter<LabInstance>;
