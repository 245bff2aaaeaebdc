//! Validating façades over the host's adapters

use std::sync::Arc;

use super::ControllerError;
use crate::database::{Adapter, Filter, UserAdapter};
use crate::model::{
    DockerImage, Entity, Identifier, Lab, LabDockerImage, NewDockerImage, NewLab,
    NewLabDockerImage, User,
};

/// Pass-through access to one entity's adapter
pub struct AdapterController<E: Entity> {
    adapter: Arc<dyn Adapter<E>>,
}

impl<E: Entity> Clone for AdapterController<E> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
        }
    }
}

impl<E: Entity> AdapterController<E> {
    pub fn new(adapter: Arc<dyn Adapter<E>>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter<E>> {
        &self.adapter
    }

    pub async fn get_all(&self) -> Result<Vec<E>, ControllerError> {
        Ok(self.adapter.get_all().await?)
    }

    pub async fn get(&self, id: &Identifier) -> Result<Option<E>, ControllerError> {
        Ok(self.adapter.get(id).await?)
    }

    pub async fn get_by_attr(
        &self,
        name: &str,
        value: &Identifier,
    ) -> Result<Option<E>, ControllerError> {
        Ok(self.adapter.get_by_attr(name, value).await?)
    }

    pub async fn delete(&self, id: &Identifier) -> Result<(), ControllerError> {
        Ok(self.adapter.delete(id).await?)
    }

    pub async fn save(&self, entity: E) -> Result<E, ControllerError> {
        Ok(self.adapter.save(entity).await?)
    }

    pub async fn filter(&self, filter: &Filter) -> Result<Vec<E>, ControllerError> {
        Ok(self.adapter.filter(filter).await?)
    }
}

pub type DockerImageController = AdapterController<DockerImage>;
pub type LabController = AdapterController<Lab>;
pub type LabDockerImageController = AdapterController<LabDockerImage>;

impl AdapterController<DockerImage> {
    pub async fn create(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<DockerImage, ControllerError> {
        let draft = NewDockerImage::new(name, description, url)?;
        Ok(self.adapter.create(draft).await?)
    }
}

impl AdapterController<Lab> {
    pub async fn create(
        &self,
        name: impl Into<String>,
        namespace_prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Lab, ControllerError> {
        let draft = NewLab::new(name, namespace_prefix, description)?;
        Ok(self.adapter.create(draft).await?)
    }
}

impl AdapterController<LabDockerImage> {
    pub async fn create(
        &self,
        lab_id: impl Into<Identifier>,
        docker_image_id: impl Into<Identifier>,
        docker_image_name: impl Into<String>,
    ) -> Result<LabDockerImage, ControllerError> {
        let draft = NewLabDockerImage::new(lab_id, docker_image_id, docker_image_name)?;
        Ok(self.adapter.create(draft).await?)
    }

    /// VMs of a lab in the order the adapter returns them
    pub async fn of_lab(
        &self,
        lab_id: &Identifier,
    ) -> Result<Vec<LabDockerImage>, ControllerError> {
        self.filter(&Filter::new().eq("lab_id", lab_id)).await
    }
}

/// Users are owned by the host; this layer only reads them
#[derive(Clone)]
pub struct UserController {
    adapter: Arc<dyn UserAdapter>,
}

impl UserController {
    pub fn new(adapter: Arc<dyn UserAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn get_all(&self) -> Result<Vec<User>, ControllerError> {
        Ok(self.adapter.get_all().await?)
    }

    pub async fn get(&self, id: &Identifier) -> Result<Option<User>, ControllerError> {
        Ok(self.adapter.get(id).await?)
    }
}
