pub mod domain;
pub mod lab_instance;
pub mod resources;

pub use domain::{
    AdapterController, DockerImageController, LabController, LabDockerImageController,
    UserController,
};
pub use lab_instance::{gen_namespace_name, LabInstanceController, RollbackPolicy};
pub use resources::{
    NamespaceController, NetworkPolicyController, VirtualMachineInstanceController,
    DEFAULT_NETWORK_POLICY_NAME,
};

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{TokenError, TokenIssuer};
use crate::database::{Adapter, AdapterError, UserAdapter};
use crate::kubernetes::{ApiRegistry, ProxyError, RegistryError};
use crate::model::{DockerImage, Identifier, Lab, LabDockerImage, LabInstance, ValidationError};
use crate::template_engine::TemplateError;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Lab {0} not found")]
    LabNotFound(Identifier),

    #[error("User {0} not found")]
    UserNotFound(Identifier),

    #[error("Docker image {0} not found")]
    DockerImageNotFound(Identifier),

    #[error("Lab instance {0} cannot be changed after creation")]
    Immutable(Identifier),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Every controller, wired to the same registry and adapters
pub struct ControllerCollection {
    pub users: UserController,
    pub docker_images: DockerImageController,
    pub labs: LabController,
    pub lab_docker_images: LabDockerImageController,
    pub lab_instances: LabInstanceController,
    pub namespaces: NamespaceController,
    pub network_policies: NetworkPolicyController,
    pub virtual_machine_instances: VirtualMachineInstanceController,
}

#[allow(clippy::too_many_arguments)]
pub fn create_controller_collection(
    registry: ApiRegistry,
    user_adapter: Arc<dyn UserAdapter>,
    docker_image_adapter: Arc<dyn Adapter<DockerImage>>,
    lab_adapter: Arc<dyn Adapter<Lab>>,
    lab_docker_image_adapter: Arc<dyn Adapter<LabDockerImage>>,
    lab_instance_adapter: Arc<dyn Adapter<LabInstance>>,
    token_issuer: Arc<dyn TokenIssuer>,
    secret_key: impl Into<String>,
) -> ControllerCollection {
    let users = UserController::new(user_adapter);
    let docker_images = DockerImageController::new(docker_image_adapter);
    let labs = LabController::new(lab_adapter);
    let lab_docker_images = LabDockerImageController::new(lab_docker_image_adapter);
    let namespaces = NamespaceController::new(registry.clone());
    let network_policies = NetworkPolicyController::new(registry.clone());
    let virtual_machine_instances =
        VirtualMachineInstanceController::new(registry, docker_images.clone());

    let lab_instances = LabInstanceController::new(
        lab_instance_adapter,
        labs.clone(),
        users.clone(),
        lab_docker_images.clone(),
        namespaces.clone(),
        network_policies.clone(),
        virtual_machine_instances.clone(),
        token_issuer,
        secret_key,
    );

    ControllerCollection {
        users,
        docker_images,
        labs,
        lab_docker_images,
        lab_instances,
        namespaces,
        network_policies,
        virtual_machine_instances,
    }
}
