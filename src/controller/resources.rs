//! Controllers for single cluster resource kinds
//!
//! Each one renders its manifest from a built-in template and sends it through
//! the binding registered under its kind's name. Responses are returned as the
//! raw body text.

use std::sync::Arc;

use serde_yaml::Value;
use tracing::debug;

use super::domain::{DockerImageController, LabController};
use super::lab_instance::gen_namespace_name;
use super::ControllerError;
use crate::kubernetes::{
    ApiRegistry, ClusterScopedApi, ClusterScopedBinding, NamespaceApi, NamespacedApi,
    NamespacedBinding, NetworkPolicyApi, VirtualMachineInstanceApi,
};
use crate::model::{Entity, LabDockerImage, LabInstance};
use crate::template_engine::{Template, TemplateData, TemplateEngine};

/// Intra-namespace traffic only; anything from outside is denied by omission
pub const DEFAULT_NETWORK_POLICY_NAME: &str = "allow-same-namespace";

pub const VMI_CORES: u32 = 3;
pub const VMI_MEMORY: &str = "3G";

fn template_data<const N: usize>(pairs: [(&str, Value); N]) -> TemplateData {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

// ============================================================================
// Namespace
// ============================================================================

#[derive(Clone)]
pub struct NamespaceController {
    registry: ApiRegistry,
    engine: TemplateEngine,
}

impl NamespaceController {
    pub fn new(registry: ApiRegistry) -> Self {
        Self {
            registry,
            engine: TemplateEngine::new(),
        }
    }

    fn api(&self) -> Result<Arc<dyn ClusterScopedApi>, ControllerError> {
        Ok(self.registry.cluster_scoped(NamespaceApi::NAME)?)
    }

    pub async fn create(&self, namespace: &str) -> Result<String, ControllerError> {
        let data = template_data([("namespace", Value::from(namespace))]);
        let manifest = self
            .engine
            .replace_template(Template::Namespace, &data, true)?;
        debug!("Creating namespace {}", namespace);
        Ok(self.api()?.create(&manifest).await?)
    }

    pub async fn get(&self, namespace: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.get(namespace).await?)
    }

    pub async fn get_list(&self) -> Result<String, ControllerError> {
        Ok(self.api()?.get_list().await?)
    }

    /// Deleting a namespace also removes everything inside it
    pub async fn delete(&self, namespace: &str) -> Result<String, ControllerError> {
        debug!("Deleting namespace {}", namespace);
        Ok(self.api()?.delete(namespace).await?)
    }
}

// ============================================================================
// Network policy
// ============================================================================

#[derive(Clone)]
pub struct NetworkPolicyController {
    registry: ApiRegistry,
    engine: TemplateEngine,
}

impl NetworkPolicyController {
    pub fn new(registry: ApiRegistry) -> Self {
        Self {
            registry,
            engine: TemplateEngine::new(),
        }
    }

    fn api(&self) -> Result<Arc<dyn NamespacedApi>, ControllerError> {
        Ok(self.registry.namespaced(NetworkPolicyApi::NAME)?)
    }

    /// Create the default policy of a lab namespace
    pub async fn create(&self, namespace: &str) -> Result<String, ControllerError> {
        let data = template_data([
            ("namespace", Value::from(namespace)),
            (
                "network_policy_name",
                Value::from(DEFAULT_NETWORK_POLICY_NAME),
            ),
        ]);
        let manifest = self
            .engine
            .replace_template(Template::NetworkPolicy, &data, true)?;
        debug!(
            "Creating network policy {} in {}",
            DEFAULT_NETWORK_POLICY_NAME, namespace
        );
        Ok(self.api()?.create(namespace, &manifest).await?)
    }

    pub async fn get_list(&self, namespace: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.get_list(namespace).await?)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.get(namespace, name).await?)
    }

    pub async fn delete(&self, namespace: &str, name: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.delete(namespace, name).await?)
    }
}

// ============================================================================
// Virtual machine instance
// ============================================================================

#[derive(Clone)]
pub struct VirtualMachineInstanceController {
    registry: ApiRegistry,
    engine: TemplateEngine,
    docker_images: DockerImageController,
}

impl VirtualMachineInstanceController {
    pub fn new(registry: ApiRegistry, docker_images: DockerImageController) -> Self {
        Self {
            registry,
            engine: TemplateEngine::new(),
            docker_images,
        }
    }

    fn api(&self) -> Result<Arc<dyn NamespacedApi>, ControllerError> {
        Ok(self.registry.namespaced(VirtualMachineInstanceApi::NAME)?)
    }

    /// Boot the VM described by `lab_docker_image`, named after its docker image name
    pub async fn create(
        &self,
        namespace: &str,
        lab_docker_image: &LabDockerImage,
    ) -> Result<String, ControllerError> {
        let image_id = lab_docker_image.docker_image_id();
        let image = self
            .docker_images
            .get(image_id)
            .await?
            .ok_or_else(|| ControllerError::DockerImageNotFound(image_id.clone()))?;

        let vmi_name = lab_docker_image.docker_image_name();
        let data = template_data([
            ("cores", Value::from(VMI_CORES)),
            ("memory", Value::from(VMI_MEMORY)),
            ("vm_image", Value::from(image.url())),
            ("vmi_name", Value::from(vmi_name)),
            ("namespace", Value::from(namespace)),
        ]);
        let manifest = self
            .engine
            .replace_template(Template::VirtualMachineInstance, &data, true)?;
        debug!(
            "Creating VM instance {} from {} in {}",
            vmi_name,
            image.url(),
            namespace
        );
        Ok(self.api()?.create(namespace, &manifest).await?)
    }

    pub async fn get_list(&self, namespace: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.get_list(namespace).await?)
    }

    pub async fn get(&self, namespace: &str, name: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.get(namespace, name).await?)
    }

    pub async fn delete(&self, namespace: &str, name: &str) -> Result<String, ControllerError> {
        Ok(self.api()?.delete(namespace, name).await?)
    }

    /// All VM instances in the namespace of `instance`
    pub async fn get_list_of_lab_instance(
        &self,
        instance: &LabInstance,
        labs: &LabController,
    ) -> Result<String, ControllerError> {
        let namespace = instance_namespace(instance, labs).await?;
        self.get_list(&namespace).await
    }

    pub async fn get_of_lab_instance(
        &self,
        instance: &LabInstance,
        vmi_name: &str,
        labs: &LabController,
    ) -> Result<String, ControllerError> {
        let namespace = instance_namespace(instance, labs).await?;
        self.get(&namespace, vmi_name).await
    }
}

async fn instance_namespace(
    instance: &LabInstance,
    labs: &LabController,
) -> Result<String, ControllerError> {
    let lab = labs
        .get(instance.lab_id())
        .await?
        .ok_or_else(|| ControllerError::LabNotFound(instance.lab_id().clone()))?;
    Ok(gen_namespace_name(&lab, instance.user_id(), instance.id()))
}
