//! Starting and stopping lab instances
//!
//! A lab instance lives in its own namespace named
//! `{namespace_prefix}-{user_id}-{instance_id}`. Starting one creates the
//! namespace, its default network policy and one VM per lab docker image, then
//! signs a token for the VMs. Stopping one deletes the namespace, which takes
//! every contained resource with it.

use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{LabController, LabDockerImageController, UserController};
use super::resources::{
    NamespaceController, NetworkPolicyController, VirtualMachineInstanceController,
};
use super::ControllerError;
use crate::auth::{LabInstanceTokenParams, TokenIssuer};
use crate::database::{Adapter, Filter};
use crate::model::{Entity, Identifier, Lab, LabInstance, LabInstanceResult, NewLabInstance, User};

/// What to do with already created state when starting an instance fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Delete the namespace, then the instance record once the namespace is gone.
    /// Cleanup failures are logged.
    #[default]
    BestEffort,
    /// Leave everything in place
    Disabled,
}

/// Namespace of a lab instance
pub fn gen_namespace_name(lab: &Lab, user_id: &Identifier, instance_id: &Identifier) -> String {
    format!("{}-{}-{}", lab.namespace_prefix(), user_id, instance_id)
}

pub struct LabInstanceController {
    instances: Arc<dyn Adapter<LabInstance>>,
    labs: LabController,
    users: UserController,
    lab_docker_images: LabDockerImageController,
    namespaces: NamespaceController,
    network_policies: NetworkPolicyController,
    virtual_machine_instances: VirtualMachineInstanceController,
    token_issuer: Arc<dyn TokenIssuer>,
    secret_key: String,
    rollback: RollbackPolicy,
}

impl LabInstanceController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instances: Arc<dyn Adapter<LabInstance>>,
        labs: LabController,
        users: UserController,
        lab_docker_images: LabDockerImageController,
        namespaces: NamespaceController,
        network_policies: NetworkPolicyController,
        virtual_machine_instances: VirtualMachineInstanceController,
        token_issuer: Arc<dyn TokenIssuer>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            instances,
            labs,
            users,
            lab_docker_images,
            namespaces,
            network_policies,
            virtual_machine_instances,
            token_issuer,
            secret_key: secret_key.into(),
            rollback: RollbackPolicy::default(),
        }
    }

    pub fn with_rollback_policy(mut self, policy: RollbackPolicy) -> Self {
        self.rollback = policy;
        self
    }

    pub fn rollback_policy(&self) -> RollbackPolicy {
        self.rollback
    }

    /// Start `lab` for `user_id`.
    ///
    /// Steps run one after another and stop at the first failure. Nothing is
    /// touched before both lab and user are found.
    pub async fn create(
        &self,
        lab_id: &Identifier,
        user_id: &Identifier,
    ) -> Result<LabInstanceResult, ControllerError> {
        let lab = self
            .labs
            .get(lab_id)
            .await?
            .ok_or_else(|| ControllerError::LabNotFound(lab_id.clone()))?;
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ControllerError::UserNotFound(user_id.clone()))?;

        let instance = self
            .instances
            .create(NewLabInstance::new(lab.id(), user.id()))
            .await?;
        let namespace = gen_namespace_name(&lab, user.id(), instance.id());
        info!(
            "Starting lab {} for user {} as instance {} in namespace {}",
            lab.id(),
            user.id(),
            instance.id(),
            namespace
        );

        match self.provision(&lab, &instance, &namespace).await {
            Ok(result) => {
                info!("Lab instance {} started", instance.id());
                Ok(result)
            }
            Err(err) => {
                warn!("Failed to start lab instance {}: {}", instance.id(), err);
                self.roll_back(&instance, &namespace).await;
                Err(err)
            }
        }
    }

    async fn provision(
        &self,
        lab: &Lab,
        instance: &LabInstance,
        namespace: &str,
    ) -> Result<LabInstanceResult, ControllerError> {
        self.namespaces.create(namespace).await?;
        info!("Created namespace {}", namespace);

        self.network_policies.create(namespace).await?;
        info!("Created network policy in {}", namespace);

        let vms = self.lab_docker_images.of_lab(lab.id()).await?;
        let mut allowed_vm_names = Vec::with_capacity(vms.len());
        for vm in &vms {
            self.virtual_machine_instances.create(namespace, vm).await?;
            info!("Created VM instance {} in {}", vm.docker_image_name(), namespace);
            allowed_vm_names.push(vm.docker_image_name().to_string());
        }

        let params = LabInstanceTokenParams {
            lab_id: lab.id().clone(),
            instance_id: instance.id().clone(),
            namespace: namespace.to_string(),
            allowed_vm_names: allowed_vm_names.clone(),
        };
        let access_token = self
            .token_issuer
            .issue(instance.user_id(), &params, &self.secret_key)?;

        Ok(LabInstanceResult {
            id: instance.id().clone(),
            lab_id: lab.id().clone(),
            user_id: instance.user_id().clone(),
            access_token,
            allowed_vm_names,
        })
    }

    async fn roll_back(&self, instance: &LabInstance, namespace: &str) {
        if self.rollback == RollbackPolicy::Disabled {
            warn!(
                "Rollback disabled, namespace {} and lab instance {} are left behind",
                namespace,
                instance.id()
            );
            return;
        }

        // The record is the only way back to the namespace name
        if let Err(e) = self.namespaces.delete(namespace).await {
            warn!(
                "Rollback failed to delete namespace {}: {}; keeping lab instance {} so it can be deleted later",
                namespace,
                e,
                instance.id()
            );
            return;
        }
        if let Err(e) = self.instances.delete(instance.id()).await {
            warn!(
                "Rollback failed to delete lab instance {}: {}",
                instance.id(),
                e
            );
        }
    }

    /// Stop an instance: delete its namespace, then its record
    pub async fn delete(&self, instance: &LabInstance) -> Result<(), ControllerError> {
        let namespace = self.namespace_name(instance).await?;
        info!(
            "Stopping lab instance {} in namespace {}",
            instance.id(),
            namespace
        );
        self.namespaces.delete(&namespace).await?;
        self.instances.delete(instance.id()).await?;
        Ok(())
    }

    /// Lab instances cannot be changed after creation
    pub async fn save(&self, instance: &LabInstance) -> Result<LabInstance, ControllerError> {
        Err(ControllerError::Immutable(instance.id().clone()))
    }

    pub async fn list_by_user(&self, user: &User) -> Result<Vec<LabInstance>, ControllerError> {
        Ok(self
            .instances
            .filter(&Filter::new().eq("user_id", user.id()))
            .await?)
    }

    pub async fn get(&self, id: &Identifier) -> Result<Option<LabInstance>, ControllerError> {
        Ok(self.instances.get(id).await?)
    }

    pub async fn get_all(&self) -> Result<Vec<LabInstance>, ControllerError> {
        Ok(self.instances.get_all().await?)
    }

    /// Namespace of an existing instance; looks up its lab
    pub async fn namespace_name(&self, instance: &LabInstance) -> Result<String, ControllerError> {
        let lab = self
            .labs
            .get(instance.lab_id())
            .await?
            .ok_or_else(|| ControllerError::LabNotFound(instance.lab_id().clone()))?;
        Ok(gen_namespace_name(&lab, instance.user_id(), instance.id()))
    }
}
