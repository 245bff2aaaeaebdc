//! Lab entities
//!
//! Entities are validated on construction and expose their fields read-only.
//! Creation goes through a draft (`New*`) that is validated before the adapter
//! assigns an identifier.

use serde::Serialize;

use super::identifier::Identifier;
use super::validation::{validate, Rule, ValidationError};

const NAME_RULES: &[Rule] = &[Rule::NonEmpty, Rule::MaxLength(32)];
const DESCRIPTION_RULES: &[Rule] = &[Rule::NonEmpty, Rule::MaxLength(128)];
const URL_RULES: &[Rule] = &[Rule::NonEmpty, Rule::MaxLength(256)];
const NAMESPACE_PREFIX_RULES: &[Rule] = &[Rule::MaxLength(32), Rule::DnsLabel];
const VM_NAME_RULES: &[Rule] = &[Rule::DnsSubdomain];
const USER_ID_RULES: &[Rule] = &[Rule::MaxLength(12), Rule::DnsLabel];
const LAB_INSTANCE_ID_RULES: &[Rule] = &[Rule::MaxLength(16), Rule::DnsLabel];

/// Common surface of everything an adapter stores
pub trait Entity: Clone + Send + Sync + 'static {
    /// Validated field set used to create a new entity
    type Draft: Send + 'static;

    /// Human readable entity name, used in errors and logs
    const KIND: &'static str;

    fn id(&self) -> &Identifier;

    /// Build the entity from an adapter-assigned id and a creation draft
    fn from_draft(id: Identifier, draft: Self::Draft) -> Result<Self, ValidationError>;

    /// Attribute value by field name, used for filtering
    fn attr(&self, name: &str) -> Option<Identifier>;
}

// ============================================================================
// User
// ============================================================================

/// A user of the host application. Users are owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: Identifier,
}

impl User {
    pub fn new(id: impl Into<Identifier>) -> Result<Self, ValidationError> {
        let id = id.into();
        id.validate("user id", USER_ID_RULES)?;
        Ok(Self { id })
    }
}

impl Entity for User {
    type Draft = ();
    const KIND: &'static str = "user";

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn from_draft(id: Identifier, _draft: ()) -> Result<Self, ValidationError> {
        User::new(id)
    }

    fn attr(&self, name: &str) -> Option<Identifier> {
        match name {
            "id" => Some(self.id.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// DockerImage
// ============================================================================

/// Reference to a container image that ships a VM disk.
///
/// Images on Docker Hub only need `user/repo:tag` as url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerImage {
    id: Identifier,
    name: String,
    description: String,
    url: String,
}

/// Fields of a docker image that is not stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDockerImage {
    pub name: String,
    pub description: String,
    pub url: String,
}

impl NewDockerImage {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
        };
        validate("name", &draft.name, NAME_RULES)?;
        validate("description", &draft.description, DESCRIPTION_RULES)?;
        validate("url", &draft.url, URL_RULES)?;
        Ok(draft)
    }
}

impl DockerImage {
    pub fn new(
        id: impl Into<Identifier>,
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = NewDockerImage::new(name, description, url)?;
        Ok(Self::from_valid(id.into(), draft))
    }

    fn from_valid(id: Identifier, draft: NewDockerImage) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            url: draft.url,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Entity for DockerImage {
    type Draft = NewDockerImage;
    const KIND: &'static str = "docker image";

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn from_draft(id: Identifier, draft: NewDockerImage) -> Result<Self, ValidationError> {
        let draft = NewDockerImage::new(draft.name, draft.description, draft.url)?;
        Ok(Self::from_valid(id, draft))
    }

    fn attr(&self, name: &str) -> Option<Identifier> {
        match name {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "url" => Some(self.url.as_str().into()),
            _ => None,
        }
    }
}

// ============================================================================
// Lab
// ============================================================================

/// A reusable scenario: a set of VMs started together for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lab {
    id: Identifier,
    name: String,
    namespace_prefix: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLab {
    pub name: String,
    /// First segment of every namespace created for this lab
    pub namespace_prefix: String,
    pub description: String,
}

impl NewLab {
    pub fn new(
        name: impl Into<String>,
        namespace_prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = Self {
            name: name.into(),
            namespace_prefix: namespace_prefix.into(),
            description: description.into(),
        };
        validate("name", &draft.name, NAME_RULES)?;
        validate(
            "namespace_prefix",
            &draft.namespace_prefix,
            NAMESPACE_PREFIX_RULES,
        )?;
        validate("description", &draft.description, DESCRIPTION_RULES)?;
        Ok(draft)
    }
}

impl Lab {
    pub fn new(
        id: impl Into<Identifier>,
        name: impl Into<String>,
        namespace_prefix: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = NewLab::new(name, namespace_prefix, description)?;
        Ok(Self::from_valid(id.into(), draft))
    }

    fn from_valid(id: Identifier, draft: NewLab) -> Self {
        Self {
            id,
            name: draft.name,
            namespace_prefix: draft.namespace_prefix,
            description: draft.description,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Entity for Lab {
    type Draft = NewLab;
    const KIND: &'static str = "lab";

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn from_draft(id: Identifier, draft: NewLab) -> Result<Self, ValidationError> {
        let draft = NewLab::new(draft.name, draft.namespace_prefix, draft.description)?;
        Ok(Self::from_valid(id, draft))
    }

    fn attr(&self, name: &str) -> Option<Identifier> {
        match name {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.as_str().into()),
            "namespace_prefix" => Some(self.namespace_prefix.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            _ => None,
        }
    }
}

// ============================================================================
// LabDockerImage
// ============================================================================

/// One VM of a lab: which image to boot and under which VM name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabDockerImage {
    id: Identifier,
    lab_id: Identifier,
    docker_image_id: Identifier,
    docker_image_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabDockerImage {
    pub lab_id: Identifier,
    pub docker_image_id: Identifier,
    /// Name of the VM inside the lab namespace
    pub docker_image_name: String,
}

impl NewLabDockerImage {
    pub fn new(
        lab_id: impl Into<Identifier>,
        docker_image_id: impl Into<Identifier>,
        docker_image_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = Self {
            lab_id: lab_id.into(),
            docker_image_id: docker_image_id.into(),
            docker_image_name: docker_image_name.into(),
        };
        validate(
            "docker_image_name",
            &draft.docker_image_name,
            VM_NAME_RULES,
        )?;
        Ok(draft)
    }
}

impl LabDockerImage {
    pub fn new(
        id: impl Into<Identifier>,
        lab_id: impl Into<Identifier>,
        docker_image_id: impl Into<Identifier>,
        docker_image_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let draft = NewLabDockerImage::new(lab_id, docker_image_id, docker_image_name)?;
        Ok(Self::from_valid(id.into(), draft))
    }

    fn from_valid(id: Identifier, draft: NewLabDockerImage) -> Self {
        Self {
            id,
            lab_id: draft.lab_id,
            docker_image_id: draft.docker_image_id,
            docker_image_name: draft.docker_image_name,
        }
    }

    pub fn lab_id(&self) -> &Identifier {
        &self.lab_id
    }

    pub fn docker_image_id(&self) -> &Identifier {
        &self.docker_image_id
    }

    pub fn docker_image_name(&self) -> &str {
        &self.docker_image_name
    }
}

impl Entity for LabDockerImage {
    type Draft = NewLabDockerImage;
    const KIND: &'static str = "lab docker image";

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn from_draft(id: Identifier, draft: NewLabDockerImage) -> Result<Self, ValidationError> {
        let draft =
            NewLabDockerImage::new(draft.lab_id, draft.docker_image_id, draft.docker_image_name)?;
        Ok(Self::from_valid(id, draft))
    }

    fn attr(&self, name: &str) -> Option<Identifier> {
        match name {
            "id" => Some(self.id.clone()),
            "lab_id" => Some(self.lab_id.clone()),
            "docker_image_id" => Some(self.docker_image_id.clone()),
            "docker_image_name" => Some(self.docker_image_name.as_str().into()),
            _ => None,
        }
    }
}

// ============================================================================
// LabInstance
// ============================================================================

/// A lab started by a user.
///
/// Only the lab instance controller creates these; there is no way to change
/// one after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabInstance {
    id: Identifier,
    lab_id: Identifier,
    user_id: Identifier,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabInstance {
    pub lab_id: Identifier,
    pub user_id: Identifier,
}

impl NewLabInstance {
    pub fn new(lab_id: impl Into<Identifier>, user_id: impl Into<Identifier>) -> Self {
        Self {
            lab_id: lab_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl LabInstance {
    pub fn new(
        id: impl Into<Identifier>,
        lab_id: impl Into<Identifier>,
        user_id: impl Into<Identifier>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        id.validate("lab instance id", LAB_INSTANCE_ID_RULES)?;
        Ok(Self {
            id,
            lab_id: lab_id.into(),
            user_id: user_id.into(),
        })
    }

    pub fn lab_id(&self) -> &Identifier {
        &self.lab_id
    }

    pub fn user_id(&self) -> &Identifier {
        &self.user_id
    }
}

impl Entity for LabInstance {
    type Draft = NewLabInstance;
    const KIND: &'static str = "lab instance";

    fn id(&self) -> &Identifier {
        &self.id
    }

    fn from_draft(id: Identifier, draft: NewLabInstance) -> Result<Self, ValidationError> {
        LabInstance::new(id, draft.lab_id, draft.user_id)
    }

    fn attr(&self, name: &str) -> Option<Identifier> {
        match name {
            "id" => Some(self.id.clone()),
            "lab_id" => Some(self.lab_id.clone()),
            "user_id" => Some(self.user_id.clone()),
            _ => None,
        }
    }
}

/// Returned when a lab instance is started. Never stored by any adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabInstanceResult {
    pub id: Identifier,
    pub lab_id: Identifier,
    pub user_id: Identifier,
    /// Signed token granting access to the VMs of this instance
    pub access_token: String,
    pub allowed_vm_names: Vec<String>,
}
