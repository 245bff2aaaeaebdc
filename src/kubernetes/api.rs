//! Typed bindings for control-plane resource kinds
//!
//! A binding wraps the [`Transport`] with the fixed list/detail paths of one
//! resource kind. Bindings come in two narrow shapes:
//!
//! - [`ClusterScopedApi`]: paths take only an identifier
//! - [`NamespacedApi`]: paths take a namespace, and an identifier for details
//!
//! Each binding declares its registry name and scope itself, so adding a new
//! resource kind is one `register_*` call at startup and no change here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::proxy::{ProxyError, Transport};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("API '{0}' not found")]
    NotFound(String),

    #[error("API '{name}' is not {expected}")]
    WrongScope { name: String, expected: Scope },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    ClusterScoped,
    Namespaced,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::ClusterScoped => f.write_str("cluster-scoped"),
            Scope::Namespaced => f.write_str("namespaced"),
        }
    }
}

// ============================================================================
// Capability interfaces
// ============================================================================

#[async_trait]
pub trait ClusterScopedApi: Send + Sync {
    async fn get_list(&self) -> Result<String, ProxyError>;

    async fn get(&self, identifier: &str) -> Result<String, ProxyError>;

    /// Create a resource from a YAML manifest
    async fn create(&self, data: &str) -> Result<String, ProxyError>;

    async fn delete(&self, identifier: &str) -> Result<String, ProxyError>;
}

#[async_trait]
pub trait NamespacedApi: Send + Sync {
    async fn get_list(&self, namespace: &str) -> Result<String, ProxyError>;

    async fn get(&self, namespace: &str, identifier: &str) -> Result<String, ProxyError>;

    /// Create a resource in `namespace` from a YAML manifest
    async fn create(&self, namespace: &str, data: &str) -> Result<String, ProxyError>;

    async fn delete(&self, namespace: &str, identifier: &str) -> Result<String, ProxyError>;
}

/// A cluster-scoped binding that can be registered by name
pub trait ClusterScopedBinding: ClusterScopedApi + 'static {
    const NAME: &'static str;

    fn bind(transport: Arc<dyn Transport>) -> Self;
}

/// A namespaced binding that can be registered by name
pub trait NamespacedBinding: NamespacedApi + 'static {
    const NAME: &'static str;

    fn bind(transport: Arc<dyn Transport>) -> Self;
}

/// Fill `{namespace}` and `{identifier}` in a path template
fn fill(template: &str, namespace: &str, identifier: &str) -> String {
    template
        .replace("{namespace}", namespace)
        .replace("{identifier}", identifier)
}

/// A namespaced kind fully described by its list and detail paths.
///
/// Every type implementing this gets [`NamespacedApi`] for free.
pub trait NamespacedPaths: Send + Sync {
    /// Collection path, with a `{namespace}` slot
    const LIST_URL: &'static str;
    /// Single resource path, with `{namespace}` and `{identifier}` slots
    const DETAIL_URL: &'static str;

    fn transport(&self) -> &dyn Transport;
}

#[async_trait]
impl<T: NamespacedPaths> NamespacedApi for T {
    async fn get_list(&self, namespace: &str) -> Result<String, ProxyError> {
        self.transport()
            .get(&fill(Self::LIST_URL, namespace, ""))
            .await
    }

    async fn get(&self, namespace: &str, identifier: &str) -> Result<String, ProxyError> {
        self.transport()
            .get(&fill(Self::DETAIL_URL, namespace, identifier))
            .await
    }

    async fn create(&self, namespace: &str, data: &str) -> Result<String, ProxyError> {
        self.transport()
            .post(&fill(Self::LIST_URL, namespace, ""), data)
            .await
    }

    async fn delete(&self, namespace: &str, identifier: &str) -> Result<String, ProxyError> {
        self.transport()
            .delete(&fill(Self::DETAIL_URL, namespace, identifier))
            .await
    }
}

// ============================================================================
// Registry
// ============================================================================

type ClusterScopedConstructor = fn(Arc<dyn Transport>) -> Arc<dyn ClusterScopedApi>;
type NamespacedConstructor = fn(Arc<dyn Transport>) -> Arc<dyn NamespacedApi>;

fn bind_cluster_scoped<B: ClusterScopedBinding>(
    transport: Arc<dyn Transport>,
) -> Arc<dyn ClusterScopedApi> {
    Arc::new(B::bind(transport))
}

fn bind_namespaced<B: NamespacedBinding>(transport: Arc<dyn Transport>) -> Arc<dyn NamespacedApi> {
    Arc::new(B::bind(transport))
}

#[derive(Clone, Copy)]
enum Constructor {
    ClusterScoped(ClusterScopedConstructor),
    Namespaced(NamespacedConstructor),
}

/// Name-keyed table of resource bindings sharing one transport.
///
/// Built once at startup and only read afterwards.
#[derive(Clone)]
pub struct ApiRegistry {
    transport: Arc<dyn Transport>,
    constructors: HashMap<&'static str, Constructor>,
}

impl ApiRegistry {
    /// An empty registry
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            constructors: HashMap::new(),
        }
    }

    /// A registry with the namespace, network policy and VM instance bindings
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new(transport);
        registry
            .register_cluster_scoped::<NamespaceApi>()
            .register_namespaced::<NetworkPolicyApi>()
            .register_namespaced::<VirtualMachineInstanceApi>();
        registry
    }

    pub fn register_cluster_scoped<B: ClusterScopedBinding>(&mut self) -> &mut Self {
        self.insert(B::NAME, Constructor::ClusterScoped(bind_cluster_scoped::<B>));
        self
    }

    pub fn register_namespaced<B: NamespacedBinding>(&mut self) -> &mut Self {
        self.insert(B::NAME, Constructor::Namespaced(bind_namespaced::<B>));
        self
    }

    fn insert(&mut self, name: &'static str, constructor: Constructor) {
        if self.constructors.insert(name, constructor).is_some() {
            warn!("API '{}' registered twice, keeping the latest binding", name);
        }
    }

    pub fn cluster_scoped(&self, name: &str) -> Result<Arc<dyn ClusterScopedApi>, RegistryError> {
        match self.lookup(name)? {
            Constructor::ClusterScoped(construct) => Ok(construct(self.transport.clone())),
            Constructor::Namespaced(_) => Err(RegistryError::WrongScope {
                name: name.to_string(),
                expected: Scope::ClusterScoped,
            }),
        }
    }

    pub fn namespaced(&self, name: &str) -> Result<Arc<dyn NamespacedApi>, RegistryError> {
        match self.lookup(name)? {
            Constructor::Namespaced(construct) => Ok(construct(self.transport.clone())),
            Constructor::ClusterScoped(_) => Err(RegistryError::WrongScope {
                name: name.to_string(),
                expected: Scope::Namespaced,
            }),
        }
    }

    fn lookup(&self, name: &str) -> Result<Constructor, RegistryError> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Built-in bindings
// ============================================================================

/// Kubernetes namespaces
pub struct NamespaceApi {
    transport: Arc<dyn Transport>,
}

impl NamespaceApi {
    pub const LIST_URL: &'static str = "/api/v1/namespaces";
    pub const DETAIL_URL: &'static str = "/api/v1/namespaces/{identifier}";
}

impl ClusterScopedBinding for NamespaceApi {
    const NAME: &'static str = "namespace";

    fn bind(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ClusterScopedApi for NamespaceApi {
    async fn get_list(&self) -> Result<String, ProxyError> {
        self.transport.get(Self::LIST_URL).await
    }

    async fn get(&self, identifier: &str) -> Result<String, ProxyError> {
        self.transport
            .get(&fill(Self::DETAIL_URL, "", identifier))
            .await
    }

    async fn create(&self, data: &str) -> Result<String, ProxyError> {
        self.transport.post(Self::LIST_URL, data).await
    }

    async fn delete(&self, identifier: &str) -> Result<String, ProxyError> {
        self.transport
            .delete(&fill(Self::DETAIL_URL, "", identifier))
            .await
    }
}

/// Kubernetes network policies. Needs a network plugin that enforces them.
pub struct NetworkPolicyApi {
    transport: Arc<dyn Transport>,
}

impl NamespacedPaths for NetworkPolicyApi {
    const LIST_URL: &'static str =
        "/apis/networking.k8s.io/v1/namespaces/{namespace}/networkpolicies";
    const DETAIL_URL: &'static str =
        "/apis/networking.k8s.io/v1/namespaces/{namespace}/networkpolicies/{identifier}";

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

impl NamespacedBinding for NetworkPolicyApi {
    const NAME: &'static str = "network_policy";

    fn bind(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

/// KubeVirt virtual machine instances. Needs KubeVirt installed in the cluster.
pub struct VirtualMachineInstanceApi {
    transport: Arc<dyn Transport>,
}

impl NamespacedPaths for VirtualMachineInstanceApi {
    const LIST_URL: &'static str =
        "/apis/kubevirt.io/v1alpha3/namespaces/{namespace}/virtualmachineinstances/";
    const DETAIL_URL: &'static str =
        "/apis/kubevirt.io/v1alpha3/namespaces/{namespace}/virtualmachineinstances/{identifier}";

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

impl NamespacedBinding for VirtualMachineInstanceApi {
    const NAME: &'static str = "virtual_machine_instance";

    fn bind(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}
