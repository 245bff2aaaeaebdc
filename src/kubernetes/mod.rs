pub mod api;
pub mod config;
pub mod proxy;

pub use api::{
    ApiRegistry, ClusterScopedApi, ClusterScopedBinding, NamespaceApi, NamespacedApi,
    NamespacedBinding, NamespacedPaths, NetworkPolicyApi, RegistryError, Scope,
    VirtualMachineInstanceApi,
};
pub use config::{get_registry, load_config_from, parse_config, ConfigError, KubernetesConfig};
pub use proxy::{Proxy, ProxyError, TlsVerification, Transport};
