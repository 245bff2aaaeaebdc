//! Connection settings for the control-plane API
//!
//! Two deployment modes are supported out of the box: running inside the
//! cluster with the pod's service account, and development against a local
//! `kubectl proxy`. Anything else can be described in a YAML file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::api::ApiRegistry;
use super::proxy::{Proxy, ProxyError};

pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const SERVICE_ACCOUNT_CACERT_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

const HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const PORT_ENV: &str = "KUBERNETES_SERVICE_PORT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to read service account token {path}: {source}")]
    TokenRead { path: PathBuf, source: io::Error },

    #[error("Failed to read file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn default_protocol() -> String {
    "https".to_string()
}

/// Where the control plane lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    #[serde(default)]
    pub service_account_token: Option<String>,

    /// Read into `service_account_token` by [`load_config_from`] when no token is given inline
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// PEM bundle used to verify the API server
    #[serde(default)]
    pub cacert: Option<PathBuf>,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    pub service_host: String,

    pub service_port: u16,

    #[serde(default)]
    pub insecure_ssl: bool,
}

impl KubernetesConfig {
    pub fn base_uri(&self) -> String {
        format!(
            "{}://{}:{}",
            self.protocol, self.service_host, self.service_port
        )
    }

    /// Settings for a pod running inside the cluster
    pub fn in_cluster() -> Result<Self, ConfigError> {
        let path = Path::new(SERVICE_ACCOUNT_TOKEN_PATH);
        let token = std::fs::read_to_string(path).map_err(|source| ConfigError::TokenRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::in_cluster_from(token, |name| std::env::var(name).ok())
    }

    /// Same as [`KubernetesConfig::in_cluster`] with the token and environment supplied
    pub fn in_cluster_from<F>(token: impl Into<String>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token: String = token.into();
        let (service_host, service_port) = service_address(&lookup)?;
        Ok(Self {
            service_account_token: Some(token.trim().to_string()),
            token_file: Some(PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH)),
            cacert: Some(PathBuf::from(SERVICE_ACCOUNT_CACERT_PATH)),
            protocol: "https".to_string(),
            service_host,
            service_port,
            insecure_ssl: false,
        })
    }

    /// Settings for `kubectl proxy`: plain http, no token and no CA bundle
    pub fn development() -> Result<Self, ConfigError> {
        Self::development_from(|name| std::env::var(name).ok())
    }

    pub fn development_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (service_host, service_port) = service_address(&lookup)?;
        Ok(Self {
            service_account_token: None,
            token_file: None,
            cacert: None,
            protocol: "http".to_string(),
            service_host,
            service_port,
            insecure_ssl: false,
        })
    }

    /// Read `token_file` unless a token is already set
    fn resolve_token(mut self) -> Result<Self, ConfigError> {
        if self.service_account_token.is_some() {
            return Ok(self);
        }
        if let Some(path) = &self.token_file {
            debug!("Reading service account token from {}", path.display());
            let token = std::fs::read_to_string(path).map_err(|source| ConfigError::TokenRead {
                path: path.clone(),
                source,
            })?;
            self.service_account_token = Some(token.trim().to_string());
        }
        Ok(self)
    }
}

fn service_address<F>(lookup: &F) -> Result<(String, u16), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup(HOST_ENV).ok_or(ConfigError::MissingEnv(HOST_ENV))?;
    let port = lookup(PORT_ENV).ok_or(ConfigError::MissingEnv(PORT_ENV))?;
    let port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: PORT_ENV,
        value: port.clone(),
    })?;
    Ok((host, port))
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

/// Parse a YAML config. `~` in file paths is expanded, files are not read.
pub fn parse_config(content: &str) -> Result<KubernetesConfig, ConfigError> {
    let mut config: KubernetesConfig = serde_yaml::from_str(content)?;
    config.token_file = config.token_file.as_deref().map(expand_path);
    config.cacert = config.cacert.as_deref().map(expand_path);
    Ok(config)
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load a YAML config file and read the token file it points to
pub fn load_config_from(path: &Path) -> Result<KubernetesConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)?.resolve_token()
}

/// Build a proxy for `config` and a registry with the default bindings on top of it
pub fn get_registry(config: &KubernetesConfig) -> Result<ApiRegistry, ProxyError> {
    let proxy = Proxy::new(
        config.base_uri(),
        config.service_account_token.clone(),
        config.cacert.as_deref(),
        config.insecure_ssl,
    )?;
    Ok(ApiRegistry::with_defaults(Arc::new(proxy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_in_cluster_from_env() {
        let lookup = env(&[
            ("KUBERNETES_SERVICE_HOST", "10.0.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ]);
        let config = KubernetesConfig::in_cluster_from("secret\n", lookup).unwrap();

        assert_eq!(config.base_uri(), "https://10.0.0.1:443");
        assert_eq!(config.service_account_token.as_deref(), Some("secret"));
        assert_eq!(
            config.cacert.as_deref(),
            Some(Path::new(SERVICE_ACCOUNT_CACERT_PATH))
        );
        assert!(!config.insecure_ssl);
    }

    #[test]
    fn test_development_from_env() {
        let lookup = env(&[
            ("KUBERNETES_SERVICE_HOST", "localhost"),
            ("KUBERNETES_SERVICE_PORT", "8001"),
        ]);
        let config = KubernetesConfig::development_from(lookup).unwrap();

        assert_eq!(config.base_uri(), "http://localhost:8001");
        assert!(config.service_account_token.is_none());
        assert!(config.cacert.is_none());
    }

    #[test]
    fn test_missing_env() {
        let lookup = env(&[("KUBERNETES_SERVICE_HOST", "localhost")]);
        let result = KubernetesConfig::development_from(lookup);
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnv("KUBERNETES_SERVICE_PORT"))
        ));
    }

    #[test]
    fn test_invalid_port() {
        let lookup = env(&[
            ("KUBERNETES_SERVICE_HOST", "localhost"),
            ("KUBERNETES_SERVICE_PORT", "http"),
        ]);
        let result = KubernetesConfig::development_from(lookup);
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn test_parse_config_defaults() {
        let config = parse_config("service_host: api.example.com\nservice_port: 6443\n").unwrap();
        assert_eq!(config.protocol, "https");
        assert_eq!(config.base_uri(), "https://api.example.com:6443");
        assert!(!config.insecure_ssl);
        assert!(config.service_account_token.is_none());
    }

    #[test]
    fn test_parse_config_expands_home() {
        let yaml = "service_host: h\nservice_port: 1\ncacert: ~/ca.crt\n";
        let config = parse_config(yaml).unwrap();
        let expected = PathBuf::from(shellexpand::tilde("~/ca.crt").into_owned());
        assert_eq!(config.cacert, Some(expected));
    }

    #[test]
    fn test_parse_config_invalid() {
        assert!(matches!(
            parse_config("service_host: [oops"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            parse_config("service_host: h\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_config_reads_token_file() {
        let token = create_temp_file("file-token\n");
        let yaml = format!(
            "service_host: h\nservice_port: 6443\ninsecure_ssl: true\ntoken_file: {}\n",
            token.path().display()
        );
        let file = create_temp_file(&yaml);

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.service_account_token.as_deref(), Some("file-token"));
        assert!(config.insecure_ssl);
    }

    #[test]
    fn test_inline_token_wins() {
        let yaml = "service_host: h\nservice_port: 1\nservice_account_token: inline\ntoken_file: /nonexistent/token\n";
        let file = create_temp_file(yaml);
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.service_account_token.as_deref(), Some("inline"));
    }

    #[test]
    fn test_load_config_missing_token_file() {
        let file = create_temp_file("service_host: h\nservice_port: 1\ntoken_file: /nonexistent/token\n");
        let result = load_config_from(file.path());
        assert!(matches!(result, Err(ConfigError::TokenRead { .. })));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_config_from(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_get_registry_for_development() {
        let lookup = env(&[
            ("KUBERNETES_SERVICE_HOST", "localhost"),
            ("KUBERNETES_SERVICE_PORT", "8001"),
        ]);
        let config = KubernetesConfig::development_from(lookup).unwrap();
        let registry = get_registry(&config).unwrap();
        assert_eq!(
            registry.names(),
            vec!["namespace", "network_policy", "virtual_machine_instance"]
        );
    }
}
