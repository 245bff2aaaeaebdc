use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Certificate, Client, RequestBuilder};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Failed to read CA bundle {0}: {1}")]
    CaBundle(PathBuf, std::io::Error),

    #[error("Invalid CA bundle: {0}")]
    InvalidCertificate(reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// How the proxy verifies the control plane's TLS certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsVerification {
    /// Certificates are not checked at all
    Insecure,
    /// Only certificates signed by this PEM bundle are trusted
    CaBundle(PathBuf),
    /// The built-in root store
    Default,
}

impl TlsVerification {
    pub fn select(cacert: Option<&Path>, insecure_ssl: bool) -> Self {
        match (insecure_ssl, cacert) {
            (true, _) => TlsVerification::Insecure,
            (false, Some(path)) => TlsVerification::CaBundle(path.to_path_buf()),
            (false, None) => TlsVerification::Default,
        }
    }
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

/// Raw access to the control-plane API.
///
/// Paths are relative to the API base uri. Bodies are returned as text without
/// looking at the status code.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<String, ProxyError>;

    /// Send a YAML document
    async fn post(&self, path: &str, body: &str) -> Result<String, ProxyError>;

    async fn delete(&self, path: &str) -> Result<String, ProxyError>;
}

// ============================================================================
// SBIO: I/O implementation (real HTTP client)
// ============================================================================

/// Authenticated HTTP access to the control-plane API
#[derive(Clone)]
pub struct Proxy {
    client: Client,
    base_uri: String,
    service_account_token: Option<String>,
}

impl Proxy {
    /// Create a proxy for `base_uri` (e.g. `https://10.0.0.1:6443`).
    ///
    /// A missing token or CA bundle is allowed: running behind `kubectl proxy`
    /// needs neither.
    pub fn new(
        base_uri: impl Into<String>,
        service_account_token: Option<String>,
        cacert: Option<&Path>,
        insecure_ssl: bool,
    ) -> Result<Self, ProxyError> {
        if service_account_token.is_none() {
            warn!("No service account token.");
        }
        if cacert.is_none() {
            warn!("No cacert.");
        }

        let client = build_client(&TlsVerification::select(cacert, insecure_ssl))?;
        let base_uri: String = base_uri.into();

        Ok(Self {
            client,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            service_account_token,
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_uri, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.service_account_token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<String, ProxyError> {
        let response = self.authorize(request).send().await?;
        debug!("{} {} -> {}", method, path, response.status());
        Ok(response.text().await?)
    }
}

fn build_client(verification: &TlsVerification) -> Result<Client, ProxyError> {
    let builder = Client::builder();
    let builder = match verification {
        TlsVerification::Insecure => builder.danger_accept_invalid_certs(true),
        TlsVerification::CaBundle(path) => {
            let pem =
                std::fs::read(path).map_err(|e| ProxyError::CaBundle(path.clone(), e))?;
            let cert = Certificate::from_pem(&pem).map_err(ProxyError::InvalidCertificate)?;
            builder
                .tls_built_in_root_certs(false)
                .add_root_certificate(cert)
        }
        TlsVerification::Default => builder,
    };
    builder.build().map_err(ProxyError::Client)
}

#[async_trait]
impl Transport for Proxy {
    async fn get(&self, path: &str) -> Result<String, ProxyError> {
        self.send("GET", path, self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: &str) -> Result<String, ProxyError> {
        let request = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, "application/yaml")
            .body(body.to_string());
        self.send("POST", path, request).await
    }

    async fn delete(&self, path: &str) -> Result<String, ProxyError> {
        self.send("DELETE", path, self.client.delete(self.url(path))).await
    }
}

// ============================================================================
// SBIO: Mock implementation for testing (no I/O)
// ============================================================================
