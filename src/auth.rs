//! Access tokens for started lab instances
//!
//! The token binds a user to the namespace and VM names of one lab instance.
//! Whatever serves the VM consoles verifies it with the same secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Identifier;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// What a lab instance token grants access to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabInstanceTokenParams {
    pub lab_id: Identifier,
    pub instance_id: Identifier,
    pub namespace: String,
    pub allowed_vm_names: Vec<String>,
}

/// Signs lab instance tokens
pub trait TokenIssuer: Send + Sync {
    fn issue(
        &self,
        user_id: &Identifier,
        params: &LabInstanceTokenParams,
        secret: &str,
    ) -> Result<String, TokenError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabInstanceClaims {
    pub sub: Identifier,
    pub iat: i64,
    pub exp: i64,
    pub lab_instance: LabInstanceTokenParams,
}

/// HS256 JSON web tokens
#[derive(Debug, Clone)]
pub struct JwtTokenIssuer {
    lifetime: Duration,
}

impl JwtTokenIssuer {
    pub fn new() -> Self {
        Self::with_lifetime(Duration::hours(1))
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self { lifetime }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

impl Default for JwtTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(
        &self,
        user_id: &Identifier,
        params: &LabInstanceTokenParams,
        secret: &str,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = LabInstanceClaims {
            sub: user_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            lab_instance: params.clone(),
        };
        let key = EncodingKey::from_secret(secret.as_bytes());
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
