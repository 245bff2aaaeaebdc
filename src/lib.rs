//! Provision and tear down multi-VM lab environments on a Kubernetes control plane.
//!
//! The host application supplies storage through the [`database::Adapter`]
//! traits and authenticates its users; this crate renders the manifests and
//! talks to the control plane. [`controller::create_controller_collection`]
//! wires everything together.

pub mod auth;
pub mod controller;
pub mod database;
pub mod kubernetes;
pub mod model;
pub mod template_engine;

pub use auth::{JwtTokenIssuer, LabInstanceTokenParams, TokenError, TokenIssuer};
pub use controller::{create_controller_collection, ControllerCollection, ControllerError};
pub use kubernetes::{get_registry, ApiRegistry, KubernetesConfig, Proxy};
pub use template_engine::{Template, TemplateData, TemplateEngine, TemplateError};
